//! Main Telegram bot implementation.

use std::sync::Arc;

use memo_core::{Relay, RelayConfig};
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::error::{Result, TelegramError};
use crate::handlers::{handle_command, handle_message, handle_unknown_command, Command};

/// The Telegram bot for memo-relay.
pub struct MemoBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Shared note workflow.
    relay: Arc<Relay>,
}

impl MemoBot {
    /// Create a bot and its relay from configuration.
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let relay = Relay::from_config(config)?;
        Ok(Self::with_relay(Bot::new(&config.telegram_token), relay))
    }

    /// Create a bot around an existing relay.
    pub fn with_relay(bot: Bot, relay: Relay) -> Self {
        Self {
            bot,
            relay: Arc::new(relay),
        }
    }

    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Start the bot in long-polling mode. Returns after Ctrl+C.
    pub async fn start_polling(&self) -> Result<()> {
        info!(
            tag_mode = %self.relay.settings().tag_mode,
            tags_file = %self.relay.tags().path().display(),
            "Starting Telegram bot in polling mode..."
        );

        let relay_for_commands = Arc::clone(&self.relay);
        let relay_for_unknown = Arc::clone(&self.relay);
        let relay_for_messages = Arc::clone(&self.relay);

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let relay = Arc::clone(&relay_for_commands);
                        async move { handle_command(bot, msg, cmd, relay).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| is_command_text(&msg))
                    .endpoint(move |bot: Bot, msg: Message| {
                        let relay = Arc::clone(&relay_for_unknown);
                        async move { handle_unknown_command(bot, msg, relay).await }
                    }),
            )
            .branch(
                Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                    let relay = Arc::clone(&relay_for_messages);
                    async move { handle_message(bot, msg, relay).await }
                }),
            );

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                warn!("Unhandled update: {:?}", upd);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}

/// Text messages starting with `/` that did not parse as a known command.
fn is_command_text(msg: &Message) -> bool {
    msg.text().is_some_and(|text| text.starts_with('/'))
}
