//! Command and message handlers for the Telegram bot.
//!
//! Handlers translate teloxide messages into relay events and hand them to
//! [`Relay`]. Replies, downloads and file URLs go back through
//! [`TelegramChat`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use memo_core::{
    replies, ChatIo, DocumentRef, EventKind, FileRef, InboundEvent, Relay, RelayCommand,
    RelayError, Sender,
};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, FileMeta, MessageId, ReplyParameters};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info};

use crate::error::Result;

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "Приветствие и краткая инструкция")]
    Start,

    #[command(description = "Показать список команд")]
    Help,

    #[command(description = "Показать известные теги")]
    Tags,

    #[command(description = "Добавить тег: /addtag <тег> <описание>")]
    AddTag(String),
}

/// The chat a message came from, replying to that message.
pub struct TelegramChat {
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
}

impl TelegramChat {
    pub fn new(bot: Bot, msg: &Message) -> Self {
        Self {
            bot,
            chat_id: msg.chat.id,
            message_id: msg.id,
        }
    }
}

fn chat_err(e: impl std::fmt::Display) -> RelayError {
    RelayError::Chat(e.to_string())
}

#[async_trait]
impl ChatIo for TelegramChat {
    async fn reply(&self, text: &str) -> memo_core::Result<()> {
        self.bot
            .send_message(self.chat_id, text)
            .reply_parameters(ReplyParameters::new(self.message_id))
            .await
            .map_err(chat_err)?;
        Ok(())
    }

    async fn download(&self, file: &FileRef, dest: &Path) -> memo_core::Result<()> {
        let remote = self
            .bot
            .get_file(FileId(file.id.clone()))
            .await
            .map_err(chat_err)?;
        let mut local = tokio::fs::File::create(dest).await?;
        self.bot
            .download_file(&remote.path, &mut local)
            .await
            .map_err(chat_err)?;
        debug!(file_id = %file.id, dest = %dest.display(), "Downloaded file");
        Ok(())
    }

    async fn file_url(&self, file: &FileRef) -> memo_core::Result<String> {
        let remote = self
            .bot
            .get_file(FileId(file.id.clone()))
            .await
            .map_err(chat_err)?;
        Ok(telegram_file_url(
            self.bot.api_url().as_str(),
            self.bot.token(),
            &remote.path,
        ))
    }
}

/// Download URL for a file path returned by `getFile`.
///
/// The URL embeds the bot token. Photo notes store it as-is, so anyone who
/// can read those notes can also act as the bot.
pub fn telegram_file_url(api_url: &str, token: &str, file_path: &str) -> String {
    format!(
        "{}/file/bot{}/{}",
        api_url.trim_end_matches('/'),
        token,
        file_path
    )
}

fn file_ref(meta: &FileMeta) -> FileRef {
    FileRef {
        id: meta.id.to_string(),
        unique_id: meta.unique_id.to_string(),
    }
}

/// Who sent a message; falls back to the chat id for anonymous senders.
pub fn sender_from(msg: &Message) -> Sender {
    match msg.from.as_ref() {
        Some(user) => Sender::new(user.id.0 as i64, user.username.as_deref()),
        None => Sender::new(msg.chat.id.0, None),
    }
}

/// Normalize a message into a relay event. `None` for unsupported content.
pub fn event_from_message(msg: &Message) -> Option<InboundEvent> {
    let kind = if let Some(text) = msg.text() {
        EventKind::Text(text.to_string())
    } else if msg.voice().is_some() || msg.audio().is_some() {
        let file = msg
            .voice()
            .map(|voice| file_ref(&voice.file))
            .or_else(|| msg.audio().map(|audio| file_ref(&audio.file)));
        EventKind::Voice(file)
    } else if let Some(sizes) = msg.photo() {
        EventKind::Photo {
            largest: sizes.last().map(|size| file_ref(&size.file)),
            caption: msg.caption().map(str::to_string),
        }
    } else if let Some(doc) = msg.document() {
        EventKind::Document(Some(DocumentRef {
            file: file_ref(&doc.file),
            file_name: doc.file_name.clone(),
            mime_type: doc.mime_type.as_ref().map(|mime| mime.to_string()),
        }))
    } else {
        return None;
    };

    Some(InboundEvent {
        sender: sender_from(msg),
        kind,
    })
}

/// First word of a command message, e.g. `/foo` from `/foo bar`.
pub fn command_word(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or(text)
}

/// Handle a parsed bot command.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    relay: Arc<Relay>,
) -> Result<()> {
    let sender = sender_from(&msg);
    let chat = TelegramChat::new(bot, &msg);
    info!(chat_id = %msg.chat.id, command = ?cmd, "Command received");

    let relay_cmd = match cmd {
        Command::Start => RelayCommand::Start,
        Command::Tags => RelayCommand::Tags,
        Command::AddTag(args) => RelayCommand::AddTag(args),
        Command::Help => {
            if relay.authorize(&sender, &chat).await? {
                chat.reply(&Command::descriptions().to_string()).await?;
            }
            return Ok(());
        }
    };

    relay.handle_command(&sender, relay_cmd, &chat).await?;
    Ok(())
}

/// Handle a `/command` that did not parse as a known [`Command`].
pub async fn handle_unknown_command(bot: Bot, msg: Message, relay: Arc<Relay>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    info!(chat_id = %msg.chat.id, cmd = %command_word(text), "Unrecognized command");

    let sender = sender_from(&msg);
    let chat = TelegramChat::new(bot, &msg);
    if relay.authorize(&sender, &chat).await? {
        chat.reply(&replies::unknown_command(command_word(text)))
            .await?;
    }
    Ok(())
}

/// Handle any non-command message.
pub async fn handle_message(bot: Bot, msg: Message, relay: Arc<Relay>) -> Result<()> {
    let Some(event) = event_from_message(&msg) else {
        debug!(chat_id = %msg.chat.id, "Ignoring unsupported message");
        return Ok(());
    };

    debug!(chat_id = %msg.chat.id, kind = ?event.kind, "Message received");
    let chat = TelegramChat::new(bot, &msg);
    relay.handle_event(event, &chat).await?;
    Ok(())
}
