//! Telegram front end for memo-relay.
//!
//! This crate provides a Telegram bot that turns a private chat into a note
//! inbox: text is expanded by an LLM, voice is transcribed, photos are saved
//! by URL and PDFs are summarized, then everything lands in the notes
//! service.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `LLM_API_KEY`: OpenAI-compatible API key (`ABACUS_API_KEY` also accepted)
//! - `MEM_API_KEY`: Notes service API key
//!
//! Optional:
//! - `MEMO_ALLOWED_USERNAME`: the only Telegram handle allowed to use the bot
//! - `MEMO_TAG_MODE`: `inline` (default) or `pending`
//! - `MEMO_TAGS_FILE`: user tag overlay (default: `tags.json` next to the binary)
//!
//! # Example
//!
//! ```no_run
//! use memo_core::RelayConfig;
//! use memo_telegram::MemoBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::from_env()?;
//!     let bot = MemoBot::new(&config)?;
//!     bot.start_polling().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Commands
//!
//! - `/start` - Greeting and short instructions
//! - `/help` - Show available commands
//! - `/tags` - List known tags
//! - `/addtag <name> <description>` - Add or update a tag

pub mod bot;
pub mod error;
pub mod handlers;

pub use bot::MemoBot;
pub use error::{Result, TelegramError};
pub use handlers::Command;
