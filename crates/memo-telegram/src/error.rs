//! Error types for the Telegram bot.

use memo_core::{ConfigError, RelayError};
use thiserror::Error;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Required configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Telegram API request failed.
    #[error("Telegram request error: {0}")]
    Request(#[from] teloxide::RequestError),

    /// The note workflow failed.
    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
