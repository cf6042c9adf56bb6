//! Error types for the relay core.

use thiserror::Error;

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required environment variables are not set.
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: String, value: String },
}

/// Errors that can occur while relaying a message.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Transport-level HTTP failure (connect error, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream service answered with a non-success status.
    #[error("{service} API error {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Upstream answered 2xx but the body was not what we expected.
    #[error("Failed to parse response: {0}")]
    ResponseParse(String),

    /// Chat transport failed (send or download).
    #[error("Chat error: {0}")]
    Chat(String),

    /// PDF could not be opened or parsed.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Tag registry could not be written.
    #[error("Tag registry error: {0}")]
    Tags(#[from] memo_persistence::PersistenceError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
