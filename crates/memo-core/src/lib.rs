//! memo-relay core: turns chat messages into notes.
//!
//! This crate holds everything that does not depend on the chat transport:
//!
//! - **config**: environment-driven configuration
//! - **llm**: OpenAI-compatible chat completions (expand / summarize PDF)
//! - **notes**: notes service client (`POST /notes`, `PATCH /notes/{id}`)
//! - **transcribe**: speech-to-text through the `whisper` CLI
//! - **pdf**: PDF text extraction with a character cap
//! - **tags**: tag registry with a JSON overlay file
//! - **session**: per-sender pending notes and tag parsing
//! - **relay**: authorization, dispatch and the note workflow

pub mod config;
pub mod error;
pub mod llm;
pub mod notes;
pub mod pdf;
pub mod relay;
pub mod replies;
pub mod session;
pub mod tags;
pub mod transcribe;

pub use config::{RelayConfig, WorkflowSettings};
pub use error::{ConfigError, RelayError, Result};
pub use llm::{LlmClient, TextTransform, TransformMode};
pub use notes::{MemClient, NoteRef, NoteStore};
pub use pdf::{join_pages, LopdfExtractor, PdfExtractor};
pub use relay::{
    ChatIo, DocumentRef, EventKind, FileRef, InboundEvent, Relay, RelayCommand, RelayParts, Sender,
};
pub use session::{format_tags, parse_tags, PendingNote, SessionStore, TagMode};
pub use tags::{format_tags_help, TagRegistry};
pub use transcribe::{Transcriber, Transcript, WhisperCli};
