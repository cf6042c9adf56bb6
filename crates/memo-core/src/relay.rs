//! Inbound event dispatch and the note workflow.
//!
//! A [`Relay`] receives one normalized event at a time, checks the sender
//! against the allow-list, turns the payload into text (directly, by
//! transcription, or by PDF extraction), optionally runs it through the LLM,
//! and stores it as a note. Chat I/O goes through [`ChatIo`] so the transport
//! stays outside this crate.
//!
//! Calls within one event are strictly sequential: status reply, remote
//! call, status reply.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{RelayConfig, WorkflowSettings};
use crate::error::Result;
use crate::llm::{LlmClient, TextTransform, TransformMode};
use crate::notes::{MemClient, NoteStore};
use crate::pdf::{LopdfExtractor, PdfExtractor};
use crate::replies::{self, NoteKind};
use crate::session::{PendingNote, SessionStore, TagMode};
use crate::tags::{format_tags_help, TagRegistry};
use crate::transcribe::{Transcriber, WhisperCli};

const PDF_MIME: &str = "application/pdf";

/// Who sent an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
}

impl Sender {
    pub fn new(id: i64, username: Option<&str>) -> Self {
        Self {
            id,
            username: username.map(str::to_string),
        }
    }
}

/// A file hosted by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub id: String,
    pub unique_id: String,
}

/// An attached document with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub file: FileRef,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl DocumentRef {
    /// PDF by MIME type or by `.pdf` extension, case-insensitive.
    pub fn is_pdf(&self) -> bool {
        let by_mime = self.mime_type.as_deref().is_some_and(|mime| {
            mime.split(';')
                .next()
                .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME))
        });
        let by_name = self
            .file_name
            .as_deref()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"));
        by_mime || by_name
    }
}

/// Payload of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Text(String),
    /// Voice note or audio file; `None` when the message carried neither.
    Voice(Option<FileRef>),
    Photo {
        /// Largest available size.
        largest: Option<FileRef>,
        caption: Option<String>,
    },
    Document(Option<DocumentRef>),
}

/// A normalized inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender: Sender,
    pub kind: EventKind,
}

/// Commands handled by the relay itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCommand {
    Start,
    Tags,
    /// Raw argument text after `/addtag`.
    AddTag(String),
}

/// The chat conversation an event came from.
#[async_trait]
pub trait ChatIo: Send + Sync {
    /// Reply to the message being handled.
    async fn reply(&self, text: &str) -> Result<()>;

    /// Download a hosted file to `dest`.
    async fn download(&self, file: &FileRef, dest: &Path) -> Result<()>;

    /// Public URL of a hosted file.
    async fn file_url(&self, file: &FileRef) -> Result<String>;
}

/// Split `/addtag` arguments into a name and a non-empty description.
///
/// The description keeps the user's own spacing and line breaks.
pub fn parse_addtag_args(args: &str) -> Option<(String, String)> {
    let (name, description) = args.trim().split_once(char::is_whitespace)?;
    let description = description.trim();
    if name.is_empty() || description.is_empty() {
        return None;
    }
    Some((name.to_string(), description.to_string()))
}

/// Note content for a photo: its URL plus an optional caption.
pub fn photo_content(url: &str, caption: Option<&str>) -> String {
    format!("Фото: {}\n\n{}", url, caption.unwrap_or_default())
        .trim()
        .to_string()
}

/// Collaborators a [`Relay`] is assembled from.
pub struct RelayParts {
    pub llm: Arc<dyn TextTransform>,
    pub notes: Arc<dyn NoteStore>,
    pub transcriber: Arc<dyn Transcriber>,
    pub pdf: Arc<dyn PdfExtractor>,
    pub tags: TagRegistry,
    pub settings: WorkflowSettings,
}

/// Message relay: chat events in, notes out.
pub struct Relay {
    llm: Arc<dyn TextTransform>,
    notes: Arc<dyn NoteStore>,
    transcriber: Arc<dyn Transcriber>,
    pdf: Arc<dyn PdfExtractor>,
    tags: TagRegistry,
    sessions: SessionStore,
    settings: WorkflowSettings,
}

impl Relay {
    /// Build a relay with the HTTP clients, whisper and lopdf backends.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        Ok(Self::from_parts(RelayParts {
            llm: Arc::new(LlmClient::new(&config.llm)?),
            notes: Arc::new(MemClient::new(&config.notes)?),
            transcriber: Arc::new(WhisperCli::new(config.whisper.clone())),
            pdf: Arc::new(LopdfExtractor),
            tags: TagRegistry::new(&config.tags_file),
            settings: config.workflow.clone(),
        }))
    }

    pub fn from_parts(parts: RelayParts) -> Self {
        Self {
            llm: parts.llm,
            notes: parts.notes,
            transcriber: parts.transcriber,
            pdf: parts.pdf,
            tags: parts.tags,
            sessions: SessionStore::new(),
            settings: parts.settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Whether the sender's handle matches the allow-listed one.
    pub fn is_authorized(&self, sender: &Sender) -> bool {
        match (&self.settings.allowed_username, &sender.username) {
            (Some(allowed), Some(username)) => username
                .trim_start_matches('@')
                .eq_ignore_ascii_case(allowed),
            _ => false,
        }
    }

    /// Check the sender and send the refusal text if not allowed.
    pub async fn authorize(&self, sender: &Sender, chat: &dyn ChatIo) -> Result<bool> {
        if self.is_authorized(sender) {
            return Ok(true);
        }
        warn!(sender_id = sender.id, username = ?sender.username, "Refusing unauthorized sender");
        chat.reply(replies::REFUSAL).await?;
        Ok(false)
    }

    /// Handle `/start`, `/tags` and `/addtag`.
    pub async fn handle_command(
        &self,
        sender: &Sender,
        command: RelayCommand,
        chat: &dyn ChatIo,
    ) -> Result<()> {
        if !self.authorize(sender, chat).await? {
            return Ok(());
        }

        match command {
            RelayCommand::Start => {
                chat.reply(&replies::start(self.settings.tag_mode)).await?;
                info!(sender_id = sender.id, "User started bot");
            }
            RelayCommand::Tags => {
                chat.reply(&format_tags_help(&self.tags.list())).await?;
            }
            RelayCommand::AddTag(args) => {
                let Some((name, description)) = parse_addtag_args(&args) else {
                    chat.reply(replies::ADDTAG_USAGE).await?;
                    return Ok(());
                };
                if self.tags.upsert(&name, &description)? {
                    let saved = crate::tags::normalize_tag_name(&name);
                    chat.reply(&replies::tag_saved(&saved)).await?;
                } else {
                    chat.reply(replies::ADDTAG_USAGE).await?;
                }
            }
        }
        Ok(())
    }

    /// Handle one inbound message.
    pub async fn handle_event(&self, event: InboundEvent, chat: &dyn ChatIo) -> Result<()> {
        let InboundEvent { sender, kind } = event;
        if !self.authorize(&sender, chat).await? {
            return Ok(());
        }

        match kind {
            EventKind::Text(text) => self.handle_text(&sender, &text, chat).await,
            EventKind::Voice(file) => self.handle_voice(&sender, file, chat).await,
            EventKind::Photo { largest, caption } => {
                self.handle_photo(&sender, largest, caption, chat).await
            }
            EventKind::Document(doc) => self.handle_document(&sender, doc, chat).await,
        }
    }

    async fn handle_text(&self, sender: &Sender, text: &str, chat: &dyn ChatIo) -> Result<()> {
        if self.settings.tag_mode == TagMode::Pending {
            if let Some(pending) = self.sessions.pending(sender.id).await {
                return self.apply_tags(sender, pending, text, chat).await;
            }
        }

        chat.reply(replies::TEXT_PROCESSING).await?;
        let expanded = self.llm.transform(text, &TransformMode::Expand).await?;
        self.save_note(sender, expanded, NoteKind::Text, chat).await
    }

    async fn apply_tags(
        &self,
        sender: &Sender,
        pending: PendingNote,
        tag_message: &str,
        chat: &dyn ChatIo,
    ) -> Result<()> {
        let content = pending.with_tags(tag_message);

        chat.reply(replies::TAGS_PROCESSING).await?;
        self.notes.update_note(&pending.note_id, &content).await?;
        self.sessions.take_pending(sender.id).await;

        info!(sender_id = sender.id, note_id = %pending.note_id, "Tags added to note");
        chat.reply(replies::TAGS_DONE).await
    }

    async fn handle_voice(
        &self,
        sender: &Sender,
        file: Option<FileRef>,
        chat: &dyn ChatIo,
    ) -> Result<()> {
        let Some(file) = file else {
            return chat.reply(replies::NO_VOICE).await;
        };

        let workdir = tempfile::tempdir()?;
        let audio = workdir.path().join(format!("{}.ogg", file.unique_id));
        chat.download(&file, &audio).await?;

        chat.reply(replies::VOICE_PROCESSING).await?;
        let transcript = self.transcriber.transcribe(&audio).await;
        if transcript.is_failed() {
            warn!(sender_id = sender.id, "Storing transcription failure placeholder");
        }

        self.save_note(sender, transcript.into_content(), NoteKind::Voice, chat)
            .await
    }

    async fn handle_photo(
        &self,
        sender: &Sender,
        largest: Option<FileRef>,
        caption: Option<String>,
        chat: &dyn ChatIo,
    ) -> Result<()> {
        let Some(file) = largest else {
            return chat.reply(replies::NO_PHOTO).await;
        };

        chat.reply(replies::PHOTO_PROCESSING).await?;
        let url = chat.file_url(&file).await?;
        let content = photo_content(&url, caption.as_deref());

        self.save_note(sender, content, NoteKind::Photo, chat).await
    }

    async fn handle_document(
        &self,
        sender: &Sender,
        doc: Option<DocumentRef>,
        chat: &dyn ChatIo,
    ) -> Result<()> {
        let Some(doc) = doc else {
            return chat.reply(replies::NO_DOCUMENT).await;
        };
        if !doc.is_pdf() {
            debug!(file_name = ?doc.file_name, mime = ?doc.mime_type, "Rejecting non-PDF document");
            return chat.reply(replies::NOT_PDF).await;
        }

        let workdir = tempfile::tempdir()?;
        let path = workdir.path().join(format!("{}.pdf", doc.file.unique_id));
        chat.download(&doc.file, &path).await?;

        chat.reply(replies::PDF_EXTRACTING).await?;
        let text = self.pdf.extract(&path, self.settings.pdf_max_chars).await?;
        if text.trim().is_empty() {
            return chat.reply(replies::PDF_EMPTY).await;
        }

        chat.reply(replies::PDF_SUMMARIZING).await?;
        let mode = TransformMode::SummarizePdf {
            target_lang: self.settings.summary_language.clone(),
        };
        let summary = self.llm.transform(&text, &mode).await?;
        self.save_note(sender, summary, NoteKind::Pdf, chat).await
    }

    /// Create the note, remember it in pending mode, and confirm.
    ///
    /// A note without an id cannot be amended later, so it is never made
    /// pending and the reply asks for inline tags instead.
    async fn save_note(
        &self,
        sender: &Sender,
        content: String,
        kind: NoteKind,
        chat: &dyn ChatIo,
    ) -> Result<()> {
        let note = self.notes.create_note(&content).await?;
        info!(sender_id = sender.id, note_id = %note.id, kind = ?kind, "Note created");

        let mut reply_mode = self.settings.tag_mode;
        if reply_mode == TagMode::Pending {
            if note.id.is_empty() {
                warn!(sender_id = sender.id, "Notes service returned no id, skipping tag follow-up");
                reply_mode = TagMode::Inline;
            } else {
                self.sessions
                    .set_pending(sender.id, PendingNote::new(note.id, content))
                    .await;
            }
        }

        chat.reply(&replies::note_saved(kind, reply_mode)).await
    }
}
