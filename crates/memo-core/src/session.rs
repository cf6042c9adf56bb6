//! Per-sender note workflow state.
//!
//! In [`TagMode::Pending`] a freshly created note waits for the sender's next
//! text message, which is parsed as tags and appended to the note. In
//! [`TagMode::Inline`] no state is kept at all: tags are written in the
//! message itself.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tokio::sync::RwLock;

use crate::tags::{normalize_tag_name, TAG_MARKER};

/// How tags get attached to notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagMode {
    /// Every event creates a note; tags are embedded in the content.
    #[default]
    Inline,
    /// The next text message after a note is created is treated as its tags.
    Pending,
}

impl FromStr for TagMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "pending" => Ok(Self::Pending),
            other => Err(format!("unknown tag mode: {other}")),
        }
    }
}

impl fmt::Display for TagMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

/// A created note waiting for its tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNote {
    pub note_id: String,
    pub original_content: String,
}

impl PendingNote {
    pub fn new(note_id: impl Into<String>, original_content: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            original_content: original_content.into(),
        }
    }

    /// Note content with a `Теги:` line appended for the given tag message.
    pub fn with_tags(&self, tag_message: &str) -> String {
        format!("{}\n\nТеги: {}", self.original_content, format_tags(tag_message))
            .trim()
            .to_string()
    }
}

/// Pending notes keyed by sender id. At most one entry per sender.
///
/// Each call takes the lock once. A handler that reads, calls out to the
/// notes service, then removes is not atomic: two concurrent messages from
/// the same sender can both see the same pending note.
#[derive(Debug, Default)]
pub struct SessionStore {
    pending: RwLock<HashMap<i64, PendingNote>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending note, replacing any previous one for this sender.
    pub async fn set_pending(&self, sender_id: i64, note: PendingNote) {
        self.pending.write().await.insert(sender_id, note);
    }

    pub async fn pending(&self, sender_id: i64) -> Option<PendingNote> {
        self.pending.read().await.get(&sender_id).cloned()
    }

    pub async fn has_pending(&self, sender_id: i64) -> bool {
        self.pending.read().await.contains_key(&sender_id)
    }

    /// Remove and return the sender's pending note.
    pub async fn take_pending(&self, sender_id: i64) -> Option<PendingNote> {
        self.pending.write().await.remove(&sender_id)
    }

    pub async fn len(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.read().await.is_empty()
    }
}

/// Split a tag message on `,`, `;` and newlines.
///
/// Each token is trimmed and loses one leading `#`; empty tokens are dropped.
pub fn parse_tags(text: &str) -> Vec<String> {
    text.split(|c: char| matches!(c, ',' | ';' | '\n'))
        .map(normalize_tag_name)
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Render a tag message as `#a, #b`, or the trimmed raw text when it holds no tags.
pub fn format_tags(text: &str) -> String {
    let tags = parse_tags(text);
    if tags.is_empty() {
        return text.trim().to_string();
    }
    tags.iter()
        .map(|tag| format!("{TAG_MARKER}{tag}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_parse_tags_separators() {
        assert_eq!(
            parse_tags("#ai, robot;#leshy\npersonal"),
            vec!["ai", "robot", "leshy", "personal"]
        );
    }

    #[test]
    fn test_parse_tags_drops_empty_tokens() {
        assert_eq!(parse_tags(",, #ai ,;\n\n"), vec!["ai"]);
        assert!(parse_tags(" , ; \n # ").is_empty());
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_parse_tags_strips_single_marker() {
        assert_eq!(parse_tags("##nested"), vec!["#nested"]);
    }

    #[test]
    fn test_parse_tags_rejoin_is_stable() {
        let inputs = ["#ai, robot", "a;b;;c", "##x, # y\n#z", "one"];
        for input in inputs {
            let first: BTreeSet<String> = parse_tags(input).into_iter().collect();
            let rejoined = first
                .iter()
                .map(|t| format!("#{t}"))
                .collect::<Vec<_>>()
                .join(", ");
            let second: BTreeSet<String> = parse_tags(&rejoined).into_iter().collect();
            assert_eq!(first, second, "input: {input:?}");
        }
    }

    #[test]
    fn test_format_tags() {
        assert_eq!(format_tags("ai, #robot"), "#ai, #robot");
        assert_eq!(format_tags("  ,;  "), ",;");
        assert_eq!(format_tags("   "), "");
    }

    #[test]
    fn test_with_tags_appends_line() {
        let note = PendingNote::new("n1", "Купить молоко");
        assert_eq!(note.with_tags("personal"), "Купить молоко\n\nТеги: #personal");
    }

    #[test]
    fn test_tag_mode_parse() {
        assert_eq!("inline".parse::<TagMode>().unwrap(), TagMode::Inline);
        assert_eq!(" Pending ".parse::<TagMode>().unwrap(), TagMode::Pending);
        assert!("both".parse::<TagMode>().is_err());
        assert_eq!(TagMode::Pending.to_string(), "pending");
    }

    #[tokio::test]
    async fn test_store_one_entry_per_sender() {
        let store = SessionStore::new();

        store.set_pending(1, PendingNote::new("a", "first")).await;
        store.set_pending(1, PendingNote::new("b", "second")).await;
        store.set_pending(2, PendingNote::new("c", "other")).await;

        assert_eq!(store.len().await, 2);
        assert_eq!(store.pending(1).await.unwrap().note_id, "b");

        let taken = store.take_pending(1).await.unwrap();
        assert_eq!(taken.original_content, "second");
        assert!(!store.has_pending(1).await);
        assert!(store.take_pending(1).await.is_none());
        assert!(store.has_pending(2).await);
    }
}
