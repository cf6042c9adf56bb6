//! Tag registry: known tag names with human-readable descriptions.
//!
//! Built-in tags are compiled in. Tags added through `/addtag` live in a JSON
//! file (`{"name": "description"}`) and win over built-ins with the same
//! name. The file is re-read on every access and rewritten in full on every
//! change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;

/// Marker character in front of tag names (`#ai`).
pub const TAG_MARKER: char = '#';

/// Tags available without any configuration.
pub const BUILTIN_TAGS: &[(&str, &str)] = &[
    ("petproject", "Личные/экспериментальные проекты."),
    ("robot", "Всё, что связано с роботами и робототехникой."),
    ("ai", "Идеи и материалы по искусственному интеллекту и ML."),
    (
        "vla",
        "Заметки про VLA (вероятно, внутренняя аббревиатура, связанная с проектами/инфраструктурой).",
    ),
    ("leshy", "Мой проект для роботов в Яндексе."),
    ("personal", "Личные заметки, не связанные с работой."),
];

/// Strip surrounding whitespace and one leading marker from a tag name.
pub fn normalize_tag_name(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(TAG_MARKER)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Tag registry backed by a JSON overlay file.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    path: PathBuf,
    builtins: BTreeMap<String, String>,
}

impl TagRegistry {
    /// Create a registry with the default built-in tags.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let builtins = BUILTIN_TAGS
            .iter()
            .map(|(name, desc)| (name.to_string(), desc.to_string()))
            .collect();
        Self::with_builtins(path, builtins)
    }

    /// Create a registry with a custom set of built-in tags.
    pub fn with_builtins(path: impl Into<PathBuf>, builtins: BTreeMap<String, String>) -> Self {
        Self {
            path: path.into(),
            builtins,
        }
    }

    /// Path of the user tag file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All tags, built-ins merged with user entries, sorted by name.
    pub fn list(&self) -> BTreeMap<String, String> {
        let mut tags = self.builtins.clone();
        tags.extend(self.load_user_tags());
        tags
    }

    /// Add or replace a user tag.
    ///
    /// Returns `Ok(false)` without touching the file when the name is empty
    /// after normalization.
    pub fn upsert(&self, name: &str, description: &str) -> Result<bool> {
        let name = normalize_tag_name(name);
        if name.is_empty() {
            debug!("Ignoring tag upsert with empty name");
            return Ok(false);
        }

        let mut user_tags = self.load_user_tags();
        user_tags.insert(name.clone(), description.trim().to_string());
        memo_persistence::atomic_write_json(&self.path, &user_tags)?;

        info!(tag = %name, path = %self.path.display(), "Saved user tag");
        Ok(true)
    }

    /// Load user tags; anything unreadable counts as no user tags.
    fn load_user_tags(&self) -> BTreeMap<String, String> {
        match memo_persistence::read_json_optional::<BTreeMap<String, String>>(&self.path) {
            Ok(Some(tags)) => tags,
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Failed to load user tags, ignoring file");
                BTreeMap::new()
            }
        }
    }
}

/// Render the `/tags` listing.
pub fn format_tags_help(tags: &BTreeMap<String, String>) -> String {
    let mut lines = vec!["Известные теги и их описание:".to_string()];
    for (tag, desc) in tags {
        lines.push(format!("- {TAG_MARKER}{tag} — {desc}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_list_contains_builtins_sorted() {
        let dir = tempdir().unwrap();
        let registry = TagRegistry::new(dir.path().join("tags.json"));

        let tags = registry.list();
        let names: Vec<_> = tags.keys().cloned().collect();

        assert_eq!(names, vec!["ai", "leshy", "personal", "petproject", "robot", "vla"]);
    }

    #[test]
    fn test_upsert_strips_marker_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tags.json");
        let registry = TagRegistry::new(&path);

        assert!(registry.upsert("  #rust ", " Язык Rust ").unwrap());

        assert_eq!(registry.list().get("rust").map(String::as_str), Some("Язык Rust"));
        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk["rust"], "Язык Rust");
    }

    #[test]
    fn test_upsert_overrides_builtin() {
        let dir = tempdir().unwrap();
        let registry = TagRegistry::new(dir.path().join("tags.json"));

        registry.upsert("ai", "Только LLM").unwrap();

        assert_eq!(registry.list()["ai"], "Только LLM");
    }

    #[test]
    fn test_upsert_empty_name_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tags.json");
        let registry = TagRegistry::new(&path);
        let before = registry.list();

        assert!(!registry.upsert("#", "desc").unwrap());
        assert!(!registry.upsert("   ", "desc").unwrap());

        assert!(!path.exists());
        assert_eq!(registry.list(), before);
    }

    #[test]
    fn test_upsert_rewrites_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tags.json");
        let registry = TagRegistry::new(&path);

        registry.upsert("one", "first").unwrap();
        registry.upsert("two", "second").unwrap();
        registry.upsert("one", "changed").unwrap();

        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert_eq!(on_disk["one"], "changed");
        assert_eq!(on_disk["two"], "second");
    }

    #[test]
    fn test_malformed_file_falls_back_to_builtins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tags.json");
        fs::write(&path, "{ definitely not json").unwrap();
        let registry = TagRegistry::new(&path);

        assert_eq!(registry.list().len(), BUILTIN_TAGS.len());

        // Writing replaces the broken file with a valid one.
        registry.upsert("fresh", "new").unwrap();
        assert_eq!(registry.list()["fresh"], "new");
    }

    #[test]
    fn test_format_tags_help() {
        let mut tags = BTreeMap::new();
        tags.insert("b".to_string(), "второй".to_string());
        tags.insert("a".to_string(), "первый".to_string());

        assert_eq!(
            format_tags_help(&tags),
            "Известные теги и их описание:\n- #a — первый\n- #b — второй"
        );
    }

    #[test]
    fn test_normalize_tag_name() {
        assert_eq!(normalize_tag_name("#ai"), "ai");
        assert_eq!(normalize_tag_name("  ai "), "ai");
        assert_eq!(normalize_tag_name("##ai"), "#ai");
        assert_eq!(normalize_tag_name("#"), "");
    }
}
