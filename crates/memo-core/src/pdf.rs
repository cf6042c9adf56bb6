//! Text extraction from PDF documents.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{RelayError, Result};

/// Separator placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Join page texts, skipping blank pages, and stop once `max_chars` is reached.
///
/// The iterator is consumed lazily, so pages past the cap are never produced.
/// The result never exceeds `max_chars` characters.
pub fn join_pages<I>(pages: I, max_chars: Option<usize>) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut out = String::new();
    let mut chars = 0usize;

    for page in pages {
        if page.trim().is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str(PAGE_SEPARATOR);
            chars += PAGE_SEPARATOR.len();
        }
        chars += page.chars().count();
        out.push_str(&page);

        if let Some(max) = max_chars {
            if chars >= max {
                return truncate_chars(out, max);
            }
        }
    }

    out
}

fn truncate_chars(mut text: String, max: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
    text
}

/// Pulls plain text out of a PDF file.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn extract(&self, path: &Path, max_chars: Option<usize>) -> Result<String>;
}

/// Extractor built on `lopdf`. Parsing runs on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    fn extract_blocking(path: &Path, max_chars: Option<usize>) -> Result<String> {
        let doc = lopdf::Document::load(path).map_err(|e| RelayError::Pdf(e.to_string()))?;
        let page_numbers: Vec<u32> = doc.get_pages().into_keys().collect();
        debug!(pages = page_numbers.len(), path = %path.display(), "Extracting PDF text");

        let pages = page_numbers.into_iter().map(|number| {
            doc.extract_text(&[number]).unwrap_or_else(|e| {
                warn!(page = number, error = %e, "Skipping unreadable PDF page");
                String::new()
            })
        });

        Ok(join_pages(pages, max_chars))
    }
}

#[async_trait]
impl PdfExtractor for LopdfExtractor {
    async fn extract(&self, path: &Path, max_chars: Option<usize>) -> Result<String> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::extract_blocking(&path, max_chars))
            .await
            .map_err(|e| RelayError::Pdf(format!("extraction task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_join_preserves_order_and_skips_blank_pages() {
        let joined = join_pages(pages(&["one", "", "two", "  \n", "three"]), None);
        assert_eq!(joined, "one\n\ntwo\n\nthree");
    }

    #[test]
    fn test_join_no_pages() {
        assert_eq!(join_pages(pages(&["", " "]), Some(100)), "");
        assert_eq!(join_pages(Vec::new(), None), "");
    }

    #[test]
    fn test_cap_truncates_exactly() {
        let joined = join_pages(pages(&["abcdef", "ghijkl"]), Some(10));
        assert_eq!(joined, "abcdef\n\ngh");
        assert_eq!(joined.chars().count(), 10);
    }

    #[test]
    fn test_cap_counts_characters_not_bytes() {
        let joined = join_pages(pages(&["привет", "мир"]), Some(4));
        assert_eq!(joined, "прив");
    }

    #[test]
    fn test_cap_stops_consuming_pages() {
        let mut produced = 0;
        let source = (0..100).map(|i| {
            produced += 1;
            format!("page-{i}")
        });

        let joined = join_pages(source, Some(12));

        assert!(joined.chars().count() <= 12);
        assert!(produced < 100);
    }

    #[test]
    fn test_under_cap_untouched() {
        let joined = join_pages(pages(&["short"]), Some(20_000));
        assert_eq!(joined, "short");
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = LopdfExtractor.extract(&path, Some(100)).await.unwrap_err();
        assert!(matches!(err, RelayError::Pdf(_)));
    }
}
