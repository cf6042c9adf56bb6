//! Client for the remote notes service (Mem API v2 style).
//!
//! Notes are opaque to the relay: it creates them with a content blob and
//! may later replace that content.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::NotesConfig;
use crate::error::{RelayError, Result};

/// Reference to a note created in the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRef {
    /// Note identifier; empty when the service did not return one.
    pub id: String,
}

/// Storage for notes.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Create a new note with the given content.
    async fn create_note(&self, content: &str) -> Result<NoteRef>;

    /// Replace the content of an existing note.
    async fn update_note(&self, note_id: &str, content: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct NoteBody<'a> {
    content: &'a str,
}

/// HTTP client for `POST /notes` and `PATCH /notes/{id}`.
#[derive(Clone)]
pub struct MemClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl MemClient {
    /// Create a client from configuration.
    pub fn new(config: &NotesConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<serde_json::Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                service: "Notes",
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RelayError::ResponseParse(e.to_string()))
    }
}

/// Pull the note id out of a create response (`id` or `noteId`).
fn note_id_from(json: &serde_json::Value) -> String {
    ["id", "noteId"]
        .iter()
        .filter_map(|key| json.get(key))
        .find_map(|value| match value {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

#[async_trait]
impl NoteStore for MemClient {
    async fn create_note(&self, content: &str) -> Result<NoteRef> {
        let url = format!("{}/notes", self.base_url);
        debug!(url = %url, len = content.len(), "Creating note");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&NoteBody { content })
            .send()
            .await?;

        let json = Self::check(response).await?;
        Ok(NoteRef {
            id: note_id_from(&json),
        })
    }

    async fn update_note(&self, note_id: &str, content: &str) -> Result<()> {
        let url = format!("{}/notes/{}", self.base_url, note_id);
        debug!(url = %url, len = content.len(), "Updating note");

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_key)
            .json(&NoteBody { content })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: String) -> MemClient {
        MemClient::new(&NotesConfig {
            api_key: "mem-key".to_string(),
            base_url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_note_id_variants() {
        assert_eq!(note_id_from(&serde_json::json!({"id": "n1"})), "n1");
        assert_eq!(note_id_from(&serde_json::json!({"noteId": "n2"})), "n2");
        assert_eq!(note_id_from(&serde_json::json!({"id": "", "noteId": "n3"})), "n3");
        assert_eq!(note_id_from(&serde_json::json!({"id": 42})), "42");
        assert_eq!(note_id_from(&serde_json::json!({"title": "x"})), "");
        assert_eq!(note_id_from(&serde_json::Value::Null), "");
    }

    #[tokio::test]
    async fn test_create_note_posts_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/notes"))
            .and(header("Authorization", "Bearer mem-key"))
            .and(body_json(serde_json::json!({"content": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "abc"})))
            .expect(1)
            .mount(&server)
            .await;

        let note = client(server.uri()).create_note("hello").await.unwrap();
        assert_eq!(note.id, "abc");
    }

    #[tokio::test]
    async fn test_update_note_patches_by_id() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/notes/abc"))
            .and(body_json(serde_json::json!({"content": "hello\n\nТеги: #ai"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "abc"})))
            .expect(1)
            .mount(&server)
            .await;

        client(format!("{}/", server.uri()))
            .update_note("abc", "hello\n\nТеги: #ai")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_note_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/notes"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(server.uri()).create_note("hello").await.unwrap_err();
        assert!(matches!(err, RelayError::Upstream { status: 401, .. }));
    }
}
