//! OpenAI-compatible chat-completion client used to enrich notes.
//!
//! Two operations are supported: expanding a short thought into a structured
//! note, and summarizing a PDF's text in a target language. Each is a single
//! request with a fixed system prompt; failures are returned to the caller
//! without retrying.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{RelayError, Result};

/// System prompt for expanding a short thought.
const EXPAND_PROMPT: &str = "Ты помощник, который помогает пользователю развёртывать краткие мысли \
в более подробные и структурированные заметки для персональной базы знаний.";

/// How the model should treat the user's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformMode {
    /// Elaborate a terse thought into a structured note.
    Expand,
    /// Summarize a document and explain it in `target_lang`.
    SummarizePdf { target_lang: String },
}

impl TransformMode {
    /// Build the system instruction for this mode.
    pub fn system_prompt(&self) -> String {
        match self {
            Self::Expand => EXPAND_PROMPT.to_string(),
            Self::SummarizePdf { target_lang } => format!(
                "Ты помощник, который получает текст PDF-документа и должен:\n\
                1) Кратко и понятно изложить его суть и ключевые идеи.\n\
                2) Перевести и объяснить содержание на {target_lang} языке.\n\
                Ответ дай в виде структурированной заметки (заголовки, списки по необходимости)."
            ),
        }
    }
}

/// Something that can rewrite text through a language model.
#[async_trait]
pub trait TextTransform: Send + Sync {
    /// Run one completion for `text` and return the model's answer.
    async fn transform(&self, text: &str, mode: &TransformMode) -> Result<String>;
}

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// A message in the chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion response (only the fields we read).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmClient {
    /// Create a client from configuration.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Send a chat completion request and return the first choice's text.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
        };

        debug!(model = %self.model, url = %url, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                service: "LLM",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RelayError::ResponseParse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RelayError::ResponseParse("No content in response".to_string()))
    }
}

#[async_trait]
impl TextTransform for LlmClient {
    async fn transform(&self, text: &str, mode: &TransformMode) -> Result<String> {
        let messages = vec![
            ChatMessage::system(mode.system_prompt()),
            ChatMessage::user(text),
        ];
        self.chat(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> LlmConfig {
        LlmConfig {
            api_key: "test-key".to_string(),
            base_url,
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
            "usage": {"total_tokens": 3}
        })
    }

    #[test]
    fn test_summarize_prompt_names_language() {
        let mode = TransformMode::SummarizePdf {
            target_lang: "en".to_string(),
        };
        assert!(mode.system_prompt().contains("на en языке"));
        assert!(!TransformMode::Expand.system_prompt().contains("PDF"));
    }

    #[tokio::test]
    async fn test_expand_sends_system_and_user_messages() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "messages": [
                    {"role": "system", "content": EXPAND_PROMPT},
                    {"role": "user", "content": "buy milk"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Expanded: buy milk")))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::new(&config(server.uri())).unwrap();
        let result = client.transform("buy milk", &TransformMode::Expand).await.unwrap();

        assert_eq!(result, "Expanded: buy milk");
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::new(&config(format!("{}/", server.uri()))).unwrap();
        assert_eq!(client.transform("x", &TransformMode::Expand).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::new(&config(server.uri())).unwrap();
        let err = client.transform("x", &TransformMode::Expand).await.unwrap_err();

        match err {
            RelayError::Upstream { service, status, body } => {
                assert_eq!(service, "LLM");
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let client = LlmClient::new(&config(server.uri())).unwrap();
        let err = client.transform("x", &TransformMode::Expand).await.unwrap_err();
        assert!(matches!(err, RelayError::ResponseParse(_)));
    }

    #[tokio::test]
    async fn test_timeout_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut cfg = config(server.uri());
        cfg.timeout = Duration::from_millis(50);
        let client = LlmClient::new(&cfg).unwrap();

        let err = client.transform("x", &TransformMode::Expand).await.unwrap_err();
        assert!(matches!(err, RelayError::Http(_)));
    }
}
