//! Runtime configuration for memo-relay.
//!
//! All settings come from environment variables (a `.env` file is loaded by
//! the binary before this module is consulted).
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `LLM_API_KEY` (or `ABACUS_API_KEY`): chat-completion API key
//! - `MEM_API_KEY`: notes service API key
//!
//! Optional:
//! - `LLM_BASE_URL` / `ABACUS_BASE_URL` (default: `https://routellm.abacus.ai/v1`)
//! - `LLM_MODEL` / `ABACUS_MODEL` (default: `route-llm`)
//! - `MEM_API_BASE_URL` (default: `https://api.mem.ai/v2`)
//! - `MEMO_ALLOWED_USERNAME`: the only Telegram handle allowed to use the bot
//! - `MEMO_TAGS_FILE`: tag registry file (default: `tags.json` next to the binary)
//! - `MEMO_TAG_MODE`: `inline` (default) or `pending`
//! - `MEMO_PDF_MAX_CHARS`: PDF extraction cap, `0` disables it (default: 20000)
//! - `MEMO_SUMMARY_LANGUAGE`: target language for PDF summaries (default: `ru`)
//! - `MEMO_HTTP_TIMEOUT_SECS`: per-request timeout (default: 60)
//! - `WHISPER_BIN`, `WHISPER_MODEL`, `WHISPER_LANGUAGE`: transcription settings
//! - `WHISPER_TIMEOUT_SECS`: limit for one whisper run (default: 600)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::session::TagMode;

pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const LLM_API_KEY_ENV: &str = "LLM_API_KEY";
pub const LLM_BASE_URL_ENV: &str = "LLM_BASE_URL";
pub const LLM_MODEL_ENV: &str = "LLM_MODEL";
pub const MEM_API_KEY_ENV: &str = "MEM_API_KEY";
pub const MEM_BASE_URL_ENV: &str = "MEM_API_BASE_URL";
pub const ALLOWED_USERNAME_ENV: &str = "MEMO_ALLOWED_USERNAME";
pub const TAGS_FILE_ENV: &str = "MEMO_TAGS_FILE";
pub const TAG_MODE_ENV: &str = "MEMO_TAG_MODE";
pub const PDF_MAX_CHARS_ENV: &str = "MEMO_PDF_MAX_CHARS";
pub const SUMMARY_LANGUAGE_ENV: &str = "MEMO_SUMMARY_LANGUAGE";
pub const HTTP_TIMEOUT_ENV: &str = "MEMO_HTTP_TIMEOUT_SECS";
pub const WHISPER_BIN_ENV: &str = "WHISPER_BIN";
pub const WHISPER_MODEL_ENV: &str = "WHISPER_MODEL";
pub const WHISPER_LANGUAGE_ENV: &str = "WHISPER_LANGUAGE";
pub const WHISPER_TIMEOUT_ENV: &str = "WHISPER_TIMEOUT_SECS";

// Older deployments configured the LLM through Abacus-specific names.
const LLM_API_KEY_LEGACY_ENV: &str = "ABACUS_API_KEY";
const LLM_BASE_URL_LEGACY_ENV: &str = "ABACUS_BASE_URL";
const LLM_MODEL_LEGACY_ENV: &str = "ABACUS_MODEL";

pub const DEFAULT_LLM_BASE_URL: &str = "https://routellm.abacus.ai/v1";
pub const DEFAULT_LLM_MODEL: &str = "route-llm";
pub const DEFAULT_MEM_BASE_URL: &str = "https://api.mem.ai/v2";
pub const DEFAULT_PDF_MAX_CHARS: usize = 20_000;
pub const DEFAULT_SUMMARY_LANGUAGE: &str = "ru";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_WHISPER_BIN: &str = "whisper";
pub const DEFAULT_WHISPER_MODEL: &str = "base";
pub const DEFAULT_WHISPER_LANGUAGE: &str = "ru";
pub const DEFAULT_WHISPER_TIMEOUT_SECS: u64 = 600;

/// Default tag registry file name.
const TAGS_FILE_NAME: &str = "tags.json";

/// Chat-completion endpoint settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Notes service settings.
#[derive(Debug, Clone)]
pub struct NotesConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Local speech-to-text settings.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    pub binary: String,
    pub model: String,
    pub language: String,
    /// A run taking longer is killed and reported as failed.
    pub timeout: Duration,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_WHISPER_BIN.to_string(),
            model: DEFAULT_WHISPER_MODEL.to_string(),
            language: DEFAULT_WHISPER_LANGUAGE.to_string(),
            timeout: Duration::from_secs(DEFAULT_WHISPER_TIMEOUT_SECS),
        }
    }
}

/// Behaviour knobs of the note workflow.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Handle allowed to use the bot (without `@`). `None` refuses everyone.
    pub allowed_username: Option<String>,
    pub tag_mode: TagMode,
    /// `None` means no cap.
    pub pdf_max_chars: Option<usize>,
    pub summary_language: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            allowed_username: None,
            tag_mode: TagMode::default(),
            pdf_max_chars: Some(DEFAULT_PDF_MAX_CHARS),
            summary_language: DEFAULT_SUMMARY_LANGUAGE.to_string(),
        }
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub telegram_token: String,
    pub llm: LlmConfig,
    pub notes: NotesConfig,
    pub whisper: WhisperConfig,
    pub workflow: WorkflowSettings,
    pub tags_file: PathBuf,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset. Every missing required variable is
    /// reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let get_either = |name: &str, legacy: &str| get(name).or_else(|| get(legacy));

        let telegram_token = get(TELEGRAM_TOKEN_ENV);
        let llm_api_key = get_either(LLM_API_KEY_ENV, LLM_API_KEY_LEGACY_ENV);
        let mem_api_key = get(MEM_API_KEY_ENV);

        let mut missing = Vec::new();
        if telegram_token.is_none() {
            missing.push(TELEGRAM_TOKEN_ENV.to_string());
        }
        if llm_api_key.is_none() {
            missing.push(LLM_API_KEY_ENV.to_string());
        }
        if mem_api_key.is_none() {
            missing.push(MEM_API_KEY_ENV.to_string());
        }

        let (Some(telegram_token), Some(llm_api_key), Some(mem_api_key)) =
            (telegram_token, llm_api_key, mem_api_key)
        else {
            return Err(ConfigError::Missing(missing));
        };

        let timeout = Duration::from_secs(parse_or(
            HTTP_TIMEOUT_ENV,
            get(HTTP_TIMEOUT_ENV),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);

        let whisper_timeout = Duration::from_secs(parse_or(
            WHISPER_TIMEOUT_ENV,
            get(WHISPER_TIMEOUT_ENV),
            DEFAULT_WHISPER_TIMEOUT_SECS,
        )?);

        let pdf_max_chars = match parse_or(
            PDF_MAX_CHARS_ENV,
            get(PDF_MAX_CHARS_ENV),
            DEFAULT_PDF_MAX_CHARS,
        )? {
            0 => None,
            n => Some(n),
        };

        let tag_mode = match get(TAG_MODE_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: TAG_MODE_ENV.to_string(),
                value: raw,
            })?,
            None => TagMode::default(),
        };

        let allowed_username = get(ALLOWED_USERNAME_ENV).map(|u| normalize_username(&u));

        let tags_file = get(TAGS_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_tags_file);

        Ok(Self {
            telegram_token,
            llm: LlmConfig {
                api_key: llm_api_key,
                base_url: get_either(LLM_BASE_URL_ENV, LLM_BASE_URL_LEGACY_ENV)
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                model: get_either(LLM_MODEL_ENV, LLM_MODEL_LEGACY_ENV)
                    .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                timeout,
            },
            notes: NotesConfig {
                api_key: mem_api_key,
                base_url: get(MEM_BASE_URL_ENV).unwrap_or_else(|| DEFAULT_MEM_BASE_URL.to_string()),
                timeout,
            },
            whisper: WhisperConfig {
                binary: get(WHISPER_BIN_ENV).unwrap_or_else(|| DEFAULT_WHISPER_BIN.to_string()),
                model: get(WHISPER_MODEL_ENV).unwrap_or_else(|| DEFAULT_WHISPER_MODEL.to_string()),
                language: get(WHISPER_LANGUAGE_ENV)
                    .unwrap_or_else(|| DEFAULT_WHISPER_LANGUAGE.to_string()),
                timeout: whisper_timeout,
            },
            workflow: WorkflowSettings {
                allowed_username,
                tag_mode,
                pdf_max_chars,
                summary_language: get(SUMMARY_LANGUAGE_ENV)
                    .unwrap_or_else(|| DEFAULT_SUMMARY_LANGUAGE.to_string()),
            },
            tags_file,
        })
    }
}

/// Strip a leading `@` and surrounding whitespace from a Telegram handle.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_string()
}

/// Get the default tag registry path: `tags.json` next to the running binary.
///
/// Falls back to the working directory when the binary path is unknown.
pub fn default_tags_file() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(TAGS_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(TAGS_FILE_NAME))
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            (TELEGRAM_TOKEN_ENV, "tg-token"),
            (LLM_API_KEY_ENV, "llm-key"),
            (MEM_API_KEY_ENV, "mem-key"),
        ]
    }

    #[test]
    fn test_missing_required_reports_all() {
        let err = RelayConfig::from_lookup(lookup_from(&[])).unwrap_err();
        match err {
            ConfigError::Missing(names) => {
                assert_eq!(names, vec![TELEGRAM_TOKEN_ENV, LLM_API_KEY_ENV, MEM_API_KEY_ENV]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let err = RelayConfig::from_lookup(lookup_from(&[
            (TELEGRAM_TOKEN_ENV, "tg-token"),
            (LLM_API_KEY_ENV, "  "),
            (MEM_API_KEY_ENV, "mem-key"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(LLM_API_KEY_ENV));
    }

    #[test]
    fn test_defaults_applied() {
        let config = RelayConfig::from_lookup(lookup_from(&required())).unwrap();

        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.notes.base_url, DEFAULT_MEM_BASE_URL);
        assert_eq!(config.llm.timeout, Duration::from_secs(60));
        assert_eq!(config.workflow.pdf_max_chars, Some(20_000));
        assert_eq!(config.workflow.summary_language, "ru");
        assert_eq!(config.workflow.tag_mode, TagMode::Inline);
        assert!(config.workflow.allowed_username.is_none());
        assert!(config.tags_file.ends_with("tags.json"));
        assert_eq!(config.whisper.timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_legacy_abacus_names() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            (TELEGRAM_TOKEN_ENV, "tg-token"),
            ("ABACUS_API_KEY", "abacus-key"),
            ("ABACUS_MODEL", "gpt-4o"),
            (MEM_API_KEY_ENV, "mem-key"),
        ]))
        .unwrap();

        assert_eq!(config.llm.api_key, "abacus-key");
        assert_eq!(config.llm.model, "gpt-4o");
    }

    #[test]
    fn test_overrides() {
        let mut pairs = required();
        pairs.extend([
            (ALLOWED_USERNAME_ENV, "@Owner"),
            (TAG_MODE_ENV, "pending"),
            (PDF_MAX_CHARS_ENV, "0"),
            (TAGS_FILE_ENV, "/tmp/memo-tags.json"),
            (WHISPER_TIMEOUT_ENV, "90"),
        ]);
        let config = RelayConfig::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.workflow.allowed_username.as_deref(), Some("Owner"));
        assert_eq!(config.workflow.tag_mode, TagMode::Pending);
        assert_eq!(config.workflow.pdf_max_chars, None);
        assert_eq!(config.tags_file, PathBuf::from("/tmp/memo-tags.json"));
        assert_eq!(config.whisper.timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let mut pairs = required();
        pairs.push((PDF_MAX_CHARS_ENV, "lots"));
        let err = RelayConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
