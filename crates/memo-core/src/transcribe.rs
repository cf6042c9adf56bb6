//! Speech-to-text for voice and audio messages.
//!
//! Transcription never fails the note workflow: every outcome is a
//! [`Transcript`], and failures turn into a placeholder text that is stored
//! as the note content.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::WhisperConfig;

/// Placeholder stored when speech was not recognized.
pub const UNRECOGNIZED_SPEECH: &str = "[Не удалось распознать речь]";

/// Outcome of a transcription attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// Recognized text (may be empty).
    Text(String),
    /// Transcription could not run; the reason is kept for the note.
    Failed(String),
}

impl Transcript {
    /// Text to store as the note content.
    pub fn into_content(self) -> String {
        match self {
            Self::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    UNRECOGNIZED_SPEECH.to_string()
                } else {
                    text.to_string()
                }
            }
            Self::Failed(reason) => format!("[Ошибка транскрибации: {reason}]"),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Turns an audio file into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Transcript;
}

/// Transcriber backed by the `whisper` command-line tool.
///
/// The executable is looked up on first use and the result (found or not) is
/// reused for the lifetime of the value. `OnceLock` makes concurrent first
/// calls resolve it once. Recognition runs in a child process; a run longer
/// than the configured timeout is killed.
#[derive(Debug)]
pub struct WhisperCli {
    config: WhisperConfig,
    engine: OnceLock<Result<PathBuf, String>>,
}

impl WhisperCli {
    pub fn new(config: WhisperConfig) -> Self {
        Self {
            config,
            engine: OnceLock::new(),
        }
    }

    /// Resolve the whisper executable, once.
    fn engine(&self) -> Result<PathBuf, String> {
        self.engine
            .get_or_init(|| {
                info!(binary = %self.config.binary, model = %self.config.model, "Resolving whisper executable");
                which::which(&self.config.binary)
                    .map_err(|e| format!("whisper not found ({}): {}", self.config.binary, e))
            })
            .clone()
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn transcribe(&self, audio: &Path) -> Transcript {
        if !audio.exists() {
            return Transcript::Failed(format!("Аудиофайл не найден: {}", audio.display()));
        }

        let engine = match self.engine() {
            Ok(path) => path,
            Err(reason) => {
                warn!(reason = %reason, "Whisper unavailable");
                return Transcript::Failed(reason);
            }
        };

        match run_whisper(&engine, &self.config, audio).await {
            Ok(text) => Transcript::Text(text),
            Err(reason) => {
                error!(reason = %reason, "Transcription failed");
                Transcript::Failed(reason)
            }
        }
    }
}

/// Run whisper on one file and read back the `.txt` it writes.
async fn run_whisper(
    engine: &Path,
    config: &WhisperConfig,
    audio: &Path,
) -> Result<String, String> {
    let out_dir = tempfile::tempdir().map_err(|e| format!("temp dir: {e}"))?;

    let mut command = Command::new(engine);
    command
        .arg(audio)
        .args(["--model", config.model.as_str()])
        .args(["--language", config.language.as_str()])
        .args(["--task", "transcribe"])
        .args(["--output_format", "txt"])
        .arg("--output_dir")
        .arg(out_dir.path())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(config.timeout, command.output()).await {
        Ok(result) => result.map_err(|e| format!("failed to run whisper: {e}"))?,
        Err(_) => return Err(format!("whisper timed out after {:?}", config.timeout)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("whisper exited with {}: {}", output.status, stderr.trim()));
    }

    let stem = audio
        .file_stem()
        .ok_or_else(|| format!("bad audio path: {}", audio.display()))?;
    let transcript_path = out_dir.path().join(format!("{}.txt", stem.to_string_lossy()));

    tokio::fs::read_to_string(&transcript_path)
        .await
        .map(|text| text.trim().to_string())
        .map_err(|e| format!("no transcript at {}: {}", transcript_path.display(), e))
}
