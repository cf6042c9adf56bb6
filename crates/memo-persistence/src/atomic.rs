//! Atomic file operations for crash-safe persistence.
//!
//! Every write goes to a temporary file in the target directory and is then
//! renamed over the destination, so readers only ever see the previous
//! version or the complete new one.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PersistenceError, Result};

/// Replaces the contents of `path` with `data` in a single rename.
///
/// Missing parent directories are created.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|source| PersistenceError::DirectoryError {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let write_err = |source: std::io::Error| PersistenceError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    // Same directory as the target so the rename never crosses filesystems.
    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    staged.write_all(data).map_err(write_err)?;
    staged.flush().map_err(write_err)?;
    staged.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

/// Reads and deserializes a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).map_err(|source| PersistenceError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|e| PersistenceError::InvalidData(format!(
        "{}: {}",
        path.display(),
        e
    )))
}

/// Reads a JSON file, returning `None` when it does not exist.
pub fn read_json_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}
