//! Persistence layer for memo-relay.
//!
//! Small, crash-safe file helpers (write to a temp file, then rename) used
//! for the tag registry overlay.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use std::path::Path;
//! use memo_persistence::{atomic_write_json, read_json_optional};
//!
//! let path = Path::new("tags.json");
//! let mut tags = BTreeMap::new();
//! tags.insert("ai".to_string(), "Machine learning".to_string());
//! atomic_write_json(path, &tags).unwrap();
//!
//! let loaded: Option<BTreeMap<String, String>> = read_json_optional(path).unwrap();
//! ```

pub mod atomic;
pub mod error;

pub use atomic::{atomic_write, atomic_write_json, read_json, read_json_optional};
pub use error::{PersistenceError, Result};
