//! The versioned JSON store.
//!
//! A single JSON document:
//!
//! ```json
//! {
//!   "characters": [ ... ],
//!   "date": "2025-01-31 18:04:11",
//!   "top_vns": [ { "id": "v17", "title": "..." } ],
//!   "version": "1.0.0"
//! }
//! ```
//!
//! Output is canonical: two-space indentation, object keys sorted, non-ASCII
//! text written as-is. Writes go to a sibling temporary file that is then
//! renamed over the target, so a failed run never leaves a half-written
//! store behind.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{CharacterRecord, VnEntry};

pub const STORE_VERSION: &str = "1.0.0";

/// Local timestamp format of the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    pub characters: Vec<CharacterRecord>,
    #[serde(default)]
    pub top_vns: Vec<VnEntry>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub date: String,
}

impl Store {
    /// A store stamped with the current version and local time.
    pub fn new(characters: Vec<CharacterRecord>, top_vns: Vec<VnEntry>) -> Self {
        Self {
            characters,
            top_vns,
            version: STORE_VERSION.to_string(),
            date: now_string(),
        }
    }
}

pub fn now_string() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

/// Read the store at `path`. A missing file is `Ok(None)`.
pub fn read_store(path: &Path) -> Result<Option<Store>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Serialize with sorted keys and two-space indentation.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    // serde_json's Map is ordered by key, so going through Value sorts
    // every object.
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn write_store(path: &Path, store: &Store) -> Result<()> {
    write_atomic(path, &to_canonical_json(store)?)
}

/// Replace `path` with `contents` via a temporary sibling file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, contents)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
