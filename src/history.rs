//! Persisted record of which BookReader exports have already been converted.
//!
//! The history file is a small JSON document:
//!
//! ```json
//! {
//!   "bookreader_directory": "/home/reader/BookReader",
//!   "processed_hashes": {
//!     "<sha256>": { "author": "Jane Doe", "title": "Foo" }
//!   }
//! }
//! ```
//!
//! Entries are only ever added. Clearing an entry (to re-offer a book) is a manual edit.
use eyre::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Provenance stored for each exported file hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedBook {
    pub author: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookreader_directory: Option<PathBuf>,
    /// In export order.
    #[serde(default)]
    pub processed_hashes: IndexMap<String, ProcessedBook>,
}

impl History {
    /// Read the history file. A missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no history file yet, starting empty");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .wrap_err_with(|| format!("Failed to read history: {}", path.display()));
            }
        };
        let history: Self = serde_json::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse history: {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            processed = history.processed_hashes.len(),
            "loaded history"
        );
        Ok(history)
    }

    /// Replace the history file's contents with the current record, indented.
    ///
    /// The JSON is written to a temporary file beside the real target (symlinks resolved)
    /// which is then renamed over it, so an interrupted write leaves the previous history
    /// intact. An existing file keeps its permissions.
    pub fn save(&self, path: &Path) -> Result<()> {
        let existing = fs::metadata(path).ok();
        let target = match existing {
            Some(_) => fs::canonicalize(path)
                .wrap_err_with(|| format!("Failed to resolve history: {}", path.display()))?,
            None => path.to_path_buf(),
        };
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).wrap_err_with(|| {
            format!("Failed to create temporary history file in {}", dir.display())
        })?;
        if let Some(meta) = &existing {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .wrap_err("Failed to copy history permissions")?;
        }
        serde_json::to_writer_pretty(&mut tmp, self).wrap_err("Failed to serialize history")?;
        tmp.write_all(b"\n")
            .and_then(|_| tmp.flush())
            .wrap_err("Failed to write history")?;
        tmp.persist(&target)
            .map_err(|e| e.error)
            .wrap_err_with(|| format!("Failed to replace history: {}", target.display()))?;
        tracing::debug!(path = %target.display(), "saved history");
        Ok(())
    }

    pub fn remember_directory(&mut self, dir: impl Into<PathBuf>) {
        self.bookreader_directory = Some(dir.into());
    }

    pub fn record_export(&mut self, hash: &str, author: &str, title: &str) {
        self.processed_hashes.insert(
            hash.to_string(),
            ProcessedBook {
                author: author.to_string(),
                title: title.to_string(),
            },
        );
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.processed_hashes.contains_key(hash)
    }
}
