/// Type definitions for BookReader highlight exports, and the directory scan that
/// classifies them against the history.
///
/// One export file per book:
/// ```json
/// {
///   "title": "Foo",
///   "authors": "Jane Doe",
///   "bookmarks": [
///     { "text": "hi", "name": "", "start": 5, "end": 6, "color": "yellow" }
///   ]
/// }
/// ```
use eyre::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};

use crate::history::History;
use crate::utils::content_hash;

/// Author value used when an export carries no `authors` field.
pub const UNKNOWN_AUTHOR: &str = "None";

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookDocument {
    pub title: String,
    #[serde(default = "unknown_author", deserialize_with = "author_or_default")]
    pub authors: String,
    /// `None` when the export has no `bookmarks` key at all.
    #[serde(default)]
    pub bookmarks: Option<Vec<Bookmark>>,
}

/// A single highlight inside a book export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bookmark {
    /// The highlighted passage.
    pub text: String,
    /// Optional note attached to the highlight.
    #[serde(default)]
    pub name: Option<String>,
    pub start: f64,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
}

fn unknown_author() -> String {
    UNKNOWN_AUTHOR.to_string()
}

/// `"authors": null` is treated like a missing field.
fn author_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_author))
}

impl BookDocument {
    /// Highlights eligible for export; `None` if the book has none.
    pub fn highlights(&self) -> Option<&[Bookmark]> {
        self.bookmarks.as_deref().filter(|b| !b.is_empty())
    }

    /// Approximate surname: the last whitespace-separated token of `authors`.
    pub fn sort_key(&self) -> &str {
        self.authors.split_whitespace().next_back().unwrap_or("")
    }
}

/// A parsed export file together with the hash of its raw contents.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedBook {
    pub document: BookDocument,
    pub hash: String,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub unprocessed: Vec<ScannedBook>,
    pub processed: Vec<ScannedBook>,
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Parse one export file from raw bytes.
pub fn parse_document(bytes: &[u8]) -> serde_json::Result<BookDocument> {
    serde_json::from_slice(bytes)
}

/// `*.json` as a shell glob would match it: no hidden files, case-sensitive extension.
fn is_export_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.') && name.ends_with(".json")
}

/// Read every export in `directory` and split them by whether their hash is in `history`.
///
/// Any unreadable or malformed file aborts the scan.
pub fn scan(directory: &Path, history: &History) -> Result<ScanResult> {
    let entries = fs::read_dir(directory).wrap_err_with(|| {
        format!("Failed to read bookreader directory: {}", directory.display())
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.wrap_err_with(|| format!("Failed to list {}", directory.display()))?;
        let path = entry.path();
        if is_export_file(&path) && path.is_file() {
            paths.push(path);
        }
    }
    // read_dir order is platform-dependent; fix it before the stable sort below.
    paths.sort();

    let mut result = ScanResult::default();
    for path in paths {
        let bytes =
            fs::read(&path).wrap_err_with(|| format!("Failed to read: {}", path.display()))?;
        let hash = content_hash(&bytes);
        let document = parse_document(&bytes)
            .wrap_err_with(|| format!("Failed to parse: {}", path.display()))?;
        tracing::debug!(file = %path.display(), %hash, title = %document.title, "scanned");

        let book = ScannedBook {
            document,
            hash,
            path,
        };
        if history.contains(&book.hash) {
            result.processed.push(book);
        } else {
            result.unprocessed.push(book);
        }
    }

    sort_by_surname(&mut result.unprocessed);
    sort_by_surname(&mut result.processed);
    tracing::info!(
        unprocessed = result.unprocessed.len(),
        processed = result.processed.len(),
        directory = %directory.display(),
        "scan complete"
    );
    Ok(result)
}

pub fn sort_by_surname(books: &mut [ScannedBook]) {
    books.sort_by(|a, b| a.document.sort_key().cmp(b.document.sort_key()));
}
