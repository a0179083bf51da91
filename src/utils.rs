use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Settings required to run an interactive session.
/// This decouples the session from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub history_file: PathBuf,
    pub destination_dir: PathBuf,
}

/// Expand a leading `~` to the current user's home directory.
///
/// Only `~` on its own or followed by a separator is expanded; `~user` forms and paths
/// without a leading tilde are returned unchanged, as is everything when no home
/// directory can be determined.
pub fn expand_tilde(path: &Path) -> PathBuf {
    expand_tilde_with(path, dirs::home_dir().as_deref())
}

pub(crate) fn expand_tilde_with(path: &Path, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return path.to_path_buf();
    };
    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home.to_path_buf(),
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// `clap` value parser for path flags that accept `~`.
pub fn parse_path_arg(raw: &str) -> Result<PathBuf, String> {
    if raw.is_empty() {
        return Err("path must not be empty".to_string());
    }
    Ok(expand_tilde(Path::new(raw)))
}

/// Hex SHA-256 of the exact file contents. Used as the dedup key in the history file.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
