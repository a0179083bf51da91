//! Shared fixtures for driving the binary against a throwaway home directory
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub const FOO_BOOK: &str = r#"{"title":"Foo","authors":"Jane Doe","bookmarks":[{"text":"hi","name":"","start":5,"end":6,"color":"yellow"},{"text":"lo","name":"n","start":1,"end":2,"color":"blue"}]}"#;

/// A fake home with a BookReader export directory, a destination and a history file.
pub struct Workspace {
    home: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let home = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir(home.path().join("BookReader")).expect("Failed to create books dir");
        Self { home }
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn books_dir(&self) -> PathBuf {
        self.home().join("BookReader")
    }

    pub fn destination(&self) -> PathBuf {
        self.home().join("out")
    }

    pub fn history_file(&self) -> PathBuf {
        self.home().join("history.json")
    }

    pub fn add_book(&self, name: &str, body: &str) -> &Self {
        fs::write(self.books_dir().join(name), body).expect("Failed to write book");
        self
    }

    /// Write a history that already knows the books directory.
    pub fn with_history(&self, hashes: &[(&str, &str, &str)]) -> &Self {
        let processed: serde_json::Map<String, serde_json::Value> = hashes
            .iter()
            .map(|(hash, author, title)| {
                (
                    hash.to_string(),
                    serde_json::json!({ "author": author, "title": title }),
                )
            })
            .collect();
        let history = serde_json::json!({
            "bookreader_directory": self.books_dir(),
            "processed_hashes": processed,
        });
        fs::write(
            self.history_file(),
            serde_json::to_string_pretty(&history).expect("Failed to encode history"),
        )
        .expect("Failed to write history");
        self
    }

    pub fn read_history(&self) -> serde_json::Value {
        let raw = fs::read_to_string(self.history_file()).expect("Failed to read history");
        serde_json::from_str(&raw).expect("History is not JSON")
    }

    /// The binary, pointed at this workspace, with `stdin` as operator input.
    pub fn command(&self, stdin: &str) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bookreader2readwise"));
        cmd.env("HOME", self.home())
            .env("XDG_CONFIG_HOME", self.home().join(".config"))
            .env_remove("RUST_LOG")
            .arg("--history-file")
            .arg(self.history_file())
            .arg("--destination-dir")
            .arg(self.destination())
            .write_stdin(stdin.to_string());
        cmd
    }
}
