//! # bookreader2readwise
//!
//! An interactive CLI that turns BookReader highlight exports into CSV files that
//! [Readwise](https://readwise.io) can import.
//!
//! ## What it does
//!
//! BookReader writes one JSON file per book, holding the title, the authors and a list of
//! bookmarks (highlighted passages with optional notes). This tool lists those files,
//! lets you pick one, and writes `{author} {title}.csv` with the columns
//! `Title,Author,Highlight,Note`, ordered by position in the book.
//!
//! ## History
//!
//! Each exported file is remembered by the SHA-256 of its contents in
//! `~/.bookreader2readwise`, together with the BookReader directory you chose on first
//! run. Already-exported books are hidden from the main list; press `p` to peek at them.
//! Editing a book in BookReader changes its hash, so it is offered again.
//!
//! ## Usage
//!
//! ```sh
//! bookreader2readwise
//! bookreader2readwise --destination-dir ~/readwise --history-file ~/.config/b2r-history
//! ```
//!
//! Defaults can be persisted in `~/.config/bookreader2readwise/config.toml`.
pub mod exporter;
pub mod history;
pub mod importer;
pub mod session;
pub mod utils;
