use crate::exporter::{output_filename, to_table, write_csv};
use crate::history::History;
use crate::importer::{ScanResult, ScannedBook, scan, sort_by_surname};
use crate::utils::{SessionConfig, expand_tilde};
use eyre::{Context, Result, eyre};
use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

const DIRECTORY_PROMPT: &str = "Select your bookreader directory: ";
const SELECTION_PROMPT: &str = "Select book to load (p to show processed, q to quit): ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    ShowingUnprocessed,
    ShowingProcessed,
    Exited,
}

/// One line of operator input, interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ShowProcessed,
    Select(usize),
    /// Anything else. The list is simply shown again.
    Invalid,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        if line.eq_ignore_ascii_case("q") {
            Command::Quit
        } else if line.eq_ignore_ascii_case("p") {
            Command::ShowProcessed
        } else {
            match line.trim().parse::<usize>() {
                Ok(idx) => Command::Select(idx),
                Err(_) => Command::Invalid,
            }
        }
    }
}

/// Outcome of acting on a selected book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(PathBuf),
    NoHighlights,
}

/// Entry point used by the binary: wires the session to the terminal.
pub fn execute(config: SessionConfig) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run(&config, stdin.lock(), stdout.lock())
}

/// Load history, make sure an input directory is known, scan it, and run the loop.
pub fn run<R: BufRead, W: Write>(config: &SessionConfig, mut input: R, mut output: W) -> Result<()> {
    let mut history = History::load(&config.history_file)?;

    let directory = match history.bookreader_directory.clone() {
        Some(dir) => dir,
        None => {
            let dir = prompt_for_directory(&mut input, &mut output)?;
            history.remember_directory(&dir);
            history.save(&config.history_file)?;
            dir
        }
    };

    let books = scan(&directory, &history)?;
    let mut session = Session::new(config, history, books, input, output);
    session.run()
}

fn prompt_for_directory<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<PathBuf> {
    loop {
        write!(output, "{}", DIRECTORY_PROMPT)?;
        output.flush()?;
        let line = read_line(input)?
            .ok_or_else(|| eyre!("Input closed before a bookreader directory was given"))?;
        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(expand_tilde(Path::new(answer)));
        }
    }
}

/// Read one line without its terminator. `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input
        .read_line(&mut line)
        .wrap_err("Failed to read from stdin")?
        == 0
    {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

pub struct Session<'a, R, W> {
    config: &'a SessionConfig,
    history: History,
    books: ScanResult,
    input: R,
    output: W,
    state: State,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(
        config: &'a SessionConfig,
        history: History,
        books: ScanResult,
        input: R,
        output: W,
    ) -> Self {
        Self {
            config,
            history,
            books,
            input,
            output,
            state: State::ShowingUnprocessed,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn books(&self) -> &ScanResult {
        &self.books
    }

    pub fn run(&mut self) -> Result<()> {
        while self.state != State::Exited {
            self.step()?;
        }
        Ok(())
    }

    /// One display/read/act cycle.
    ///
    /// The processed view lasts a single cycle: the state is reset to the unprocessed view
    /// before acting on input, so only a fresh `p` shows the processed list again.
    pub fn step(&mut self) -> Result<()> {
        let view = self.state;
        if view == State::Exited {
            return Ok(());
        }
        self.state = State::ShowingUnprocessed;

        self.display(view)?;
        write!(self.output, "{}", SELECTION_PROMPT)?;
        self.output.flush()?;

        let Some(line) = read_line(&mut self.input)? else {
            self.state = State::Exited;
            return Ok(());
        };

        match Command::parse(&line) {
            Command::Quit => self.state = State::Exited,
            Command::ShowProcessed => self.state = State::ShowingProcessed,
            Command::Select(idx) => {
                if self.list(view).get(idx).is_some() {
                    self.select(view, idx)?;
                } else {
                    tracing::debug!(idx, "selection out of range");
                }
            }
            Command::Invalid => tracing::debug!(input = %line, "unrecognised selection"),
        }
        Ok(())
    }

    fn list(&self, view: State) -> &[ScannedBook] {
        books_in(&self.books, view)
    }

    fn display(&mut self, view: State) -> io::Result<()> {
        let Self { books, output, .. } = self;
        writeln!(output, "Available books:")?;
        for (idx, book) in books_in(books, view).iter().enumerate() {
            writeln!(
                output,
                "{}. \"{}\", {}",
                idx, book.document.title, book.document.authors
            )?;
        }
        Ok(())
    }

    fn select(&mut self, view: State, idx: usize) -> Result<ExportOutcome> {
        let book = self.list(view)[idx].clone();
        let outcome = export_book(&book, &self.config.destination_dir, &mut self.output)?;
        if let ExportOutcome::Written(_) = &outcome {
            // CSV is on disk before the hash is recorded: a crash in between means the
            // book is offered again, never silently skipped.
            self.history
                .record_export(&book.hash, &book.document.authors, &book.document.title);
            self.history.save(&self.config.history_file)?;
            self.mark_processed(&book.hash);
        }
        Ok(outcome)
    }

    /// Move every unprocessed entry with `hash` into the processed list.
    fn mark_processed(&mut self, hash: &str) {
        let (moved, kept): (Vec<_>, Vec<_>) = self
            .books
            .unprocessed
            .drain(..)
            .partition(|b| b.hash == hash);
        self.books.unprocessed = kept;
        if !moved.is_empty() {
            self.books.processed.extend(moved);
            sort_by_surname(&mut self.books.processed);
        }
    }
}

/// The list shown for `view`.
fn books_in(books: &ScanResult, view: State) -> &[ScannedBook] {
    match view {
        State::ShowingProcessed => &books.processed,
        _ => &books.unprocessed,
    }
}

/// Write one book's CSV into `destination_dir`, announcing the target on `output`.
pub fn export_book<W: Write>(
    book: &ScannedBook,
    destination_dir: &Path,
    output: &mut W,
) -> Result<ExportOutcome> {
    let document = &book.document;
    if document.highlights().is_none() {
        writeln!(output, "\"{}\" has no highlights\n\n", document.title)?;
        return Ok(ExportOutcome::NoHighlights);
    }

    let rows = to_table(document);
    let out_path = destination_dir.join(output_filename(&document.authors, &document.title));

    writeln!(output)?;
    writeln!(output, "Writing output to {}", out_path.display())?;
    writeln!(output)?;
    output.flush()?;

    fs::create_dir_all(destination_dir).wrap_err_with(|| {
        format!(
            "Failed to create destination directory: {}",
            destination_dir.display()
        )
    })?;
    let csv_file = File::create(&out_path)
        .wrap_err_with(|| format!("Failed to create: {}", out_path.display()))?;
    let mut writer = BufWriter::new(csv_file);
    write_csv(&mut writer, &rows)
        .wrap_err_with(|| format!("Failed to write CSV: {}", out_path.display()))?;
    writer.flush().wrap_err("Failed to flush CSV file")?;

    tracing::info!(
        file = %out_path.display(),
        rows = rows.len(),
        source = %book.path.display(),
        "exported"
    );
    Ok(ExportOutcome::Written(out_path))
}
