use bookreader2readwise::session;
use bookreader2readwise::utils::{SessionConfig, expand_tilde, parse_path_arg};
use clap::Parser;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Convert BookReader highlight exports into CSV files for Readwise.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File that stores the remembered directory and already-exported books.
    /// Defaults to ~/.bookreader2readwise if not set in config.
    #[arg(long, value_name = "PATH", value_parser = parse_path_arg)]
    history_file: Option<PathBuf>,

    /// Location to save the CSV.
    /// Defaults to ~/Downloads if not set in config.
    #[arg(long, value_name = "DIR", value_parser = parse_path_arg)]
    destination_dir: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/bookreader2readwise/config.toml
    #[arg(long, value_name = "PATH", value_parser = parse_path_arg)]
    config: Option<PathBuf>,

    /// Log scanning and export details to stderr.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    history_file: Option<PathBuf>,
    destination_dir: Option<PathBuf>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("bookreader2readwise/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn home_path(rest: &str) -> Result<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(rest))
        .ok_or_else(|| eyre!("Could not determine home directory.\nPass the path explicitly."))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bookreader2readwise={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve history file (CLI > Config > ~/.bookreader2readwise)
    let history_file = match cli
        .history_file
        .or_else(|| file_cfg.history_file.as_deref().map(expand_tilde))
    {
        Some(p) => p,
        None => home_path(".bookreader2readwise")?,
    };

    // 3. Resolve destination (CLI > Config > ~/Downloads)
    let destination_dir = match cli
        .destination_dir
        .or_else(|| file_cfg.destination_dir.as_deref().map(expand_tilde))
    {
        Some(p) => p,
        None => home_path("Downloads")?,
    };

    let config = SessionConfig {
        history_file,
        destination_dir,
    };
    tracing::debug!(?config, "resolved settings");

    session::execute(config)
}
