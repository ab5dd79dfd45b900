#![forbid(unsafe_code)]

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use crate::config::{self, LogConfig};

pub const LOG_ENV: &str = "DAYBOOK_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Plain CLI commands: log to stderr.
    Stderr,
    /// The TUI owns the terminal: log to `log.file` or nowhere.
    FileOnly,
}

/// Picks the filter level: `-q` wins, then `-v`, then the configured level.
#[must_use]
pub fn effective_level<'a>(cfg: &'a LogConfig, quiet: bool, verbose: u8) -> &'a str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => cfg.level.trim(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn init(cfg: &LogConfig, target: LogTarget, quiet: bool, verbose: u8) -> anyhow::Result<()> {
    let level = effective_level(cfg, quiet, verbose);
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let file = cfg.file.trim();
    if !file.is_empty() {
        let path = config::expand_path(file)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(out))
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"));
    }

    match target {
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}")),
        // Nothing may write to the terminal while it is in raw mode.
        LogTarget::FileOnly => Ok(()),
    }
}
