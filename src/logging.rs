//! File-backed `tracing` subscriber. The TUI owns the terminal, so logs go to
//! a file unless stderr is not a terminal.

use crate::util::non_blank;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;

pub const DEFAULT_LOG_PATH: &str = "/tmp/dualstream.log";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub target: LogTarget,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), std::io::stderr().is_terminal())
    }

    pub fn from_lookup<F>(lookup: F, stderr_is_terminal: bool) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = non_blank(lookup("DUALSTREAM_LOG_LEVEL"))
            .and_then(|value| parse_level(&value))
            .unwrap_or(Level::INFO);
        let target = match non_blank(lookup("DUALSTREAM_LOG_PATH")) {
            Some(path) => LogTarget::File(PathBuf::from(path.trim())),
            None if stderr_is_terminal => LogTarget::File(PathBuf::from(DEFAULT_LOG_PATH)),
            None => LogTarget::Stderr,
        };
        Self { level, target }
    }
}

fn parse_level(value: &str) -> Option<Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(settings: &LogSettings) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(settings.level)
        .with_ansi(false)
        .with_target(true);

    let installed = match &settings.target {
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).try_init()
        }
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(target: "dualstream", level = %settings.level, "logging initialised");
    }
    Ok(())
}
