//! User-facing output of a monitoring pass.
//!
//! Every line goes to interactive output. [`ConsoleLogSink`] additionally
//! appends it, timestamped, to a durable log file if that file could be
//! opened for appending when the sink was built. Without write permission
//! the sink silently keeps to interactive output.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use crossterm::style::Stylize;
use tracing::debug;

use crate::config::SinkConfig;
use crate::evaluator::{AlertEvent, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Warning,
    /// A metric could not be collected.
    Unavailable,
}

impl Level {
    fn tag(&self) -> &'static str {
        match self {
            Level::Ok => "OK",
            Level::Warning => "WARNING",
            Level::Unavailable => "UNAVAILABLE",
        }
    }
}

impl From<Severity> for Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Ok => Level::Ok,
            Severity::Warning => Level::Warning,
        }
    }
}

pub trait AlertSink: Send + Sync {
    /// Writes one line. Must not fail.
    fn write(&self, level: Level, message: &str);

    fn emit(&self, event: &AlertEvent) {
        self.write(event.severity.into(), &event.message);
    }
}

/// Writes to a terminal writer and, best effort, to an append-only log.
pub struct ConsoleLogSink {
    out: Mutex<Box<dyn Write + Send>>,
    log: Option<Mutex<File>>,
    log_path: PathBuf,
    color: bool,
}

impl ConsoleLogSink {
    pub fn new(config: &SinkConfig) -> Self {
        Self::with_writer(config, Box::new(io::stdout()))
    }

    pub fn with_writer(config: &SinkConfig, out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            log: open_for_append(&config.log_path).map(Mutex::new),
            log_path: config.log_path.clone(),
            color: config.color,
        }
    }

    /// Whether lines are also written to the durable log.
    pub fn has_durable_log(&self) -> bool {
        self.log.is_some()
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn console_line(&self, level: Level, message: &str) -> String {
        let tag = format!("[{}]", level.tag());
        if !self.color {
            return format!("{tag} {message}");
        }

        let tag = match level {
            Level::Ok => tag.green(),
            Level::Warning => tag.yellow().bold(),
            Level::Unavailable => tag.dark_grey(),
        };
        format!("{tag} {message}")
    }
}

/// Checks once whether the durable log can be appended to.
fn open_for_append(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            debug!("{}: not writable ({e}), logging to console only", path.display());
            None
        }
    }
}

/// `<timestamp> - <LEVEL>: <message>`
pub fn log_line(level: Level, message: &str) -> String {
    format!(
        "{} - {}: {message}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        level.tag()
    )
}

impl AlertSink for ConsoleLogSink {
    fn write(&self, level: Level, message: &str) {
        let line = self.console_line(level, message);
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        }

        let Some(log) = &self.log else {
            return;
        };

        if let Ok(mut file) = log.lock()
            && let Err(e) = writeln!(file, "{}", log_line(level, message))
        {
            debug!("{}: append failed: {e}", self.log_path.display());
        }
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, message)| message).collect()
    }
}

impl AlertSink for MemorySink {
    fn write(&self, level: Level, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}
