#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Stage logging shared across the pipeline: every record goes to the console
//! above one threshold and to an error file above another.

use std::{
    fmt,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational events.
    Info,
    /// Warning indicator.
    Warn,
    /// Error indicator.
    Error,
}

impl LogLevel {
    /// Label printed in the level column.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Single log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Local wall-clock time of emission.
    pub timestamp: DateTime<Local>,
    /// Logger name (one per stage).
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            module: module.into(),
            level,
            message: message.into(),
        }
    }
}

/// Renders `<asctime> - <name> - <LEVEL> - <message>`.
impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S,%3f"),
            self.module,
            self.level,
            self.message
        )
    }
}

/// Builder for [`StageLogger`].
#[derive(Debug)]
pub struct StageLoggerBuilder {
    name: String,
    console_level: Option<LogLevel>,
    file: Option<(PathBuf, LogLevel)>,
}

impl StageLoggerBuilder {
    /// Creates a builder with a DEBUG console sink and no file sink.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            console_level: Some(LogLevel::Debug),
            file: None,
        }
    }

    /// Sets the console threshold.
    #[must_use]
    pub const fn console_level(mut self, level: LogLevel) -> Self {
        self.console_level = Some(level);
        self
    }

    /// Disables console output (used by tests).
    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.console_level = None;
        self
    }

    /// Adds a file sink receiving records at or above `level`.
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>, level: LogLevel) -> Self {
        self.file = Some((path.into(), level));
        self
    }

    /// Opens the sinks. The log file is created immediately, even if nothing is written.
    pub fn build(self) -> Result<StageLogger> {
        let file = match self.file {
            Some((path, threshold)) => Some(FileSink::open(path, threshold)?),
            None => None,
        };
        Ok(StageLogger {
            inner: Arc::new(LoggerInner {
                name: self.name,
                console_level: self.console_level,
                file,
            }),
        })
    }
}

#[derive(Debug)]
struct FileSink {
    path: PathBuf,
    threshold: LogLevel,
    writer: Mutex<File>,
}

impl FileSink {
    fn open(path: PathBuf, threshold: LogLevel) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log dir {}", parent.display()))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        Ok(Self {
            path,
            threshold,
            writer: Mutex::new(file),
        })
    }

    fn write(&self, record: &LogRecord) -> io::Result<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{record}")?;
        writer.flush()
    }
}

#[derive(Debug)]
struct LoggerInner {
    name: String,
    console_level: Option<LogLevel>,
    file: Option<FileSink>,
}

/// Named logger handle shared by the components of one pipeline stage.
#[derive(Debug, Clone)]
pub struct StageLogger {
    inner: Arc<LoggerInner>,
}

impl StageLogger {
    /// Returns a builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> StageLoggerBuilder {
        StageLoggerBuilder::new(name)
    }

    /// Console-only logger. Opens no file, so it cannot fail to build.
    #[must_use]
    pub fn console(name: impl Into<String>, level: LogLevel) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                name: name.into(),
                console_level: Some(level),
                file: None,
            }),
        }
    }

    /// Logger name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Path of the file sink, if any.
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.inner.file.as_ref().map(|sink| sink.path.as_path())
    }

    /// Dispatches a record to every sink whose threshold admits it.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        let record = LogRecord::new(&self.inner.name, level, message);
        if self.inner.console_level.is_some_and(|min| level >= min) {
            writeln!(io::stderr().lock(), "{record}").context("writing console log")?;
        }
        if let Some(sink) = self.inner.file.as_ref().filter(|s| level >= s.threshold) {
            sink.write(&record)
                .with_context(|| format!("writing log file {}", sink.path.display()))?;
        }
        Ok(())
    }

    /// Logs at DEBUG.
    pub fn debug(&self, message: impl Into<String>) {
        self.emit(LogLevel::Debug, message.into());
    }

    /// Logs at INFO.
    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message.into());
    }

    /// Logs at WARNING.
    pub fn warn(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warn, message.into());
    }

    /// Logs at ERROR.
    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message.into());
    }

    fn emit(&self, level: LogLevel, message: String) {
        if let Err(err) = self.log(level, message) {
            eprintln!("stage logger {} failed: {err:?}", self.inner.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_sink_keeps_errors_only() {
        let dir = tempdir().unwrap();
        let logger = StageLogger::builder("data_preprocessing")
            .quiet()
            .file(dir.path().join("errors.log"), LogLevel::Error)
            .build()
            .unwrap();
        logger.debug("Starting data preprocessing...");
        logger.error("Error in preprocessing comment: boom");
        let content = fs::read_to_string(logger.file_path().unwrap()).unwrap();
        assert!(!content.contains("Starting"));
        assert!(content.contains(" - data_preprocessing - ERROR - Error in preprocessing comment: boom"));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn file_is_created_on_build() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/model_registration_errors.log");
        let _logger = StageLogger::builder("model_registration")
            .quiet()
            .file(&path, LogLevel::Error)
            .build()
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn record_renders_asctime_format() {
        let record = LogRecord::new("tracking_smoke", LogLevel::Warn, "hello");
        let line = record.to_string();
        let parts: Vec<&str> = line.split(" - ").collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].len(), "2026-01-01 00:00:00,000".len());
        assert_eq!(parts[1], "tracking_smoke");
        assert_eq!(parts[2], "WARNING");
        assert_eq!(parts[3], "hello");
    }

    #[test]
    fn console_logger_has_no_file() {
        let logger = StageLogger::console("tracking_smoke", LogLevel::Error);
        assert_eq!(logger.name(), "tracking_smoke");
        assert!(logger.file_path().is_none());
        assert!(logger.log(LogLevel::Debug, "below threshold").is_ok());
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }
}
