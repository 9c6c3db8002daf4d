//! Record destinations
//!
//! Every sink filters on its own minimum severity, renders records with its own
//! [`Format`] and serializes writes behind its own lock. Sink failures are
//! contained: the record is dropped for that sink only and counted.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::error::{LoggingError, Result};
use super::format::Format;
use super::level::Severity;
use super::record::LogRecord;
use super::rotating::{RotatingFile, RotationPolicy};
use super::topology::TextEncoding;

/// A destination for log records
pub trait Sink: Send + Sync {
    /// Handler name, e.g. "console" or "error_file"
    fn name(&self) -> &str;

    /// Minimum severity this sink accepts
    fn level(&self) -> Severity;

    /// Write a record that already passed the level check
    fn write(&self, record: &LogRecord) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Number of records dropped because of write failures
    fn dropped(&self) -> u64 {
        0
    }

    fn accepts(&self, severity: Severity) -> bool {
        severity >= self.level()
    }
}

/// Hand a record to a sink, containing any failure
///
/// Failures are reported on stderr; routing them through `tracing` would re-enter
/// the very sinks that are failing.
pub fn dispatch(sink: &dyn Sink, record: &LogRecord) {
    if !sink.accepts(record.severity) {
        return;
    }
    if let Err(e) = sink.write(record) {
        eprintln!("--- Logging error ---\n{}", e);
    }
}

/// Sink writing to stdout (or any injected writer)
pub struct ConsoleSink {
    level: Severity,
    format: Format,
    writer: Mutex<Box<dyn Write + Send>>,
    dropped: AtomicU64,
}

impl ConsoleSink {
    /// Console sink on the process's stdout
    pub fn stdout(level: Severity) -> Self {
        Self::with_writer(level, Box::new(io::stdout()))
    }

    pub fn with_writer(level: Severity, writer: Box<dyn Write + Send>) -> Self {
        Self {
            level,
            format: Format::Console,
            writer: Mutex::new(writer),
            dropped: AtomicU64::new(0),
        }
    }

    fn fail(&self, source: io::Error) -> LoggingError {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        LoggingError::SinkWriteFailure {
            sink: self.name().to_string(),
            source,
        }
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn level(&self) -> Severity {
        self.level
    }

    fn write(&self, record: &LogRecord) -> Result<()> {
        let line = self.format.render(record);
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| self.fail(io::Error::new(io::ErrorKind::Other, "console lock poisoned")))?;
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| self.fail(e))
    }

    fn flush(&self) -> Result<()> {
        if let Ok(mut writer) = self.writer.lock() {
            writer.flush().map_err(|e| self.fail(e))?;
        }
        Ok(())
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Sink appending to a size-rotated file
pub struct RotatingFileSink {
    name: String,
    level: Severity,
    format: Format,
    encoding: TextEncoding,
    path: PathBuf,
    file: Mutex<RotatingFile>,
    dropped: AtomicU64,
}

impl RotatingFileSink {
    /// Open the file at startup; failures here are fatal to initialization
    pub fn open(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        level: Severity,
        policy: RotationPolicy,
        encoding: TextEncoding,
    ) -> Result<Self> {
        let path = path.into();
        let file = RotatingFile::open(&path, policy).map_err(|source| {
            LoggingError::SinkUnavailable {
                path: path.clone(),
                source,
            }
        })?;

        Ok(Self {
            name: name.into(),
            level,
            format: Format::Detailed,
            encoding,
            path,
            file: Mutex::new(file),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fail(&self, source: io::Error) -> LoggingError {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        LoggingError::SinkWriteFailure {
            sink: self.name.clone(),
            source,
        }
    }
}

impl Sink for RotatingFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> Severity {
        self.level
    }

    fn write(&self, record: &LogRecord) -> Result<()> {
        let line = self.format.render(record);
        let bytes = self.encoding.encode(&line);
        let mut file = self
            .file
            .lock()
            .map_err(|_| self.fail(io::Error::new(io::ErrorKind::Other, "file lock poisoned")))?;
        file.write_record(&bytes).map_err(|e| self.fail(e))
    }

    fn flush(&self) -> Result<()> {
        if let Ok(mut file) = self.file.lock() {
            file.flush().map_err(|e| self.fail(e))?;
        }
        Ok(())
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
