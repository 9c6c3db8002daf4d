//! Errors raised by the logging subsystem

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::topology::FileNaming;

/// Result alias for logging operations
pub type Result<T> = std::result::Result<T, LoggingError>;

#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log directory cannot be created or is not writable
    #[error("log directory {} is unavailable: {source}", path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file sink could not be opened at startup
    #[error("log file {} could not be opened: {source}", path.display())]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A write or rotation failed at runtime; the record was dropped
    #[error("sink '{sink}' failed to write record: {source}")]
    SinkWriteFailure {
        sink: String,
        #[source]
        source: io::Error,
    },

    #[error("unknown severity '{0}' (expected DEBUG, INFO, WARNING, ERROR or CRITICAL)")]
    InvalidSeverity(String),

    #[error("unsupported log encoding '{0}' (only utf-8 is supported)")]
    UnsupportedEncoding(String),

    /// Initialization requested a different file naming mode than the active one
    #[error("logging already initialized in {active} mode, refusing {requested} mode without reset")]
    ModeConflict {
        active: FileNaming,
        requested: FileNaming,
    },
}
