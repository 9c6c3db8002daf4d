//! Logging system for docman
//!
//! Process-scoped logging with a console sink, a rotating combined log file and
//! a rotating error-only log file, attached to named loggers in an explicit
//! registry. `tracing` events are bridged into the same registry.

mod bridge;
mod buffer;
mod error;
mod format;
mod init;
mod level;
mod record;
mod registry;
mod retention;
mod rotating;
mod sink;
mod topology;

pub use bridge::{install_tracing_bridge, logger_name, RegistryLayer};
pub use buffer::MemorySink;
pub use error::{LoggingError, Result};
pub use format::{Format, TIMESTAMP_FORMAT};
pub use init::{init_process_scoped, init_simple, init_simple_in, setup_logging};
pub use level::Severity;
pub use record::{Fields, LogRecord};
pub use registry::{get_logger, registry, LogFileInfo, Logger, LoggerRegistry};
pub use retention::{cleanup_stale_process_logs, process_id_of, DEFAULT_RETENTION_DAYS};
pub use rotating::{backup_path, RotatingFile, RotationPolicy};
pub use sink::{ConsoleSink, RotatingFileSink, Sink};
pub use topology::{
    ensure_log_dir, FileNaming, HandlerConfig, LoggerConfig, LoggingConfig, SinkKind,
    TextEncoding, Topology, APP_LOGGER, DEFAULT_BACKUP_COUNT, DEFAULT_LOG_DIR, DEFAULT_MAX_BYTES,
    ROOT_LOGGER,
};
