//! Translation from logging configuration to concrete sinks
//!
//! [`LoggingConfig`] describes what the process wants (level, directory, rotation,
//! file naming). [`LoggingConfig::handler_configs`] and
//! [`LoggingConfig::logger_configs`] turn that into a declarative handler
//! topology, and [`LoggingConfig::build`] opens the sinks it names.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use super::error::{LoggingError, Result};
use super::format::Format;
use super::level::Severity;
use super::rotating::RotationPolicy;
use super::sink::{ConsoleSink, RotatingFileSink, Sink};

/// Default log directory, relative to the working directory
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default size cap for each log file (10 MiB)
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of retained backups per log file
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// Name of the root logger
pub const ROOT_LOGGER: &str = "";

/// Name of the application logger
pub const APP_LOGGER: &str = "app";

pub const CONSOLE_HANDLER: &str = "console";
pub const FILE_HANDLER: &str = "file";
pub const ERROR_FILE_HANDLER: &str = "error_file";

/// How log file names are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileNaming {
    /// `app.log` / `error.log`, for single-process deployments
    Shared,
    /// `app_<pid>.log` / `error_<pid>.log`, one pair per worker process
    ProcessScoped,
}

impl FileNaming {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileNaming::Shared => "shared",
            FileNaming::ProcessScoped => "process-scoped",
        }
    }
}

impl fmt::Display for FileNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text encoding of log files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
}

impl TextEncoding {
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            _ => Err(LoggingError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// What kind of destination a handler writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    RotatingFile {
        path: PathBuf,
        policy: RotationPolicy,
        encoding: TextEncoding,
    },
}

/// Declarative description of one handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    pub name: String,
    pub kind: SinkKind,
    pub level: Severity,
    pub format: Format,
}

/// Declarative description of one logger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    pub name: String,
    /// Names of the handlers attached to this logger
    pub handlers: Vec<String>,
    pub level: Severity,
    pub propagate: bool,
}

/// Everything needed to set up logging for one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Severity,
    pub log_dir: PathBuf,
    pub max_bytes: u64,
    pub backup_count: usize,
    pub encoding: TextEncoding,
    pub naming: FileNaming,
    /// Defaults to the current process id when `None`
    pub process_id: Option<u32>,
    /// Loggers that receive the handler set
    pub loggers: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::process_scoped(Severity::default())
    }
}

impl LoggingConfig {
    /// Shared `app.log` / `error.log` attached to a single logger (root if `None`)
    pub fn simple(name: Option<&str>, level: Severity) -> Self {
        Self {
            level,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
            encoding: TextEncoding::Utf8,
            naming: FileNaming::Shared,
            process_id: None,
            loggers: vec![name.unwrap_or(ROOT_LOGGER).to_string()],
        }
    }

    /// Per-process files attached to both the root and the application logger
    pub fn process_scoped(level: Severity) -> Self {
        Self {
            naming: FileNaming::ProcessScoped,
            loggers: vec![ROOT_LOGGER.to_string(), APP_LOGGER.to_string()],
            ..Self::simple(None, level)
        }
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    pub fn with_rotation(mut self, max_bytes: u64, backup_count: usize) -> Self {
        self.max_bytes = max_bytes;
        self.backup_count = backup_count;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_process_id(mut self, process_id: u32) -> Self {
        self.process_id = Some(process_id);
        self
    }

    pub fn resolved_process_id(&self) -> u32 {
        self.process_id.unwrap_or_else(std::process::id)
    }

    /// Path of the combined log file
    pub fn app_log_path(&self) -> PathBuf {
        self.log_dir.join(self.file_name("app"))
    }

    /// Path of the error-only log file
    pub fn error_log_path(&self) -> PathBuf {
        self.log_dir.join(self.file_name("error"))
    }

    fn file_name(&self, role: &str) -> String {
        match self.naming {
            FileNaming::Shared => format!("{}.log", role),
            FileNaming::ProcessScoped => format!("{}_{}.log", role, self.resolved_process_id()),
        }
    }

    fn rotation(&self) -> RotationPolicy {
        RotationPolicy::new(self.max_bytes, self.backup_count)
    }

    /// The three handlers every configured logger receives
    pub fn handler_configs(&self) -> Vec<HandlerConfig> {
        vec![
            HandlerConfig {
                name: CONSOLE_HANDLER.to_string(),
                kind: SinkKind::Console,
                level: self.level,
                format: Format::Console,
            },
            HandlerConfig {
                name: FILE_HANDLER.to_string(),
                kind: SinkKind::RotatingFile {
                    path: self.app_log_path(),
                    policy: self.rotation(),
                    encoding: self.encoding,
                },
                level: self.level,
                format: Format::Detailed,
            },
            HandlerConfig {
                name: ERROR_FILE_HANDLER.to_string(),
                kind: SinkKind::RotatingFile {
                    path: self.error_log_path(),
                    policy: self.rotation(),
                    encoding: self.encoding,
                },
                level: Severity::Error,
                format: Format::Detailed,
            },
        ]
    }

    /// Logger name to handler set mapping; propagation is always off
    pub fn logger_configs(&self) -> Vec<LoggerConfig> {
        let handlers: Vec<String> = self
            .handler_configs()
            .into_iter()
            .map(|h| h.name)
            .collect();

        self.loggers
            .iter()
            .map(|name| LoggerConfig {
                name: name.clone(),
                handlers: handlers.clone(),
                level: self.level,
                propagate: false,
            })
            .collect()
    }

    /// Create the log directory and open every sink, console on stdout
    pub fn build(&self) -> Result<Topology> {
        self.build_with_console(Box::new(io::stdout()))
    }

    /// Like [`build`](Self::build) but with the console sink writing to `console`
    ///
    /// Nothing is attached anywhere until the returned topology is configured
    /// into a registry, so a failure here leaves no partial handler set behind.
    pub fn build_with_console(&self, console: Box<dyn Write + Send>) -> Result<Topology> {
        ensure_log_dir(&self.log_dir)?;

        let mut console = Some(console);
        let mut topology = Topology::new(self.naming);
        for handler in self.handler_configs() {
            let sink: Arc<dyn Sink> = match handler.kind {
                SinkKind::Console => match console.take() {
                    Some(writer) => Arc::new(ConsoleSink::with_writer(handler.level, writer)),
                    None => Arc::new(ConsoleSink::stdout(handler.level)),
                },
                SinkKind::RotatingFile {
                    path,
                    policy,
                    encoding,
                } => Arc::new(RotatingFileSink::open(
                    handler.name.clone(),
                    path,
                    handler.level,
                    policy,
                    encoding,
                )?),
            };
            topology = topology.with_sink(handler.name, sink);
        }

        for logger in self.logger_configs() {
            topology = topology.with_logger(logger);
        }

        Ok(topology)
    }
}

/// Create the log directory if needed
///
/// Succeeds when another process creates it concurrently. Fails with
/// `DirectoryUnavailable` if the path cannot be created, is not a directory,
/// or this process cannot create files in it.
pub fn ensure_log_dir(path: &Path) -> Result<()> {
    let unavailable = |source: io::Error| LoggingError::DirectoryUnavailable {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(path).map_err(unavailable)?;

    let metadata = fs::metadata(path).map_err(unavailable)?;
    if !metadata.is_dir() {
        return Err(unavailable(io::Error::new(
            io::ErrorKind::Other,
            "path exists but is not a directory",
        )));
    }

    // Actual write access, not mode bits
    tempfile::Builder::new()
        .prefix(".write-check")
        .tempfile_in(path)
        .map_err(unavailable)?;

    Ok(())
}

/// Opened sinks plus the logger mapping that references them
///
/// Loggers share sink instances, so a file is opened once however many loggers
/// write to it.
pub struct Topology {
    naming: FileNaming,
    sinks: HashMap<String, Arc<dyn Sink>>,
    loggers: Vec<LoggerConfig>,
}

impl Topology {
    pub fn new(naming: FileNaming) -> Self {
        Self {
            naming,
            sinks: HashMap::new(),
            loggers: Vec::new(),
        }
    }

    pub fn with_sink(mut self, name: impl Into<String>, sink: Arc<dyn Sink>) -> Self {
        self.sinks.insert(name.into(), sink);
        self
    }

    pub fn with_logger(mut self, logger: LoggerConfig) -> Self {
        self.loggers.push(logger);
        self
    }

    pub fn naming(&self) -> FileNaming {
        self.naming
    }

    pub fn loggers(&self) -> &[LoggerConfig] {
        &self.loggers
    }

    pub fn sink(&self, name: &str) -> Option<&Arc<dyn Sink>> {
        self.sinks.get(name)
    }

    /// Sinks for a logger, in the order its config names them; unknown names are skipped
    pub fn handlers_for(&self, logger: &LoggerConfig) -> Vec<Arc<dyn Sink>> {
        logger
            .handlers
            .iter()
            .filter_map(|name| self.sinks.get(name).cloned())
            .collect()
    }
}
