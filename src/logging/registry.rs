//! Named logger registry
//!
//! The registry maps logger names to their handlers, level and propagation flag.
//! Names are dotted paths; `""` is the root. A logger without its own level
//! inherits the level of its nearest configured ancestor, and a record keeps
//! climbing towards the root until it reaches a logger with propagation off.
//!
//! There is one process-wide registry behind [`registry()`]. Tests and embedders
//! can create private ones with [`LoggerRegistry::new`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, RwLock};

use super::error::{LoggingError, Result};
use super::level::Severity;
use super::record::{Fields, LogRecord};
use super::sink::{dispatch, Sink};
use super::topology::{FileNaming, LoggingConfig, Topology, ROOT_LOGGER};

/// Level used by the root logger before anything is configured
pub const UNCONFIGURED_ROOT_LEVEL: Severity = Severity::Warning;

struct LoggerEntry {
    handlers: Vec<Arc<dyn Sink>>,
    level: Option<Severity>,
    propagate: bool,
}

impl Default for LoggerEntry {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            level: None,
            propagate: true,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    loggers: HashMap<String, LoggerEntry>,
    /// Naming mode of the active configuration, if any
    mode: Option<FileNaming>,
}

/// Information about the files set up by an initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileInfo {
    pub naming: FileNaming,
    pub process_id: u32,
    pub log_dir: PathBuf,
    /// Combined log file
    pub app_log: PathBuf,
    /// Error-only log file
    pub error_log: PathBuf,
    /// Loggers that received the handler set
    pub loggers: Vec<String>,
}

/// Process-wide mapping from logger name to handlers
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct LoggerRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl LoggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the sinks for `config` and attach them
    ///
    /// Re-initializing with the same naming mode clears the previous handlers of
    /// every targeted logger before attaching the new ones, so repeated calls never
    /// duplicate output. A different naming mode is refused until [`reset`](Self::reset).
    pub fn initialize(&self, config: &LoggingConfig) -> Result<LogFileInfo> {
        self.check_mode(config.naming)?;
        let topology = config.build()?;
        self.configure(topology)?;
        Ok(file_info(config))
    }

    /// Like [`initialize`](Self::initialize) with the console sink writing to `console`
    pub fn initialize_with_console(
        &self,
        config: &LoggingConfig,
        console: Box<dyn std::io::Write + Send>,
    ) -> Result<LogFileInfo> {
        self.check_mode(config.naming)?;
        let topology = config.build_with_console(console)?;
        self.configure(topology)?;
        Ok(file_info(config))
    }

    /// Attach an opened topology
    ///
    /// For every logger the topology names: clear its handlers, attach the
    /// topology's sinks, set its level and propagation flag. The whole swap happens
    /// under one write lock.
    pub fn configure(&self, topology: Topology) -> Result<()> {
        let mut state = self.write_state();

        if let Some(active) = state.mode {
            if active != topology.naming() {
                return Err(LoggingError::ModeConflict {
                    active,
                    requested: topology.naming(),
                });
            }
        }

        let mut replaced: Vec<Arc<dyn Sink>> = Vec::new();
        for logger in topology.loggers() {
            let entry = state.loggers.entry(logger.name.clone()).or_default();
            replaced.append(&mut entry.handlers);
            entry.handlers = topology.handlers_for(logger);
            entry.level = Some(logger.level);
            entry.propagate = logger.propagate;
        }
        state.mode = Some(topology.naming());
        drop(state);

        flush_all(&replaced);
        Ok(())
    }

    /// Detach every handler and forget the active naming mode
    pub fn reset(&self) {
        let mut state = self.write_state();
        let loggers = std::mem::take(&mut state.loggers);
        state.mode = None;
        drop(state);

        for entry in loggers.into_values() {
            flush_all(&entry.handlers);
        }
    }

    /// Naming mode of the active configuration
    pub fn mode(&self) -> Option<FileNaming> {
        self.read_state().mode
    }

    /// Get a handle to the logger called `name`
    pub fn get_logger(&self, name: &str) -> Logger {
        Logger {
            name: name.to_string(),
            registry: self.clone(),
        }
    }

    /// Get the root logger
    pub fn root(&self) -> Logger {
        self.get_logger(ROOT_LOGGER)
    }

    /// Number of handlers attached directly to `name`
    pub fn handler_count(&self, name: &str) -> usize {
        self.read_state()
            .loggers
            .get(name)
            .map(|e| e.handlers.len())
            .unwrap_or(0)
    }

    /// Level in effect for `name`, inherited from the nearest configured ancestor
    pub fn effective_level(&self, name: &str) -> Severity {
        let state = self.read_state();
        lineage(name)
            .find_map(|n| state.loggers.get(n).and_then(|e| e.level))
            .unwrap_or(UNCONFIGURED_ROOT_LEVEL)
    }

    /// Route a record to the handlers of its logger and, while propagation
    /// allows, those of its ancestors
    pub fn emit(&self, record: &LogRecord) {
        let handlers = {
            let state = self.read_state();
            let mut handlers: Vec<Arc<dyn Sink>> = Vec::new();
            for name in lineage(&record.logger) {
                if let Some(entry) = state.loggers.get(name) {
                    handlers.extend(entry.handlers.iter().cloned());
                    if !entry.propagate {
                        break;
                    }
                }
            }
            handlers
        };

        for sink in &handlers {
            dispatch(sink.as_ref(), record);
        }
    }

    /// Flush every attached sink
    pub fn flush(&self) {
        let handlers: Vec<Arc<dyn Sink>> = self
            .read_state()
            .loggers
            .values()
            .flat_map(|e| e.handlers.iter().cloned())
            .collect();
        flush_all(&handlers);
    }

    fn check_mode(&self, requested: FileNaming) -> Result<()> {
        match self.read_state().mode {
            Some(active) if active != requested => {
                Err(LoggingError::ModeConflict { active, requested })
            }
            _ => Ok(()),
        }
    }

    // A panic while holding the lock cannot leave the table half-updated in a way
    // that matters for logging, so poisoning is ignored.
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn file_info(config: &LoggingConfig) -> LogFileInfo {
    LogFileInfo {
        naming: config.naming,
        process_id: config.resolved_process_id(),
        log_dir: config.log_dir.clone(),
        app_log: config.app_log_path(),
        error_log: config.error_log_path(),
        loggers: config.loggers.clone(),
    }
}

fn flush_all(handlers: &[Arc<dyn Sink>]) {
    for sink in handlers {
        if let Err(e) = sink.flush() {
            eprintln!("--- Logging error ---\n{}", e);
        }
    }
}

/// `name` followed by each of its ancestors, ending with the root
fn lineage(name: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(name);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current.is_empty() {
            None
        } else {
            Some(current.rfind('.').map(|i| &current[..i]).unwrap_or(ROOT_LOGGER))
        };
        Some(current)
    })
}

/// Handle to a named logger
///
/// Holds only the name and a registry handle; sinks are looked up on every
/// emission, so a logger obtained before re-initialization follows the new
/// configuration.
#[derive(Clone)]
pub struct Logger {
    name: String,
    registry: LoggerRegistry,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled_for(&self, severity: Severity) -> bool {
        severity >= self.registry.effective_level(&self.name)
    }

    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        self.log_with(severity, message, Fields::new());
    }

    /// Emit a record carrying structured fields
    pub fn log_with(&self, severity: Severity, message: impl Into<String>, fields: Fields) {
        if !self.is_enabled_for(severity) {
            return;
        }
        let record = LogRecord::new(severity, self.name.clone(), message).with_fields(fields);
        self.registry.emit(&record);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Severity::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(Severity::Critical, message);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish()
    }
}

static REGISTRY: OnceLock<LoggerRegistry> = OnceLock::new();

/// The process-wide registry
pub fn registry() -> &'static LoggerRegistry {
    REGISTRY.get_or_init(LoggerRegistry::new)
}

/// Get a logger from the process-wide registry; `None` gives the root logger
pub fn get_logger(name: Option<&str>) -> Logger {
    registry().get_logger(name.unwrap_or(ROOT_LOGGER))
}
