//! Logging initialization entry points
//!
//! Two naming modes are available and a process must pick one:
//!
//! - [`init_simple`]: shared `app.log` / `error.log`, for single-process runs.
//! - [`init_process_scoped`]: `app_<pid>.log` / `error_<pid>.log`, for worker
//!   pools where several processes log into the same directory.
//!
//! Calling either again in the same mode replaces the handlers installed by the
//! previous call. Switching modes requires [`LoggerRegistry::reset`] first.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Settings;

use super::bridge::install_tracing_bridge;
use super::error;
use super::level::Severity;
use super::registry::{registry, LogFileInfo, Logger, LoggerRegistry};
use super::topology::{LoggingConfig, DEFAULT_LOG_DIR};

/// Attach shared-file handlers to `name` (the root logger if `None`) in the
/// process-wide registry and return that logger
pub fn init_simple(name: Option<&str>, level: Severity) -> error::Result<Logger> {
    init_simple_in(registry(), DEFAULT_LOG_DIR, name, level)
}

/// [`init_simple`] against an explicit registry and directory
pub fn init_simple_in(
    registry: &LoggerRegistry,
    log_dir: impl AsRef<Path>,
    name: Option<&str>,
    level: Severity,
) -> error::Result<Logger> {
    let config = LoggingConfig::simple(name, level).with_log_dir(log_dir.as_ref());
    let info = registry.initialize(&config)?;
    Ok(registry.get_logger(&info.loggers[0]))
}

/// Attach process-scoped handlers to the root and application loggers in the
/// process-wide registry
pub fn init_process_scoped(config: &LoggingConfig) -> error::Result<LogFileInfo> {
    registry().initialize(config)
}

/// Configure process-scoped logging from application settings
///
/// Installs the `tracing` bridge on first use. Failures are fatal: the caller
/// should abort startup.
pub fn setup_logging(settings: &Settings) -> Result<LogFileInfo> {
    let config = settings
        .logging_config(None)
        .context("Invalid logging settings")?;
    let info = init_process_scoped(&config).context("Failed to configure logging")?;

    install_tracing_bridge(registry());

    info!(
        "Logging configured successfully for process {}",
        info.process_id
    );
    debug!("Debug logging enabled for process {}", info.process_id);
    info!("Application logs: {}", absolute(&info.app_log).display());
    info!("Error logs: {}", absolute(&info.error_log).display());

    Ok(info)
}

fn absolute(path: &Path) -> std::path::PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
