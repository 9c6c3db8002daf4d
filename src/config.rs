//! Configuration management for docman
//!
//! Settings come from an optional TOML file (`docman.toml`, or the path in
//! `DOCMAN_CONFIG`) and are then overridden by environment variables named after
//! the upper-cased field (`LOG_LEVEL`, `LOG_DIR`, `PORT`, ...).

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::{
    LoggingConfig, Severity, TextEncoding, DEFAULT_BACKUP_COUNT, DEFAULT_LOG_DIR,
    DEFAULT_MAX_BYTES, DEFAULT_RETENTION_DAYS,
};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "docman.toml";

/// Environment variable overriding the config file path
pub const CONFIG_PATH_ENV: &str = "DOCMAN_CONFIG";

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_project_name")]
    pub project_name: String,

    /// Prefix for versioned API routes
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Forces DEBUG logging regardless of `log_level`
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated list of allowed CORS origins
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,

    /// Minimum severity: DEBUG, INFO, WARNING, ERROR or CRITICAL
    #[serde(default)]
    pub log_level: Severity,

    /// Log directory; a leading `~` is expanded
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Size cap per log file in bytes (default: 10 MiB)
    #[serde(default = "default_log_max_bytes")]
    pub log_max_bytes: u64,

    #[serde(default = "default_log_backup_count")]
    pub log_backup_count: usize,

    #[serde(default = "default_log_encoding")]
    pub log_encoding: String,

    /// Age in days after which other processes' log files are removed
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,
}

fn default_project_name() -> String {
    "Document Management System".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_allowed_origins() -> String {
    "http://localhost:4200,http://127.0.0.1:4200".to_string()
}

fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.to_string()
}

fn default_log_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}

fn default_log_backup_count() -> usize {
    DEFAULT_BACKUP_COUNT
}

fn default_log_encoding() -> String {
    "utf-8".to_string()
}

fn default_log_retention_days() -> u64 {
    DEFAULT_RETENTION_DAYS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            api_prefix: default_api_prefix(),
            debug: false,
            host: default_host(),
            port: default_port(),
            cors_allowed_origins: default_cors_allowed_origins(),
            log_level: Severity::default(),
            log_dir: default_log_dir(),
            log_max_bytes: default_log_max_bytes(),
            log_backup_count: default_log_backup_count(),
            log_encoding: default_log_encoding(),
            log_retention_days: default_log_retention_days(),
        }
    }
}

impl Settings {
    /// Load settings from the config file (if present) and the environment
    pub fn load() -> Result<Self> {
        let path = config_file_path();
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Override fields from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PROJECT_NAME") {
            self.project_name = v;
        }
        if let Some(v) = lookup("API_PREFIX") {
            self.api_prefix = v;
        }
        if let Some(v) = lookup("DEBUG") {
            self.debug = parse_bool(&v).with_context(|| format!("Invalid DEBUG value '{}'", v))?;
        }
        if let Some(v) = lookup("HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.port = parse_env("PORT", &v)?;
        }
        if let Some(v) = lookup("CORS_ALLOWED_ORIGINS") {
            self.cors_allowed_origins = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v.parse::<Severity>().context("Invalid LOG_LEVEL")?;
        }
        if let Some(v) = lookup("LOG_DIR") {
            self.log_dir = v;
        }
        if let Some(v) = lookup("LOG_MAX_BYTES") {
            self.log_max_bytes = parse_env("LOG_MAX_BYTES", &v)?;
        }
        if let Some(v) = lookup("LOG_BACKUP_COUNT") {
            self.log_backup_count = parse_env("LOG_BACKUP_COUNT", &v)?;
        }
        if let Some(v) = lookup("LOG_ENCODING") {
            self.log_encoding = v;
        }
        if let Some(v) = lookup("LOG_RETENTION_DAYS") {
            self.log_retention_days = parse_env("LOG_RETENTION_DAYS", &v)?;
        }
        Ok(())
    }

    /// Allowed CORS origins, trimmed, empty entries dropped
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }

    /// API prefix with a leading `/` and no trailing `/`; `None` when empty
    pub fn api_base(&self) -> Option<String> {
        let trimmed = self.api_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(format!("/{}", trimmed))
        }
    }

    /// Minimum log severity after applying `debug`
    pub fn effective_log_level(&self) -> Severity {
        if self.debug {
            Severity::Debug
        } else {
            self.log_level
        }
    }

    /// Log directory with `~` expanded
    pub fn log_dir_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.log_dir).into_owned())
    }

    /// Process-scoped logging configuration; `process_id` defaults to the current process
    pub fn logging_config(&self, process_id: Option<u32>) -> Result<LoggingConfig> {
        let encoding = TextEncoding::from_str(&self.log_encoding)?;
        let mut config = LoggingConfig::process_scoped(self.effective_log_level())
            .with_log_dir(self.log_dir_path())
            .with_rotation(self.log_max_bytes, self.log_backup_count)
            .with_encoding(encoding);
        config.process_id = process_id;
        Ok(config)
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {} value '{}'", key, value))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("expected a boolean"),
    }
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}
