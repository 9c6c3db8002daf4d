//! Record severities
//!
//! A closed, totally ordered set of severities used for filtering at loggers and sinks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::LoggingError;

/// Severity of a log record, ordered from least to most important
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// All severities in ascending order
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Get the display name for this severity
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Check if this severity belongs in the error-only stream
    pub fn is_error(&self) -> bool {
        *self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(LoggingError::InvalidSeverity(s.to_string())),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = LoggingError;

    fn try_from(value: String) -> Result<Self, LoggingError> {
        value.parse()
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_string()
    }
}

/// `tracing` has no CRITICAL level and an extra TRACE level below DEBUG.
impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warning,
            tracing::Level::ERROR => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);

        let mut sorted = Severity::ALL;
        sorted.sort();
        assert_eq!(sorted, Severity::ALL);
    }

    #[test]
    fn test_severity_parse_case_insensitive() {
        assert_eq!("debug".parse::<Severity>().unwrap(), Severity::Debug);
        assert_eq!("Info".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!(" WARNING ".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
    }

    #[test]
    fn test_severity_parse_rejects_unknown() {
        let err = "verbose".parse::<Severity>().unwrap_err();
        assert!(matches!(err, LoggingError::InvalidSeverity(ref s) if s == "verbose"));
        assert!("".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_is_error() {
        assert!(!Severity::Debug.is_error());
        assert!(!Severity::Info.is_error());
        assert!(!Severity::Warning.is_error());
        assert!(Severity::Error.is_error());
        assert!(Severity::Critical.is_error());
    }

    #[test]
    fn test_from_tracing_level() {
        assert_eq!(Severity::from(tracing::Level::TRACE), Severity::Debug);
        assert_eq!(Severity::from(tracing::Level::WARN), Severity::Warning);
        assert_eq!(Severity::from(tracing::Level::ERROR), Severity::Error);
    }

    #[test]
    fn test_severity_try_from_string() {
        assert_eq!(
            Severity::try_from("error".to_string()).unwrap(),
            Severity::Error
        );
        let err = Severity::try_from("fatal".to_string()).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidSeverity(ref s) if s == "fatal"));
        assert_eq!(String::from(Severity::Critical), "CRITICAL");
    }

    #[test]
    fn test_severity_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            level: Severity,
        }

        let parsed: Wrapper = toml::from_str(r#"level = "warning""#).unwrap();
        assert_eq!(parsed.level, Severity::Warning);

        let bad: Result<Wrapper, _> = toml::from_str(r#"level = "loud""#);
        assert!(bad.is_err());
    }
}
