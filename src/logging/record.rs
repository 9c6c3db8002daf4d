//! Log records and their structured fields

use std::fmt;

use chrono::{DateTime, Local};
use serde_json::Value;

use super::level::Severity;

/// Ordered key/value pairs attached to a record
///
/// Insertion order is preserved so formatted output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a field, replacing an existing value for the same key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Renders as ` key=value` pairs; strings are written bare.
impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.0 {
            match value {
                Value::String(s) => write!(f, " {}={}", key, s)?,
                other => write!(f, " {}={}", key, other)?,
            }
        }
        Ok(())
    }
}

/// A single emitted log record
///
/// Built once by the logger and shared read-only with every sink.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Local time the record was created
    pub timestamp: DateTime<Local>,
    /// OS process id of the emitting process
    pub process_id: u32,
    /// Name of the logger the record was emitted through ("" for root)
    pub logger: String,
    pub severity: Severity,
    pub message: String,
    pub fields: Fields,
}

impl LogRecord {
    /// Create a new record stamped with the current time and process id
    pub fn new(severity: Severity, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            process_id: std::process::id(),
            logger: logger.into(),
            severity,
            message: message.into(),
            fields: Fields::new(),
        }
    }

    /// Attach structured fields
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Logger name as displayed in output
    pub fn display_name(&self) -> &str {
        if self.logger.is_empty() {
            "root"
        } else {
            &self.logger
        }
    }
}
