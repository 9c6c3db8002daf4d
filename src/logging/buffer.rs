//! In-memory record buffer
//!
//! A capped ring buffer sink that keeps the most recent records for inspection.

use std::collections::VecDeque;
use std::sync::RwLock;

use super::error::Result;
use super::level::Severity;
use super::record::LogRecord;
use super::sink::Sink;

/// Thread-safe ring buffer of log records
pub struct MemorySink {
    name: String,
    level: Severity,
    /// Retained records (capped at max_records)
    records: RwLock<VecDeque<LogRecord>>,
    max_records: usize,
}

impl MemorySink {
    /// Create a new buffer with the given minimum severity and capacity
    pub fn new(name: impl Into<String>, level: Severity, max_records: usize) -> Self {
        Self {
            name: name.into(),
            level,
            records: RwLock::new(VecDeque::with_capacity(max_records)),
            max_records,
        }
    }

    /// Get all retained records, oldest first
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .read()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the messages of all retained records, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.records
            .read()
            .map(|r| r.iter().map(|rec| rec.message.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.write() {
            records.clear();
        }
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> Severity {
        self.level
    }

    fn write(&self, record: &LogRecord) -> Result<()> {
        if self.max_records == 0 {
            return Ok(());
        }
        if let Ok(mut records) = self.records.write() {
            if records.len() >= self.max_records {
                records.pop_front();
            }
            records.push_back(record.clone());
        }
        Ok(())
    }
}
