//! Text templates for records

use super::record::LogRecord;

/// Timestamp layout shared by every template
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Line template applied by a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `timestamp - pid - name - LEVEL - message`, used by file sinks
    Detailed,
    /// `timestamp - name - LEVEL - message`, used by the console
    Console,
}

impl Format {
    /// Render a record as a single line, including the trailing newline
    pub fn render(&self, record: &LogRecord) -> String {
        let timestamp = record.timestamp.format(TIMESTAMP_FORMAT);
        let mut line = match self {
            Format::Detailed => format!(
                "{} - {} - {} - {} - {}",
                timestamp,
                record.process_id,
                record.display_name(),
                record.severity,
                record.message
            ),
            Format::Console => format!(
                "{} - {} - {} - {}",
                timestamp,
                record.display_name(),
                record.severity,
                record.message
            ),
        };
        if !record.fields.is_empty() {
            line.push_str(&record.fields.to_string());
        }
        line.push('\n');
        line
    }
}
