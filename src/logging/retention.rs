//! Cleanup of log files left behind by exited worker processes
//!
//! Process-scoped naming gives every worker its own `app_<pid>.log` and
//! `error_<pid>.log` (plus numbered backups). Once a worker is gone its files
//! are never written again, so they are removed after the retention period.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::Result;

/// Default retention period in days
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// Extract the process id from a process-scoped log file name
///
/// Matches `app_<pid>.log`, `error_<pid>.log` and their `.N` backups.
pub fn process_id_of(file_name: &str) -> Option<u32> {
    let rest = file_name
        .strip_prefix("app_")
        .or_else(|| file_name.strip_prefix("error_"))?;
    let (pid, suffix) = rest.split_once(".log")?;
    if pid.is_empty() || !pid.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !suffix.is_empty() {
        let generation = suffix.strip_prefix('.')?;
        if generation.is_empty() || !generation.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    pid.parse().ok()
}

/// Remove process-scoped log files of other processes older than the retention period
///
/// Files belonging to `current_pid`, shared-mode files and unrelated files are
/// left alone. Returns the number of files deleted.
pub fn cleanup_stale_process_logs(
    logs_dir: &Path,
    current_pid: u32,
    retention_days: u64,
) -> Result<usize> {
    if !logs_dir.exists() {
        return Ok(0);
    }

    let retention_duration = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60));
    let cutoff = SystemTime::now()
        .checked_sub(retention_duration)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted_count = 0;

    for entry in fs::read_dir(logs_dir)? {
        let entry = entry?;
        let path = entry.path();

        let owner = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(process_id_of);
        match owner {
            Some(pid) if pid != current_pid => {}
            _ => continue,
        }

        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                if modified < cutoff && fs::remove_file(&path).is_ok() {
                    deleted_count += 1;
                }
            }
        }
    }

    Ok(deleted_count)
}
