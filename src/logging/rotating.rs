//! Size-capped log files with numbered backups
//!
//! A [`RotatingFile`] appends to `<path>` until the next write would push it past
//! `max_bytes`. It then shifts `<path>.1 .. <path>.N-1` up by one generation, moves
//! the current file to `<path>.1` and starts a fresh `<path>`. Generation `N + 1`
//! falls off the end.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Size limit and number of retained backups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Maximum size of the active file in bytes; 0 disables rotation
    pub max_bytes: u64,
    /// Number of numbered backups to keep; 0 truncates on rotation
    pub backup_count: usize,
}

impl RotationPolicy {
    pub fn new(max_bytes: u64, backup_count: usize) -> Self {
        Self {
            max_bytes,
            backup_count,
        }
    }
}

/// A log file that rotates itself according to a [`RotationPolicy`]
///
/// Not synchronized; callers share it behind a mutex so a rotation and the write
/// that triggered it are never interleaved with another writer.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    policy: RotationPolicy,
    /// `None` after a failed rotation; reopened on the next write
    file: Option<File>,
    size: u64,
}

impl RotatingFile {
    /// Open (or create) the active file in append mode
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path,
            policy,
            file: Some(file),
            size,
        })
    }

    /// Path of the active file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Current size of the active file in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of backup generation `index` (1 is the most recent)
    pub fn backup_path(&self, index: usize) -> PathBuf {
        backup_path(&self.path, index)
    }

    /// Append one complete record, rotating first if it would not fit
    pub fn write_record(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.should_rotate(bytes.len() as u64) {
            self.rotate()?;
        }

        let file = match self.file.take() {
            Some(file) => file,
            None => {
                let file = open_append(&self.path)?;
                self.size = file.metadata()?.len();
                file
            }
        };
        let file = self.file.insert(file);

        match file.write_all(bytes).and_then(|_| file.flush()) {
            Ok(()) => {
                self.size += bytes.len() as u64;
                Ok(())
            }
            Err(e) => {
                // A partial write may have landed; resync from disk.
                if let Ok(meta) = file.metadata() {
                    self.size = meta.len();
                }
                Err(e)
            }
        }
    }

    /// Whether appending `incoming` bytes requires a rotation first
    ///
    /// An empty file always accepts the record, so a single oversized record
    /// never produces an empty backup.
    pub fn should_rotate(&self, incoming: u64) -> bool {
        self.policy.max_bytes > 0 && self.size > 0 && self.size + incoming > self.policy.max_bytes
    }

    /// Archive the active file and open a fresh one
    pub fn rotate(&mut self) -> io::Result<()> {
        // Close the handle before renaming so this also works on Windows.
        self.file = None;

        if self.policy.backup_count > 0 {
            for index in (1..self.policy.backup_count).rev() {
                let src = self.backup_path(index);
                if src.exists() {
                    let dst = self.backup_path(index + 1);
                    remove_if_exists(&dst)?;
                    fs::rename(&src, &dst)?;
                }
            }

            let first = self.backup_path(1);
            remove_if_exists(&first)?;
            if self.path.exists() {
                fs::rename(&self.path, &first)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.file = Some(file);
        self.size = 0;

        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Path of backup generation `index` for the active file at `path`
pub fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(i: usize, len: usize) -> Vec<u8> {
        let mut line = format!("record {:03} ", i).into_bytes();
        line.resize(len - 1, b'x');
        line.push(b'\n');
        line
    }

    #[test]
    fn test_open_picks_up_existing_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        fs::write(&path, b"previous run\n").unwrap();

        let file = RotatingFile::open(&path, RotationPolicy::new(1024, 2)).unwrap();
        assert_eq!(file.size(), 13);
    }

    #[test]
    fn test_backup_path_naming() {
        let path = Path::new("/var/log/docman/app_42.log");
        assert_eq!(
            backup_path(path, 3),
            PathBuf::from("/var/log/docman/app_42.log.3")
        );
    }

    #[test]
    fn test_rotates_before_exceeding_limit() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let mut file = RotatingFile::open(&path, RotationPolicy::new(100, 3)).unwrap();

        for i in 0..4 {
            file.write_record(&record(i, 30)).unwrap();
            assert!(file.size() <= 100);
        }

        // 3 x 30 fits, the 4th forces one rotation
        assert_eq!(file.size(), 30);
        assert!(file.backup_path(1).exists());
        assert!(!file.backup_path(2).exists());
        assert_eq!(fs::metadata(file.backup_path(1)).unwrap().len(), 90);
    }

    #[test]
    fn test_discards_backups_beyond_count() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let mut file = RotatingFile::open(&path, RotationPolicy::new(100, 2)).unwrap();

        // 45-byte records: two per generation, ten records make five generations
        for i in 0..10 {
            file.write_record(&record(i, 45)).unwrap();
        }

        assert!(path.exists());
        assert!(file.backup_path(1).exists());
        assert!(file.backup_path(2).exists());
        assert!(!file.backup_path(3).exists());

        let active = fs::read_to_string(&path).unwrap();
        let newest_backup = fs::read_to_string(file.backup_path(1)).unwrap();
        let oldest_backup = fs::read_to_string(file.backup_path(2)).unwrap();
        assert!(active.contains("record 008") && active.contains("record 009"));
        assert!(newest_backup.contains("record 006") && newest_backup.contains("record 007"));
        assert!(oldest_backup.contains("record 004") && oldest_backup.contains("record 005"));

        let all = format!("{}{}{}", active, newest_backup, oldest_backup);
        for i in 0..4 {
            assert!(!all.contains(&format!("record {:03}", i)));
        }
    }

    #[test]
    fn test_zero_backups_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let mut file = RotatingFile::open(&path, RotationPolicy::new(50, 0)).unwrap();

        file.write_record(&record(0, 40)).unwrap();
        file.write_record(&record(1, 40)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("record 000"));
        assert!(content.contains("record 001"));
        assert!(!file.backup_path(1).exists());
    }

    #[test]
    fn test_zero_max_bytes_never_rotates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let mut file = RotatingFile::open(&path, RotationPolicy::new(0, 2)).unwrap();

        for i in 0..20 {
            file.write_record(&record(i, 64)).unwrap();
        }

        assert_eq!(file.size(), 20 * 64);
        assert!(!file.backup_path(1).exists());
    }

    #[test]
    fn test_oversized_record_goes_to_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let mut file = RotatingFile::open(&path, RotationPolicy::new(10, 2)).unwrap();

        file.write_record(&record(0, 64)).unwrap();
        assert!(!file.backup_path(1).exists());

        // The next record rotates the oversized one out
        file.write_record(&record(1, 5)).unwrap();
        assert_eq!(fs::metadata(file.backup_path(1)).unwrap().len(), 64);
        assert_eq!(file.size(), 5);
    }

    #[test]
    fn test_recovers_after_active_file_removed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let mut file = RotatingFile::open(&path, RotationPolicy::new(60, 2)).unwrap();

        file.write_record(&record(0, 40)).unwrap();
        fs::remove_file(&path).unwrap();

        // Rotation finds no active file to archive and starts fresh
        file.write_record(&record(1, 40)).unwrap();
        assert!(path.exists());
        assert!(!file.backup_path(1).exists());
        assert_eq!(file.size(), 40);
    }
}
