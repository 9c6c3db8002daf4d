//! End-to-end tests for process-scoped logging against real files

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use docman::logging::{
    FileNaming, Format, LogRecord, LoggerRegistry, LoggingConfig, LoggingError, Severity,
    APP_LOGGER, ROOT_LOGGER,
};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

fn scoped_config(dir: &Path, level: Severity, pid: u32) -> LoggingConfig {
    LoggingConfig::process_scoped(level)
        .with_log_dir(dir.join("logs"))
        .with_process_id(pid)
}

#[test]
fn test_severity_routing_across_sinks() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LoggerRegistry::new();
    let console = Captured::default();
    let config = scoped_config(temp_dir.path(), Severity::Info, 4100);

    registry
        .initialize_with_console(&config, Box::new(console.clone()))
        .unwrap();

    let logger = registry.get_logger(APP_LOGGER);
    for severity in Severity::ALL {
        logger.log(severity, format!("{} message", severity));
    }
    registry.flush();

    let app = read(&config.app_log_path());
    let errors = read(&config.error_log_path());
    let console = console.text();

    for severity in Severity::ALL {
        let line = format!(" - app - {} - {} message", severity, severity);
        let at_least_min = severity >= Severity::Info;
        assert_eq!(app.contains(&line), at_least_min, "app.log for {}", severity);
        assert_eq!(console.contains(&line), at_least_min, "console for {}", severity);
        assert_eq!(errors.contains(&line), severity >= Severity::Error, "error.log for {}", severity);
    }

    // File lines carry the pid, console lines do not
    let pid = format!(" - {} - app - ", std::process::id());
    assert!(app.contains(&pid));
    assert!(!console.contains(&pid));
}

#[test]
fn test_reinitialization_does_not_duplicate_lines() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LoggerRegistry::new();
    let console = Captured::default();
    let config = scoped_config(temp_dir.path(), Severity::Debug, 4200);

    registry
        .initialize_with_console(&config, Box::new(console.clone()))
        .unwrap();
    registry
        .initialize_with_console(&config, Box::new(console.clone()))
        .unwrap();

    assert_eq!(registry.handler_count(ROOT_LOGGER), 3);
    assert_eq!(registry.handler_count(APP_LOGGER), 3);

    registry.get_logger(APP_LOGGER).error("exactly once");
    registry.root().error("root once");
    registry.flush();

    for text in [
        read(&config.app_log_path()),
        read(&config.error_log_path()),
        console.text(),
    ] {
        assert_eq!(text.matches("exactly once").count(), 1);
        assert_eq!(text.matches("root once").count(), 1);
    }
}

#[test]
fn test_rotation_keeps_bounded_backups() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LoggerRegistry::new();
    let config = scoped_config(temp_dir.path(), Severity::Info, 4300);

    let message = |i: usize| format!("record {:02} {}", i, "x".repeat(60));
    let line_len = Format::Detailed
        .render(&LogRecord::new(Severity::Info, APP_LOGGER, message(0)))
        .len() as u64;
    // Two records fit, the third rotates
    let config = config.with_rotation(line_len * 2 + line_len / 2, 2);

    registry
        .initialize_with_console(&config, Box::new(io::sink()))
        .unwrap();

    let logger = registry.get_logger(APP_LOGGER);
    for i in 0..10 {
        logger.info(message(i));
    }
    registry.flush();

    let active = config.app_log_path();
    let dir = active.parent().unwrap();
    let mut app_files: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("app_4300.log"))
        .collect();
    app_files.sort();
    assert_eq!(
        app_files,
        vec!["app_4300.log", "app_4300.log.1", "app_4300.log.2"]
    );

    for path in [
        active.clone(),
        docman::logging::backup_path(&active, 1),
        docman::logging::backup_path(&active, 2),
    ] {
        assert!(fs::metadata(&path).unwrap().len() <= config.max_bytes);
    }

    let everything = format!(
        "{}{}{}",
        read(&active),
        read(&docman::logging::backup_path(&active, 1)),
        read(&docman::logging::backup_path(&active, 2))
    );
    for i in 0..4 {
        assert!(!everything.contains(&format!("record {:02} ", i)));
    }
    for i in 4..10 {
        assert!(everything.contains(&format!("record {:02} ", i)));
    }

    // Nothing at INFO reached the error stream
    assert_eq!(read(&config.error_log_path()), "");
}

#[test]
fn test_distinct_processes_use_disjoint_files() {
    let temp_dir = TempDir::new().unwrap();
    let first = scoped_config(temp_dir.path(), Severity::Info, 5001);
    let second = scoped_config(temp_dir.path(), Severity::Info, 5002);

    let first_registry = LoggerRegistry::new();
    let second_registry = LoggerRegistry::new();
    let first_info = first_registry
        .initialize_with_console(&first, Box::new(io::sink()))
        .unwrap();
    let second_info = second_registry
        .initialize_with_console(&second, Box::new(io::sink()))
        .unwrap();

    assert_ne!(first_info.app_log, second_info.app_log);
    assert_ne!(first_info.error_log, second_info.error_log);
    assert_ne!(first_info.app_log, second_info.error_log);

    first_registry.root().error("from worker 5001");
    second_registry.root().error("from worker 5002");
    first_registry.flush();
    second_registry.flush();

    let first_app = read(&first_info.app_log);
    let second_app = read(&second_info.app_log);
    assert!(first_app.contains("from worker 5001"));
    assert!(!first_app.contains("from worker 5002"));
    assert!(second_app.contains("from worker 5002"));
    assert!(!second_app.contains("from worker 5001"));
}

#[test]
fn test_unwritable_directory_fails_without_partial_handlers() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();

    let registry = LoggerRegistry::new();
    let config = LoggingConfig::process_scoped(Severity::Info)
        .with_log_dir(blocker.join("logs"))
        .with_process_id(6000);

    let err = registry
        .initialize_with_console(&config, Box::new(io::sink()))
        .unwrap_err();
    assert!(matches!(err, LoggingError::DirectoryUnavailable { .. }));

    assert_eq!(registry.handler_count(ROOT_LOGGER), 0);
    assert_eq!(registry.handler_count(APP_LOGGER), 0);
    assert_eq!(registry.mode(), None);
}

#[cfg(unix)]
#[test]
fn test_existing_directory_without_write_access() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let locked = temp_dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    let writable = fs::File::create(locked.join("canary")).is_ok();
    let _ = fs::remove_file(locked.join("canary"));

    let registry = LoggerRegistry::new();
    let config = LoggingConfig::process_scoped(Severity::Info)
        .with_log_dir(&locked)
        .with_process_id(6001);
    let result = registry.initialize_with_console(&config, Box::new(io::sink()));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    if writable {
        // Running privileged: mode bits do not stop the process
        assert!(result.is_ok());
        assert!(config.app_log_path().exists());
    } else {
        assert!(matches!(
            result,
            Err(LoggingError::DirectoryUnavailable { .. })
        ));
        assert_eq!(registry.handler_count(ROOT_LOGGER), 0);
        assert_eq!(registry.mode(), None);
        assert!(!config.app_log_path().exists());
    }
}

#[test]
fn test_failed_reinitialization_keeps_previous_handlers() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LoggerRegistry::new();
    let good = scoped_config(temp_dir.path(), Severity::Info, 7000);
    registry
        .initialize_with_console(&good, Box::new(io::sink()))
        .unwrap();

    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, b"x").unwrap();
    let bad = good.clone().with_log_dir(blocker.join("logs"));
    assert!(registry
        .initialize_with_console(&bad, Box::new(io::sink()))
        .is_err());

    registry.root().info("still working");
    registry.flush();
    assert!(read(&good.app_log_path()).contains("still working"));
}

#[test]
fn test_simple_mode_uses_shared_names() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LoggerRegistry::new();
    let config = LoggingConfig::simple(None, Severity::Warning)
        .with_log_dir(temp_dir.path())
        .with_process_id(8000);

    let info = registry
        .initialize_with_console(&config, Box::new(io::sink()))
        .unwrap();
    assert_eq!(info.naming, FileNaming::Shared);
    assert_eq!(info.app_log, temp_dir.path().join("app.log"));
    assert_eq!(info.error_log, temp_dir.path().join("error.log"));

    registry.root().info("below minimum");
    registry.root().warning("at minimum");
    registry.flush();

    let app = read(&info.app_log);
    assert!(!app.contains("below minimum"));
    assert!(app.contains(" - root - WARNING - at minimum"));
}
