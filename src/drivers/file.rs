//! Rotating file driver
//!
//! Appends rendered events to a single active file. Once the bytes written
//! to that file exceed the configured size, the file is closed, renamed to
//! `<path>.<YYYYMMDDHHMMSS>` and a fresh file is opened at `<path>`. Old
//! rotated files beyond the retention count are deleted, oldest first.

use crate::core::driver::Driver;
use crate::core::error::{LoggerError, Result};
use crate::core::event::Event;
use crate::core::metrics::should_alert;
use crate::core::output_format::OutputFormat;
use chrono::Local;
use serde::Deserialize;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fixed-width suffix layout, so rotated names sort chronologically
pub const ROTATION_SUFFIX: &str = "%Y%m%d%H%M%S";

const ROTATION_SUFFIX_LEN: usize = 14;
const BYTES_PER_MB: u64 = 1 << 20;

/// Configuration for [`FileDriver`]
///
/// # Examples
///
/// ```
/// use rust_event_logger::drivers::FileOptions;
/// use rust_event_logger::OutputFormat;
///
/// // Rotate at 50 MB and keep at most 7 files in total
/// let options = FileOptions::new("/var/log/app.log")
///     .with_max_file_size(50)
///     .with_max_file_count(7)
///     .with_format(OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    /// Active log file, e.g. `server.log` or `/data/logs/app.log`
    pub path: PathBuf,
    /// Maximum number of files kept, active file included. 0 keeps everything.
    pub max_file_count: usize,
    /// Rotation threshold in MB. 0 disables rotation, which also makes
    /// `max_file_count` irrelevant.
    pub max_file_size: u64,
    pub format: OutputFormat,
}

impl FileOptions {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_file_count(mut self, count: usize) -> Self {
        self.max_file_count = count;
        self
    }

    /// Set the rotation threshold in MB
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_file_size(mut self, megabytes: u64) -> Self {
        self.max_file_size = megabytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// File driver with size-triggered rotation and retention pruning
///
/// # Examples
///
/// ```no_run
/// use rust_event_logger::drivers::{FileDriver, FileOptions};
/// use rust_event_logger::prelude::*;
///
/// let driver = FileDriver::new(
///     FileOptions::new("logs/app.log")
///         .with_max_file_size(1)
///         .with_max_file_count(2),
/// )?;
///
/// let logger = Logger::builder().driver(driver).build();
/// logger.info("written to logs/app.log");
/// # Ok::<(), rust_event_logger::LoggerError>(())
/// ```
pub struct FileDriver {
    path: PathBuf,
    file_name: String,
    max_file_count: usize,
    /// Rotation threshold in bytes, 0 = never
    max_bytes: u64,
    format: OutputFormat,
    /// Unbuffered, so a failed write is reported by the call that made it
    file: Option<File>,
    /// Bytes in the active file, including what it held when opened
    current_size: u64,
    rotations: u64,
    rename_failures: u64,
}

impl FileDriver {
    /// Create the driver, its parent directory and the active file.
    ///
    /// # Errors
    ///
    /// Returns error if the path has no file name, the directory cannot be
    /// created, or the file cannot be opened.
    pub fn new(options: FileOptions) -> Result<Self> {
        let path = absolute_path(&options.path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                LoggerError::config(
                    "FileDriver",
                    format!("'{}' does not name a file", options.path.display()),
                )
            })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let mut driver = Self {
            path,
            file_name,
            max_file_count: options.max_file_count,
            max_bytes: options.max_file_size.saturating_mul(BYTES_PER_MB),
            format: options.format,
            file: None,
            current_size: 0,
            rotations: 0,
            rename_failures: 0,
        };
        driver.rotate()?;
        Ok(driver)
    }

    /// Close the active file, archive it and start a fresh one.
    ///
    /// With no open file this only prunes and opens, which is how the
    /// driver starts up.
    fn rotate(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            let _ = file.sync_all();
            drop(file);

            let target = self.rotated_path();
            match fs::rename(&self.path, &target) {
                Ok(()) => self.rotations += 1,
                Err(e) => {
                    // A stuck rename retries on every write; keep stderr readable.
                    if should_alert(self.rename_failures) {
                        eprintln!(
                            "[LOGGER WARNING] Failed to rename {} to {}: {}. \
                             Continuing with current file ({} failed renames so far).",
                            self.path.display(),
                            target.display(),
                            e,
                            self.rename_failures + 1
                        );
                    }
                    self.rename_failures += 1;
                }
            }
        }

        self.prune();
        self.open_active()
    }

    fn open_active(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                LoggerError::file_driver(
                    self.path.display().to_string(),
                    format!("Failed to open: {}", e),
                )
            })?;

        let metadata = file.metadata().map_err(|e| {
            LoggerError::file_driver(
                self.path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?;

        self.current_size = metadata.len();
        self.file = Some(file);
        Ok(())
    }

    /// `<path>.<timestamp>`, with a `.NNN` tiebreak when several rotations
    /// land in the same second.
    fn rotated_path(&self) -> PathBuf {
        let stamp = Local::now().format(ROTATION_SUFFIX).to_string();
        let mut base: OsString = self.path.clone().into_os_string();
        base.push(".");
        base.push(&stamp);

        let candidate = PathBuf::from(&base);
        if !candidate.exists() {
            return candidate;
        }
        for n in 1..1000 {
            let mut name = base.clone();
            name.push(format!(".{:03}", n));
            let candidate = PathBuf::from(name);
            if !candidate.exists() {
                return candidate;
            }
        }
        candidate
    }

    /// Rotated files belonging to this driver, oldest first.
    pub fn rotated_files(&self) -> Vec<PathBuf> {
        let dir = match self.path.parent() {
            Some(dir) => dir,
            None => return Vec::new(),
        };
        let prefix = format!("{}.", self.file_name);

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix(&prefix))
                    .is_some_and(is_rotation_suffix)
            })
            .map(|entry| entry.path())
            .collect();
        files.sort();
        files
    }

    /// Delete the oldest rotated files so that, with the active file, at
    /// most `max_file_count` remain. Failures are reported and ignored.
    fn prune(&self) {
        if self.max_file_count == 0 {
            return;
        }
        let keep = self.max_file_count - 1;
        let files = self.rotated_files();
        if files.len() <= keep {
            return;
        }

        let excess = files.len() - keep;
        for old in &files[..excess] {
            if let Err(e) = fs::remove_file(old) {
                eprintln!(
                    "[WARN] Failed to remove old log file {}: {}",
                    old.display(),
                    e
                );
            }
        }
    }

    /// Bytes written to the active file
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Absolute path of the active file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of completed rotations since construction
    #[must_use]
    pub fn rotation_count(&self) -> u64 {
        self.rotations
    }

    /// Rotations abandoned because the active file could not be renamed
    #[must_use]
    pub fn rename_failures(&self) -> u64 {
        self.rename_failures
    }

    #[must_use]
    pub fn max_file_count(&self) -> usize {
        self.max_file_count
    }

    /// Rotation threshold in bytes, 0 when rotation is disabled
    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

impl Driver for FileDriver {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        // A failed rotation can leave us without a file; try again before giving up.
        if self.file.is_none() {
            self.open_active()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| LoggerError::file_driver(self.path.display().to_string(), "No active file"))?;

        // Counted only once the bytes are in the file.
        file.write_all(buf).map_err(|e| {
            LoggerError::file_driver(
                self.path.display().to_string(),
                format!("Failed to write log entry: {}", e),
            )
        })?;
        self.current_size += buf.len() as u64;

        // The write that crosses the threshold stays whole in the old file.
        if self.max_bytes > 0 && self.current_size > self.max_bytes {
            self.rotate().map_err(|e| {
                LoggerError::file_rotation(self.path.display().to_string(), e.to_string())
            })?;
        }
        Ok(buf.len())
    }

    fn format(&self, event: &Event) -> Vec<u8> {
        self.format.render(event)
    }

    fn name(&self) -> &str {
        "file"
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut file) = self.file {
            file.flush().map_err(|e| {
                LoggerError::file_driver(
                    self.path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn shutdown(&mut self, _timeout: Duration) -> bool {
        let flushed = self.flush().is_ok();
        let synced = self
            .file
            .as_ref()
            .map_or(true, |file| file.sync_all().is_ok());
        flushed && synced
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(LoggerError::config("FileDriver", "log file path is empty"));
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| {
        LoggerError::io_operation("resolve log path", "cannot read current directory", e)
    })?;
    Ok(cwd.join(path))
}

fn is_rotation_suffix(suffix: &str) -> bool {
    suffix.len() >= ROTATION_SUFFIX_LEN
        && suffix.as_bytes()[..ROTATION_SUFFIX_LEN]
            .iter()
            .all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use tempfile::tempdir;

    const KB: usize = 1024;

    fn write_chunks(driver: &mut FileDriver, chunk: usize, count: usize) {
        let data = vec![b'x'; chunk];
        for _ in 0..count {
            driver.write(&data).unwrap();
        }
    }

    #[test]
    fn test_options_builder() {
        let options = FileOptions::new("app.log")
            .with_max_file_count(3)
            .with_max_file_size(10)
            .with_format(OutputFormat::Json);

        assert_eq!(options.path, PathBuf::from("app.log"));
        assert_eq!(options.max_file_count, 3);
        assert_eq!(options.max_file_size, 10);
        assert_eq!(options.format, OutputFormat::Json);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: FileOptions =
            serde_json::from_str(r#"{"path": "/tmp/app.log", "max_file_size": 5}"#).unwrap();
        assert_eq!(options.max_file_size, 5);
        assert_eq!(options.max_file_count, 0);
        assert_eq!(options.format, OutputFormat::Pattern);
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested/deeper/app.log");

        let driver = FileDriver::new(FileOptions::new(&log_path)).unwrap();
        assert!(log_path.exists());
        assert_eq!(driver.path(), log_path);
        assert_eq!(driver.current_size(), 0);
        assert_eq!(driver.max_bytes(), 0);
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let err = FileDriver::new(FileOptions::default()).err().unwrap();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_relative_path_is_made_absolute() {
        let resolved = absolute_path(Path::new("logs/app.log")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("logs/app.log"));
    }

    #[test]
    fn test_existing_size_is_counted() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("existing.log");
        fs::write(&log_path, vec![b'a'; 100]).unwrap();

        let driver = FileDriver::new(FileOptions::new(&log_path)).unwrap();
        assert_eq!(driver.current_size(), 100);
    }

    #[test]
    fn test_rotation_after_threshold() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.log");
        let mut driver = FileDriver::new(
            FileOptions::new(&log_path)
                .with_max_file_size(1)
                .with_max_file_count(2),
        )
        .unwrap();

        // 2 MB in 1 KB chunks
        write_chunks(&mut driver, KB, 2048);
        driver.flush().unwrap();

        assert_eq!(driver.rotation_count(), 1);
        let rotated = driver.rotated_files();
        assert_eq!(rotated.len(), 1);

        // The crossing write stays in the rotated file.
        let rotated_size = fs::metadata(&rotated[0]).unwrap().len();
        assert_eq!(rotated_size, (1 << 20) + KB as u64);

        let active_size = fs::metadata(&log_path).unwrap().len();
        assert!(active_size < 1 << 20);
        assert_eq!(active_size, driver.current_size());
    }

    #[test]
    fn test_rotated_name_has_timestamp_suffix() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("stamp.log");
        let mut driver =
            FileDriver::new(FileOptions::new(&log_path).with_max_file_size(1)).unwrap();

        write_chunks(&mut driver, 64 * KB, 17);

        let rotated = driver.rotated_files();
        assert_eq!(rotated.len(), 1);
        let name = rotated[0].file_name().unwrap().to_str().unwrap();
        let suffix = name.strip_prefix("stamp.log.").unwrap();
        assert_eq!(suffix.len(), ROTATION_SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn test_retention_limit_holds_after_every_rotation() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("retain.log");
        let mut driver = FileDriver::new(
            FileOptions::new(&log_path)
                .with_max_file_size(1)
                .with_max_file_count(3),
        )
        .unwrap();

        let chunk = vec![b'r'; 256 * KB];
        let mut seen_rotations = 0;
        for _ in 0..30 {
            driver.write(&chunk).unwrap();
            if driver.rotation_count() != seen_rotations {
                seen_rotations = driver.rotation_count();
                assert!(driver.rotated_files().len() + 1 <= 3);
            }
        }
        assert!(seen_rotations >= 5);
        assert_eq!(driver.rotated_files().len(), 2);
    }

    #[test]
    fn test_rotations_in_same_second_do_not_overwrite() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("burst.log");
        let mut driver =
            FileDriver::new(FileOptions::new(&log_path).with_max_file_size(1)).unwrap();

        for _ in 0..3 {
            write_chunks(&mut driver, 512 * KB, 3);
        }

        let rotated = driver.rotated_files();
        assert_eq!(rotated.len() as u64, driver.rotation_count());
        assert_eq!(rotated.len(), 3);
    }

    #[test]
    fn test_unlimited_size_never_rotates() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("never.log");
        let mut driver =
            FileDriver::new(FileOptions::new(&log_path).with_max_file_count(1)).unwrap();

        write_chunks(&mut driver, 64 * KB, 40);
        assert_eq!(driver.rotation_count(), 0);
        assert!(driver.rotated_files().is_empty());
        assert_eq!(driver.current_size(), 40 * 64 * KB as u64);
    }

    #[test]
    fn test_startup_prunes_and_ignores_unrelated_files() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("app.log");
        for stamp in ["20240101000000", "20240102000000", "20240103000000"] {
            fs::write(dir.path().join(format!("app.log.{}", stamp)), b"old").unwrap();
        }
        fs::write(dir.path().join("app.log.lock"), b"keep").unwrap();
        fs::write(dir.path().join("other.log.20240101000000"), b"keep").unwrap();

        let driver = FileDriver::new(FileOptions::new(&log_path).with_max_file_count(2)).unwrap();

        let rotated = driver.rotated_files();
        assert_eq!(rotated, vec![dir.path().join("app.log.20240103000000")]);
        assert!(dir.path().join("app.log.lock").exists());
        assert!(dir.path().join("other.log.20240101000000").exists());
    }

    #[test]
    fn test_format_follows_options() {
        let dir = tempdir().unwrap();
        let pattern = FileDriver::new(FileOptions::new(dir.path().join("p.log"))).unwrap();
        let json = FileDriver::new(
            FileOptions::new(dir.path().join("j.log")).with_format(OutputFormat::Json),
        )
        .unwrap();

        let event = Event::new(LogLevel::Info, "hello");
        assert!(String::from_utf8(pattern.format(&event)).unwrap().contains("info"));
        let value: serde_json::Value = serde_json::from_slice(&json.format(&event)).unwrap();
        assert_eq!(value["message"], "hello");
    }

    #[test]
    fn test_write_is_on_disk_without_flush() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("direct.log");
        let mut driver = FileDriver::new(FileOptions::new(&log_path)).unwrap();

        driver.write(b"visible line\n").unwrap();
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "visible line\n");
        assert!(driver.shutdown(Duration::from_secs(1)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_write_reaches_caller_and_is_not_counted() {
        if !Path::new("/dev/full").exists() {
            return;
        }
        let mut driver = FileDriver::new(FileOptions::new("/dev/full")).unwrap();
        let before = driver.current_size();

        let err = driver.write(&[b'x'; 100]).unwrap_err();
        assert!(matches!(err, LoggerError::FileDriverError { .. }));
        assert_eq!(driver.current_size(), before);
        assert_eq!(driver.rotation_count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_rename_keeps_logging() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("vanished.log");
        let mut driver =
            FileDriver::new(FileOptions::new(&log_path).with_max_file_size(1)).unwrap();

        // The open handle survives, but the path can no longer be renamed.
        fs::remove_file(&log_path).unwrap();
        let chunk = vec![b'v'; (1 << 20) + 1];
        assert_eq!(driver.write(&chunk).unwrap(), chunk.len());

        assert_eq!(driver.rotation_count(), 0);
        assert_eq!(driver.rename_failures(), 1);
        assert!(driver.rotated_files().is_empty());
        assert!(log_path.exists());
        assert_eq!(driver.current_size(), 0);

        driver.write(b"after\n").unwrap();
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "after\n");
    }
}
