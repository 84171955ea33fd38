//! Tracing setup shared by `irisflow-train` and `irisflow-score`.
//!
//! Events go to stderr and to `outputs/logs/<tool>_<timestamp>.log`; stdout
//! carries only the tool's report. Each tool keeps its newest
//! [`LOGS_PER_TOOL`] files.

use std::cmp::Reverse;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use time::format_description::{BorrowedFormatItem, FormatItem};
use time::{OffsetDateTime, UtcOffset, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};

/// Log files retained per tool prefix.
pub const LOGS_PER_TOOL: usize = 10;
const DEFAULT_DIRECTIVE: &str = "info";

static FILE_WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Log directory unavailable: {0}")]
    Dir(#[from] AppDirError),
    #[error("Failed to create log file {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to list logs in {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to delete log {path}: {source}")]
    Prune {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to timestamp log file name: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("A global tracing subscriber is already installed: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Per-launch log files of one tool inside a log directory.
#[derive(Debug, Clone)]
struct ToolLogs {
    dir: PathBuf,
    prefix: String,
}

impl ToolLogs {
    fn new(dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.to_string(),
        }
    }

    fn file_name(&self, launched: OffsetDateTime) -> Result<String, LoggingError> {
        const STAMP: &[FormatItem<'_>] =
            format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
        Ok(format!("{}_{}.log", self.prefix, launched.format(STAMP)?))
    }

    /// Create (or reopen) the file for this launch and return its name.
    fn open_launch_file(&self, launched: OffsetDateTime) -> Result<String, LoggingError> {
        let name = self.file_name(launched)?;
        let path = self.dir.join(&name);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LoggingError::Create { path, source })?;
        Ok(name)
    }

    /// Files of this tool, newest first.
    fn newest_first(&self) -> Result<Vec<PathBuf>, LoggingError> {
        let listing = fs::read_dir(&self.dir).map_err(|source| LoggingError::Scan {
            path: self.dir.clone(),
            source,
        })?;
        let mut files: Vec<(SystemTime, PathBuf)> = listing
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
            .map(|entry| entry.path())
            .filter(|path| self.owns(path))
            .map(|path| {
                let modified = fs::metadata(&path)
                    .and_then(|meta| meta.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect();
        files.sort_by_key(|(modified, _)| Reverse(*modified));
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    fn owns(&self, path: &Path) -> bool {
        let is_log = path.extension().is_some_and(|ext| ext == "log");
        let ours = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&format!("{}_", self.prefix)));
        is_log && ours
    }

    /// Delete all but the `keep` newest files of this tool.
    fn retain_newest(&self, keep: usize) -> Result<usize, LoggingError> {
        let stale: Vec<PathBuf> = self.newest_first()?.into_iter().skip(keep).collect();
        for path in &stale {
            fs::remove_file(path).map_err(|source| LoggingError::Prune {
                path: path.clone(),
                source,
            })?;
        }
        Ok(stale.len())
    }
}

/// Install the global subscriber for the tool named `prefix`.
///
/// Only the first call installs anything. The caller decides whether a
/// failure is fatal; both tools keep running without file logging.
pub fn init(prefix: &str) -> Result<(), LoggingError> {
    if FILE_WRITER_GUARD.get().is_some() {
        return Ok(());
    }

    let logs = ToolLogs::new(app_dirs::logs_dir()?, prefix);
    let file_name = logs.open_launch_file(launch_time())?;
    let removed = logs.retain_newest(LOGS_PER_TOOL)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(rolling::never(&logs.dir, &file_name));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let timer = local_timer();
    let subscriber = Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_timer(timer.clone())
                .with_writer(std::io::stderr),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = FILE_WRITER_GUARD.set(guard);

    tracing::debug!(
        file = %logs.dir.join(&file_name).display(),
        removed,
        "logging ready"
    );
    Ok(())
}

fn launch_time() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn local_timer() -> fmt::time::OffsetTime<BorrowedFormatItem<'static>> {
    const CLOCK: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, CLOCK.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn launch_file_is_named_after_tool_and_time() {
        let dir = tempdir().unwrap();
        let logs = ToolLogs::new(dir.path(), "irisflow-train");
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let name = logs.open_launch_file(fixed).unwrap();
        assert_eq!(name, "irisflow-train_2023-11-14_22-13-20.log");
        assert!(dir.path().join(&name).is_file());
    }

    #[test]
    fn retains_only_the_newest_files() {
        let dir = tempdir().unwrap();
        for idx in 0..12 {
            touch(dir.path(), &format!("irisflow-train_{idx:02}.log"));
            thread::sleep(Duration::from_millis(10));
        }
        let logs = ToolLogs::new(dir.path(), "irisflow-train");
        assert_eq!(logs.retain_newest(LOGS_PER_TOOL).unwrap(), 2);

        let remaining = logs.newest_first().unwrap();
        assert_eq!(remaining.len(), LOGS_PER_TOOL);
        assert!(remaining[0].ends_with("irisflow-train_11.log"));
        assert!(!dir.path().join("irisflow-train_00.log").exists());
        assert!(!dir.path().join("irisflow-train_01.log").exists());
    }

    #[test]
    fn other_tools_and_files_are_left_alone() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "irisflow-score_a.log");
        touch(dir.path(), "irisflow-train-old_a.log");
        touch(dir.path(), "irisflow-train_notes.txt");
        touch(dir.path(), "irisflow-train_a.log");
        let logs = ToolLogs::new(dir.path(), "irisflow-train");
        assert_eq!(logs.retain_newest(0).unwrap(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }
}
