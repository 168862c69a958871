//! Logging setup for the training job.
//!
//! Installs a global tracing subscriber that writes to stdout and, when
//! `BCW_LOG_DIR` is set, to a per-run log file in that directory. Files are
//! timestamped and kept to a bounded count.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

/// Directory for per-run log files; unset means stdout only.
pub const LOG_DIR_ENV: &str = "BCW_LOG_DIR";
/// Maximum number of log files to retain.
const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "bcw-trainer";

static LOG_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create or access the log directory.
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to enumerate existing log files for pruning.
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to remove an obsolete log file.
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Initialize tracing from the process environment.
///
/// Subsequent calls are no-ops. Failures are returned so the caller can keep
/// running without logs.
pub fn init() -> Result<(), LoggingError> {
    let log_dir = std::env::var_os(LOG_DIR_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    init_with(log_dir.as_deref())
}

/// Initialize tracing, adding a file layer under `log_dir` when given.
pub fn init_with(log_dir: Option<&Path>) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let timer = build_timer();
    let stdout_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_writer(std::io::stdout);

    let Some(log_dir) = log_dir else {
        let subscriber = Registry::default()
            .with(build_env_filter())
            .with(stdout_layer);
        tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
        let _ = LOG_GUARD.set(None);
        return Ok(());
    };

    let log_path = prepare_log_file(log_dir, OffsetDateTime::now_utc())?;
    let log_file_name = log_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    let file_appender = rolling::never(log_dir, log_file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(file_writer);

    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(stdout_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(Some(guard));

    tracing::info!("Logging initialized; log file at {}", log_path.display());
    Ok(())
}

/// Create the log directory and this run's file, then prune old files.
fn prepare_log_file(dir: &Path, now: OffsetDateTime) -> Result<PathBuf, LoggingError> {
    fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let log_path = dir.join(format_log_file_name(now)?);
    ensure_file_exists(&log_path)?;
    prune_old_logs(dir, MAX_LOG_FILES)?;
    Ok(log_path)
}

fn ensure_file_exists(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn prune_old_logs(dir: &Path, max_files: usize) -> Result<(), LoggingError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("log"))
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|(modified, _)| *modified);
    let excess = entries.len().saturating_sub(max_files);
    for (_, path) in entries.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn format_log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[BorrowedFormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let name = now
        .to_offset(UtcOffset::UTC)
        .format(NAME_FORMAT)
        .map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}_{name}.log"))
}

fn build_timer() -> fmt::time::OffsetTime<BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]Z");
    fmt::time::OffsetTime::new(UtcOffset::UTC, DISPLAY_FORMAT.into())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
