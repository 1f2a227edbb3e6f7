//! File logging for hosts and the CLI.
//!
//! The core only emits `tracing` events. Hosts that want them on disk call
//! [`init`] (or [`init_from_config`]) once; logs go to a plain file that can be
//! followed with `tail -f`.

use crate::config::ResolvedConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "logging_tests.rs"]
mod capture_tests;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Errors raised while setting up file logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file's parent directory could not be created.
    #[error("Cannot create log directory {path:?}: {source}")]
    DirectoryCreation {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The path ends in `..` or is a bare root, so there is no file to open.
    #[error("Log path {0:?} does not name a file")]
    InvalidPath(PathBuf),

    /// The configured path has no parent directory.
    #[error("Log path {0:?} has no directory component")]
    NoParentDirectory(PathBuf),

    /// Another global subscriber won the race.
    #[error("A global tracing subscriber is already installed")]
    SubscriberAlreadySet,
}

/// `RUST_LOG` if set and valid, otherwise [`DEFAULT_DIRECTIVE`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Split a log file path into the directory to create and the file name.
///
/// A bare file name logs into the current directory.
pub fn split_log_path(log_path: &Path) -> Result<(PathBuf, String), LoggingError> {
    let file_name = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(log_path.to_path_buf()))?;
    let directory = log_path
        .parent()
        .ok_or_else(|| LoggingError::NoParentDirectory(log_path.to_path_buf()))?;
    let directory = if directory.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        directory.to_path_buf()
    };
    Ok((directory, file_name.to_string()))
}

/// Install a global fmt subscriber that appends to `log_path`.
///
/// The level comes from [`env_filter`]. Missing directories are created.
///
/// # Errors
/// The path has no file name, the directory cannot be created, or a global
/// subscriber is already installed.
pub fn init(log_path: &Path) -> Result<(), LoggingError> {
    let (directory, file_name) = split_log_path(log_path)?;

    std::fs::create_dir_all(&directory).map_err(|source| LoggingError::DirectoryCreation {
        path: directory.clone(),
        source,
    })?;

    let file_appender = tracing_appender::rolling::never(&directory, &file_name);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(file_appender)
        .with_ansi(false)
        .try_init()
        .map_err(|_| LoggingError::SubscriberAlreadySet)
}

/// [`init`] with the log path from resolved configuration.
pub fn init_from_config(config: &ResolvedConfig) -> Result<(), LoggingError> {
    init(&config.log_file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn split_log_path_separates_directory_and_file() {
        let (dir, file) = split_log_path(Path::new("/var/log/nestcanvas/app.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/nestcanvas"));
        assert_eq!(file, "app.log");
    }

    #[test]
    fn bare_file_name_logs_to_current_directory() {
        let (dir, file) = split_log_path(Path::new("nestcanvas.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(file, "nestcanvas.log");
    }

    #[test]
    fn root_is_not_a_log_file() {
        assert!(matches!(
            split_log_path(Path::new("/")),
            Err(LoggingError::InvalidPath(_))
        ));
    }

    #[test]
    #[serial(tracing_init)]
    fn init_creates_log_directory_if_missing() {
        let test_dir = std::env::temp_dir().join("nestcanvas_test_logs_create");
        let log_file = test_dir.join("session.log");
        let _ = fs::remove_dir_all(&test_dir);

        // May fail if a subscriber is already set; the directory is created first.
        let _ = init(&log_file);

        assert!(test_dir.exists(), "Log directory should be created: {:?}", test_dir);
        let _ = fs::remove_dir_all(&test_dir);
    }

    #[test]
    #[serial(tracing_init)]
    fn init_from_config_uses_configured_path() {
        let test_dir = std::env::temp_dir().join("nestcanvas_test_logs_config");
        let _ = fs::remove_dir_all(&test_dir);
        let config = ResolvedConfig {
            log_file_path: test_dir.join("canvas.log"),
            ..ResolvedConfig::default()
        };

        let _ = init_from_config(&config);

        assert!(test_dir.exists(), "Log directory should exist: {:?}", test_dir);
        let _ = fs::remove_dir_all(&test_dir);
    }

    #[test]
    #[serial(tracing_init)]
    fn second_init_reports_subscriber_already_set() {
        let test_dir = std::env::temp_dir().join("nestcanvas_test_logs_twice");
        let log_file = test_dir.join("twice.log");

        let _ = init(&log_file);
        assert!(matches!(init(&log_file), Err(LoggingError::SubscriberAlreadySet)));
        let _ = fs::remove_dir_all(&test_dir);
    }
}
