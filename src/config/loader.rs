//! Settings resolution: defaults, then a TOML file, then environment, then CLI.

use serde::Deserialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "NESTCANVAS_CONFIG";

/// Environment variable overriding the save debounce window (milliseconds).
pub const DEBOUNCE_ENV: &str = "NESTCANVAS_DEBOUNCE_MS";

/// Environment variable overriding the log file path.
pub const LOG_ENV: &str = "NESTCANVAS_LOG";

/// Errors raised while resolving configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `NESTCANVAS_CONFIG` (or another path source) is unusable.
    #[error("Invalid config path: {0}")]
    InvalidPath(String),

    /// The file exists but could not be read.
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// File that failed to read.
        path: PathBuf,
        /// I/O error text.
        reason: String,
    },

    /// The file is not valid TOML or names an unknown setting.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser error text.
        reason: String,
    },

    /// A setting parsed but is out of range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Setting name as written in the file.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// On-disk settings. Every key is optional; unknown keys are rejected.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Quiet period before pending saves are written.
    #[serde(default)]
    pub debounce_ms: Option<u64>,

    /// Number of undoable actions kept.
    #[serde(default)]
    pub undo_capacity: Option<usize>,

    /// Total attempts for a transiently failing write.
    #[serde(default)]
    pub retry_attempts: Option<u32>,

    /// First retry delay; doubles per attempt.
    #[serde(default)]
    pub retry_base_ms: Option<u64>,

    /// Zoom-to-fit animation length.
    #[serde(default)]
    pub fit_duration_ms: Option<u64>,

    /// World units of padding around fitted content.
    #[serde(default)]
    pub fit_padding: Option<f64>,

    /// Navigation lock fallback timeout.
    #[serde(default)]
    pub nav_timeout_ms: Option<u64>,

    /// Where tracing output is written.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Final settings after every source has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Quiet period before a pending write is sent.
    pub debounce_ms: u64,
    /// Undo actions kept per session.
    pub undo_capacity: usize,
    /// Attempts for a write that fails transiently.
    pub retry_attempts: u32,
    /// Delay before the first retry; doubled per attempt.
    pub retry_base_ms: u64,
    /// Length of the zoom-to-fit animation.
    pub fit_duration_ms: u64,
    /// Screen padding around fitted content.
    pub fit_padding: f64,
    /// Longest the navigation lock is held.
    pub nav_timeout_ms: u64,
    /// Where log output is written.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            undo_capacity: 50,
            retry_attempts: 3,
            retry_base_ms: 250,
            fit_duration_ms: 450,
            fit_padding: 80.0,
            nav_timeout_ms: 1_200,
            log_file_path: default_log_path(),
        }
    }
}

impl ResolvedConfig {
    /// Reject settings that would disable core behaviour.
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| {
            Err(ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            })
        };
        if self.undo_capacity == 0 {
            return invalid("undo_capacity", "must be at least 1");
        }
        if self.retry_attempts == 0 {
            return invalid("retry_attempts", "must be at least 1");
        }
        if self.nav_timeout_ms == 0 {
            return invalid("nav_timeout_ms", "must be positive");
        }
        if !self.fit_padding.is_finite() || self.fit_padding < 0.0 {
            return invalid("fit_padding", "must be a non-negative number");
        }
        if self.log_file_path.as_os_str().is_empty() {
            return invalid("log_file_path", "must not be empty");
        }
        Ok(())
    }
}

/// `<state dir>/nestcanvas/nestcanvas.log`, or `nestcanvas.log` in the working
/// directory on platforms without a state dir.
pub fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .map(|dir| dir.join("nestcanvas").join("nestcanvas.log"))
        .unwrap_or_else(|| PathBuf::from("nestcanvas.log"))
}

/// Parse the TOML file at `path`. A file that does not exist yields `Ok(None)`.
///
/// # Errors
/// [`ConfigError::ReadError`] for I/O failures other than not-found,
/// [`ConfigError::ParseError`] for bad TOML or unknown keys.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(ConfigError::ReadError {
                path,
                reason: err.to_string(),
            })
        }
    };
    toml::from_str(&contents)
        .map(Some)
        .map_err(|err| ConfigError::ParseError {
            path,
            reason: err.to_string(),
        })
}

/// `<config dir>/nestcanvas/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nestcanvas").join("config.toml"))
}

/// Pick the config file to read and load it.
///
/// The first source that names a path wins: `config_path` (the `--config`
/// flag), then [`CONFIG_ENV`], then [`default_config_path`]. Only that one
/// file is consulted, and its absence means "all defaults".
///
/// # Errors
/// An empty [`CONFIG_ENV`], or a read or parse failure of the chosen file.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    let chosen = match (config_path, std::env::var(CONFIG_ENV)) {
        (Some(path), _) => Some(path),
        (None, Ok(raw)) if raw.trim().is_empty() => {
            return Err(ConfigError::InvalidPath(format!("{CONFIG_ENV} is set but empty")));
        }
        (None, Ok(raw)) => Some(PathBuf::from(raw)),
        (None, Err(_)) => default_config_path(),
    };
    chosen.map_or(Ok(None), load_config_file)
}

/// Overlay [`DEBOUNCE_ENV`] and [`LOG_ENV`] when they are set.
///
/// # Errors
/// [`ConfigError::InvalidValue`] if the debounce override is not a number.
pub fn apply_env_overrides(mut config: ResolvedConfig) -> Result<ResolvedConfig, ConfigError> {
    if let Ok(raw) = std::env::var(DEBOUNCE_ENV) {
        config.debounce_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: "debounce_ms",
            reason: format!("{DEBOUNCE_ENV}={raw:?} is not a whole number of milliseconds"),
        })?;
    }
    if let Ok(path) = std::env::var(LOG_ENV) {
        config.log_file_path = PathBuf::from(path);
    }
    Ok(config)
}

/// Settings from the file where present, defaults elsewhere.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let base = ResolvedConfig::default();
    let file = config_file.unwrap_or_default();
    ResolvedConfig {
        debounce_ms: file.debounce_ms.unwrap_or(base.debounce_ms),
        undo_capacity: file.undo_capacity.unwrap_or(base.undo_capacity),
        retry_attempts: file.retry_attempts.unwrap_or(base.retry_attempts),
        retry_base_ms: file.retry_base_ms.unwrap_or(base.retry_base_ms),
        fit_duration_ms: file.fit_duration_ms.unwrap_or(base.fit_duration_ms),
        fit_padding: file.fit_padding.unwrap_or(base.fit_padding),
        nav_timeout_ms: file.nav_timeout_ms.unwrap_or(base.nav_timeout_ms),
        log_file_path: file.log_file_path.unwrap_or(base.log_file_path),
    }
}

/// Overlay the `--debounce-ms` and `--log-file` flags, when given.
pub fn apply_cli_overrides(
    config: ResolvedConfig,
    debounce_override: Option<u64>,
    log_file_override: Option<PathBuf>,
) -> ResolvedConfig {
    ResolvedConfig {
        debounce_ms: debounce_override.unwrap_or(config.debounce_ms),
        log_file_path: log_file_override.unwrap_or(config.log_file_path),
        ..config
    }
}

/// Run the whole chain: file, env, CLI, then validation.
///
/// # Errors
///
/// Any read, parse or validation error from the chain.
pub fn resolve(
    config_path: Option<PathBuf>,
    debounce_override: Option<u64>,
    log_file_override: Option<PathBuf>,
) -> Result<ResolvedConfig, ConfigError> {
    let file = load_config_with_precedence(config_path)?;
    let config = apply_env_overrides(merge_config(file))?;
    let config = apply_cli_overrides(config, debounce_override, log_file_override);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
