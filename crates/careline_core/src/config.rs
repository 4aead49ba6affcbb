//! Runtime configuration for embedding processes.
//!
//! # Responsibility
//! - Resolve database location and logging settings from the environment.
//! - Validate settings before any connection or logger is opened.
//!
//! # Invariants
//! - Resolution is pure given the lookup function; nothing reads the process
//!   environment except `CoreConfig::from_env`.
//! - `log_dir`, when set, is absolute.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DB_PATH_ENV: &str = "CARELINE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "CARELINE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "CARELINE_LOG_DIR";
const DEFAULT_DB_FILE_NAME: &str = "careline.sqlite3";

/// Resolved core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Rolling log directory; file logging is off when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Configuration error with the offending variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Empty(&'static str),
    InvalidLevel(String),
    NotAbsolute { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(key) => write!(f, "`{key}` is set but empty"),
            Self::InvalidLevel(message) => write!(f, "`{LOG_LEVEL_ENV}`: {message}"),
            Self::NotAbsolute { key, value } => {
                write!(f, "`{key}` must be an absolute path, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

impl CoreConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, falling back to defaults for
    /// unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(DB_PATH_ENV) {
            config.db_path = PathBuf::from(non_empty(DB_PATH_ENV, &value)?);
        }
        if let Some(value) = lookup(LOG_LEVEL_ENV) {
            let level = non_empty(LOG_LEVEL_ENV, &value)?;
            config.log_level = normalize_level(level)
                .map_err(ConfigError::InvalidLevel)?
                .to_string();
        }
        if let Some(value) = lookup(LOG_DIR_ENV) {
            let trimmed = non_empty(LOG_DIR_ENV, &value)?;
            if !Path::new(trimmed).is_absolute() {
                return Err(ConfigError::NotAbsolute {
                    key: LOG_DIR_ENV,
                    value: trimmed.to_string(),
                });
            }
            config.log_dir = Some(PathBuf::from(trimmed));
        }

        Ok(config)
    }
}

fn non_empty<'a>(key: &'static str, value: &'a str) -> Result<&'a str, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty(key));
    }
    Ok(trimmed)
}
