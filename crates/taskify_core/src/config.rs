//! Engine configuration.
//!
//! # Responsibility
//! - Provide defaults for database location, slot key, reminder interval and
//!   log level.
//! - Apply `TASKIFY_*` environment overrides.
//!
//! # Invariants
//! - Blank override values fall back to defaults.
//! - The reminder interval is never zero.

use crate::logging::default_log_level;
use crate::reminder::scheduler::DEFAULT_TICK_INTERVAL;
use crate::repo::task_slot::DEFAULT_SLOT_KEY;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "TASKIFY_DB_PATH";
pub const ENV_SLOT_KEY: &str = "TASKIFY_SLOT_KEY";
pub const ENV_REMINDER_INTERVAL_MS: &str = "TASKIFY_REMINDER_INTERVAL_MS";
pub const ENV_LOG_LEVEL: &str = "TASKIFY_LOG_LEVEL";

const DEFAULT_DB_FILE_NAME: &str = "taskify.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Reminder interval is not a positive integer of milliseconds.
    InvalidInterval(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInterval(value) => write!(
                f,
                "{ENV_REMINDER_INTERVAL_MS} must be a positive integer, got `{value}`"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    pub slot_key: String,
    pub reminder_interval: Duration,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            slot_key: DEFAULT_SLOT_KEY.to_string(),
            reminder_interval: DEFAULT_TICK_INTERVAL,
            log_level: default_log_level().to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = get(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(slot_key) = get(ENV_SLOT_KEY) {
            config.slot_key = slot_key;
        }
        if let Some(raw) = get(ENV_REMINDER_INTERVAL_MS) {
            config.reminder_interval = parse_interval_ms(&raw)?;
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.log_level = level;
        }

        Ok(config)
    }
}

/// Parses a positive millisecond count.
pub fn parse_interval_ms(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidInterval(raw.to_string())),
        Ok(ms) => Ok(Duration::from_millis(ms)),
    }
}
