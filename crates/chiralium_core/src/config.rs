//! Process configuration read from the environment.
//!
//! # Invariants
//! - Every setting has a usable default; an empty environment is valid.
//! - Blank values are treated as unset.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "CHIRALIUM_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CHIRALIUM_LOG_DIR";
pub const ENV_DB_PATH: &str = "CHIRALIUM_DB_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Level passed to `init_logging`.
    pub log_level: String,
    /// File logging is disabled when unset.
    pub log_dir: Option<PathBuf>,
    /// SQLite file backing the row store; in-memory when unset.
    pub db_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
        }
    }
}

impl CoreConfig {
    /// Reads `CHIRALIUM_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
        }
    }
}
