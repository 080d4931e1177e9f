//! Runtime configuration resolution.
//!
//! # Responsibility
//! - Resolve database path and logging settings from environment variables.
//! - Provide defaults rooted in the platform temp directory.
//!
//! # Invariants
//! - Blank variables are treated as unset.
//! - Resolution never touches the filesystem; callers create directories.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "LIHA_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "LIHA_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "LIHA_LOG_DIR";

const DATA_DIR_NAME: &str = "liha";
const DB_FILE_NAME: &str = "liha.db";
const LOG_DIR_NAME: &str = "logs";

/// Resolved core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl CoreConfig {
    /// Resolves settings from the process environment.
    pub fn from_env() -> Self {
        Self::resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, falling back to defaults.
    pub fn resolve_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let data_dir = std::env::temp_dir().join(DATA_DIR_NAME);

        Self {
            db_path: read(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(DB_FILE_NAME)),
            log_level: read(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(LOG_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(LOG_DIR_NAME)),
        }
    }
}
