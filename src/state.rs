use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::db::{DbError, ServiceDb};
use crate::notification::Notifier;
use crate::types::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    HomeDirNotFound,
    #[error("Failed to read config {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("Failed to parse config {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Application state shared by every command.
pub struct AppState {
    pub config: Config,
    pub db: Mutex<ServiceDb>,
    pub notifier: Box<dyn Notifier>,
}

impl AppState {
    /// Open the configured database (or the default one) and wire up the notifier.
    pub fn open(config: Config, notifier: Box<dyn Notifier>) -> Result<Self, DbError> {
        let db = match config.database_path.as_deref() {
            Some(path) => ServiceDb::open_at(expand_home(path))?,
            None => ServiceDb::open()?,
        };
        Ok(Self {
            config,
            db: Mutex::new(db),
            notifier,
        })
    }

    /// Lock the database. A poisoned lock is recovered: SQLite keeps its own
    /// consistency and every multi-table write is a transaction.
    pub fn db(&self) -> MutexGuard<'_, ServiceDb> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Directory exports go to when none is given.
    pub fn backup_dir(&self) -> Result<PathBuf, ConfigError> {
        match self.config.backup_dir.as_deref() {
            Some(dir) => Ok(expand_home(dir)),
            None => Ok(config_dir()?.join("backups")),
        }
    }
}

/// `~/.aquaservice`
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
    Ok(home.join(".aquaservice"))
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// `~/.aquaservice/config.json`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json"))
}

/// Load configuration from an explicit file. A missing file yields defaults.
///
/// Nothing is logged here: this runs before the logger is configured.
pub fn load_config_from(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(config_path)
        .map_err(|e| ConfigError::Read(config_path.to_path_buf(), e))?;

    let config: Config = serde_json::from_str(&content)
        .map_err(|e| ConfigError::Parse(config_path.to_path_buf(), e))?;

    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.default_cycle_months == 0 {
        return Err(ConfigError::InvalidValue(
            "defaultCycleMonths",
            "must be at least 1".to_string(),
        ));
    }
    if config.due_soon_days < 0 || config.due_soon_days >= config.upcoming_days {
        return Err(ConfigError::InvalidValue(
            "dueSoonDays",
            format!(
                "must be non-negative and below upcomingDays ({})",
                config.upcoming_days
            ),
        ));
    }
    if config.max_import_bytes == 0 || config.max_import_rows == 0 {
        return Err(ConfigError::InvalidValue(
            "maxImportBytes/maxImportRows",
            "must be positive".to_string(),
        ));
    }
    Ok(())
}
