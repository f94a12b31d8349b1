//! Settings for the repository and audit layers
//!
//! Loaded from a JSON file. Every section falls back to defaults so a
//! partial (or absent) file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RepoError;

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "AUDITREPO_CONFIG";

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "AUDITREPO_LOG";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output (default)
    #[default]
    Pretty,
    /// Single-line output without colors
    Compact,
    /// JSON lines
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Filter directive, e.g. "info,auditrepo=debug"
    #[serde(default = "default_log_filter")]
    pub filter: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

/// Settings for the in-memory session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// JSON file the store is loaded from and flushed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_file: Option<PathBuf>,

    /// Flush the snapshot after every write
    #[serde(default)]
    pub flush_on_write: bool,
}

/// Audit capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Attach a change summary when both snapshots are captured
    #[serde(default = "default_true")]
    pub record_diff: bool,

    /// Descend into nested objects when summarising changes
    #[serde(default)]
    pub detailed_diff: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            record_diff: true,
            detailed_diff: false,
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub logging: LogSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub audit: AuditSettings,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            logging: LogSettings::default(),
            storage: StorageSettings::default(),
            audit: AuditSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or use defaults if the file doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self, RepoError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| RepoError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents)
                .map_err(|e| RepoError::Config(format!("Failed to parse settings file: {}", e)))?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Load settings named by `AUDITREPO_CONFIG`, applying `AUDITREPO_LOG`
    pub fn from_env() -> Result<Self, RepoError> {
        let mut settings = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load_or_create(Path::new(&path))?,
            Err(_) => Settings::default(),
        };

        if let Ok(filter) = std::env::var(LOG_ENV) {
            settings.logging.filter = filter;
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<(), RepoError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RepoError::Io(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| RepoError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| RepoError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
