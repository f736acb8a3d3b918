use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::store::{DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZES};

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_DB_FILE: &str = "catalog.db";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// User settings, stored as JSON in the platform config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite catalog; defaults to `catalog.db` in the data directory
    pub database_path: Option<PathBuf>,
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    pub grid_columns: usize,
    pub toast_seconds: u64,
    pub prefetch_timeout_seconds: u64,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: DEFAULT_PAGE_SIZES.to_vec(),
            grid_columns: 3,
            toast_seconds: 3,
            prefetch_timeout_seconds: 30,
            log_filter: "info,banknote_explorer=debug".to_string(),
        }
    }
}

/// A loaded config plus the reason it fell back to defaults, if it did.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub reset_reason: Option<String>,
}

impl AppConfig {
    /// Read the config at `path`. A missing file yields defaults silently; an
    /// unreadable or malformed one yields defaults plus a reason.
    pub fn load_from(path: &Path) -> LoadedConfig {
        if !path.exists() {
            return LoadedConfig {
                config: AppConfig::default(),
                reset_reason: None,
            };
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(ConfigError::from)
            .and_then(|json| serde_json::from_str::<AppConfig>(&json).map_err(ConfigError::from));
        match parsed {
            Ok(config) => LoadedConfig {
                config: config.sanitized(),
                reset_reason: None,
            },
            Err(e) => LoadedConfig {
                config: AppConfig::default(),
                reset_reason: Some(format!("{} ({})", e, path.display())),
            },
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Clamp values the UI cannot work with.
    pub fn sanitized(mut self) -> Self {
        self.page_size_options.retain(|&s| s > 0);
        if self.page_size_options.is_empty() {
            self.page_size_options = DEFAULT_PAGE_SIZES.to_vec();
        }
        if !self.page_size_options.contains(&self.page_size) {
            self.page_size = self.page_size_options[0];
        }
        self.grid_columns = self.grid_columns.max(1);
        self.toast_seconds = self.toast_seconds.max(1);
        self.prefetch_timeout_seconds = self.prefetch_timeout_seconds.max(1);
        self
    }

    /// Database path from the config, else the data-directory default.
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DEFAULT_DB_FILE)),
        }
    }
}

pub fn project_dirs() -> Result<directories::ProjectDirs, ConfigError> {
    directories::ProjectDirs::from("com", "banknote-explorer", "banknote-explorer")
        .ok_or(ConfigError::NoHomeDirectory)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
}
