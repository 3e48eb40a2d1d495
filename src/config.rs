//! Configuration management - handles user settings and persistence

use crate::folders::FolderSet;
use crate::tags::TagIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    pub hotkey: String,
    pub folders: FolderSet,
    pub tags: BTreeMap<String, Vec<String>>,
    pub icon_path: String,
    pub auto_paste_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: "Ctrl+Space".to_string(),
            folders: FolderSet::default(),
            tags: BTreeMap::new(),
            icon_path: String::new(),
            auto_paste_enabled: false,
        }
    }
}

impl Config {
    /// Get the config directory path (OS-specific)
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("HyIO")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Load config from file, or return default
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => log::warn!("Ignoring unreadable config {}: {}", path.display(), e),
                },
                Err(e) => log::warn!("Could not read config {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    /// Save config to file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)?;

        Ok(())
    }

    /// On first run, watch the user's Pictures folder
    pub fn ensure_default_folder(&mut self) -> bool {
        if !self.folders.is_empty() {
            return false;
        }
        match dirs::picture_dir() {
            Some(pics) => self.folders.add(pics.to_string_lossy()),
            None => false,
        }
    }
}

/// Receives the tag index every time the engine changes it
pub trait TagPersist: Send + Sync {
    fn persist(&self, tags: &TagIndex) -> Result<(), ConfigError>;
}

/// Persistence that ignores every change, for in-memory use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPersist;

impl TagPersist for NoPersist {
    fn persist(&self, _tags: &TagIndex) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// The config file on disk, kept in memory between writes
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: Mutex<Config>,
}

impl ConfigStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut config = Config::load_from(&path);
        if config.ensure_default_folder() {
            log::info!("No folders configured, watching the Pictures folder");
        }
        Self {
            path,
            config: Mutex::new(config),
        }
    }

    pub fn open_default() -> Self {
        Self::open(Config::config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Config {
        self.config.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Change the config and write it out
    pub fn update<F>(&self, change: F) -> Result<Config, ConfigError>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut config);
        config.save_to(&self.path)?;
        Ok(config.clone())
    }
}

impl TagPersist for ConfigStore {
    fn persist(&self, tags: &TagIndex) -> Result<(), ConfigError> {
        self.update(|config| config.tags = tags.to_map()).map(|_| ())
    }
}
