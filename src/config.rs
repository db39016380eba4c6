// Configuration for the taskboard binary

use crate::storage::{FileStorage, MemoryStorage, SqliteStorage, Storage};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up inside the data directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Database file used by the SQLite backend
pub const SQLITE_FILE: &str = "taskboard.db";

/// Storage medium for the snapshot slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Nothing survives the process
    Memory,
    /// One JSON file per storage key
    #[default]
    File,
    /// Key-value table in a SQLite database
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Memory => write!(f, "memory"),
            Backend::File => write!(f, "file"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Settings read from `config.yaml`; every key is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: Backend,
    /// Seed example tasks when no snapshot exists yet
    pub seed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            seed: true,
        }
    }
}

impl Config {
    /// Load `path`, which must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    /// Load `<data_dir>/config.yaml` if present, defaults otherwise
    pub fn load_or_default(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            debug!(path = ?path, "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse YAML config")
    }

    /// Open the configured storage backend rooted at `data_dir`
    pub fn open_storage(&self, data_dir: &Path) -> Result<Box<dyn Storage>> {
        let storage: Box<dyn Storage> = match self.backend {
            Backend::Memory => Box::new(MemoryStorage::new()),
            Backend::File => Box::new(FileStorage::open(data_dir)?),
            Backend::Sqlite => Box::new(SqliteStorage::open(data_dir.join(SQLITE_FILE))?),
        };
        debug!(backend = %self.backend, dir = ?data_dir, "Opened storage backend");
        Ok(storage)
    }
}

/// `<platform data dir>/taskboard`
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("taskboard"))
        .ok_or_else(|| eyre!("Could not determine a data directory; pass --data-dir"))
}
