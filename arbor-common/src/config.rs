//! Configuration loading and data folder resolution
//!
//! Services resolve their data folder with the following priority order:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "ARBOR_CONFIG";

/// Environment variable overriding the data folder
pub const DATA_DIR_ENV: &str = "ARBOR_DATA_DIR";

/// TOML configuration file contents
///
/// All fields are optional; environment variables take priority over any
/// value found here (see the per-field resolvers in the service crates).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// PlantNet API key for identification requests
    pub plantnet_api_key: Option<String>,
    /// PlantNet API base URL (override for testing)
    pub plantnet_base_url: Option<String>,
    /// Media store upload endpoint
    pub media_store_url: Option<String>,
    /// Shared secret gating catalog mutations
    pub admin_secret: Option<String>,
    /// Data folder holding the catalog database and record files
    pub data_dir: Option<String>,
    /// Listen address for the HTTP server
    pub bind_addr: Option<String>,
}

/// Locate the configuration file for the platform
///
/// `ARBOR_CONFIG` wins if set; otherwise `~/.config/arbor/arbor.toml`
/// (or the platform equivalent via `dirs::config_dir`).
pub fn config_file_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|d| d.join("arbor").join("arbor.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Load the TOML config, falling back to defaults when the file is absent
pub fn load_toml_config() -> Result<TomlConfig> {
    let path = config_file_path()?;
    load_toml_config_from(&path)
}

/// Load a TOML config from an explicit path (missing file is not an error)
pub fn load_toml_config_from(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse config failed: {}", e)))
}

/// Write a TOML config back to disk, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve the data folder following the documented priority order
pub fn resolve_data_dir(config: &TomlConfig) -> PathBuf {
    // Priority 1: Environment variable
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    // Priority 2: TOML config file
    if let Some(dir) = &config.data_dir {
        return PathBuf::from(dir);
    }

    // Priority 3: OS-dependent default
    default_data_dir()
}

/// OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("arbor"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/arbor"))
}

/// Data folder initializer
///
/// Creates the folder on startup if missing and hands out the well-known
/// paths inside it. The folder holds the catalog database plus the
/// record-store files.
pub struct DataDirInitializer {
    data_dir: PathBuf,
}

impl DataDirInitializer {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Create the data folder (and record subfolder) if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.records_dir())?;
        Ok(())
    }

    /// Path of the catalog SQLite database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("arbor.db")
    }

    /// Folder holding the persisted history/collection files
    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("records")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
