//! Application configuration
//!
//! Settings are stored as TOML. Every section and field is optional; missing
//! values fall back to the defaults below.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::camera::CameraSettings;
use crate::detection::ocr::OcrSettings;
use crate::detection::plates::PlateGeometry;
use crate::legality::LegalitySettings;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Plate footprint used by the region filter
    pub geometry: PlateGeometry,
    /// OCR backend settings
    pub ocr: OcrSettings,
    /// Camera sampling settings
    pub camera: CameraSettings,
    /// Activity log location
    pub storage: StorageSettings,
    /// Allow-list and default region
    pub legality: LegalitySettings,
}

/// Storage-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite file holding the activity log
    pub database_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: data_dir()
                .map(|dir| dir.join("activity.db"))
                .unwrap_or_else(|| PathBuf::from("activity.db")),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "platesight", "PlateSight")
}

/// Platform data directory for the application (not created)
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Default location of `config.toml` (not created)
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig =
        toml::from_str(&content).with_context(|| format!("Invalid config {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load an explicit config file, or the default one if it exists, or defaults.
///
/// An explicitly named file must exist; the default location may be absent.
pub fn load_or_default(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Some(path) = default_config_path().filter(|p| p.exists()) {
        let config = load_config(&path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    info!("Using default configuration");
    Ok(AppConfig::default())
}
