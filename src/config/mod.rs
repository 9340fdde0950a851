//! Configuration module for DirVis-RS
//!
//! Settings for the processing network, the command queue, logging and the
//! frame loop, persisted as JSON in the platform data directory:
//!
//! - **Linux**: `~/.local/share/dev.dirvis.dirvis-rs/`
//! - **macOS**: `~/Library/Application Support/dev.dirvis.dirvis-rs/`
//! - **Windows**: `%APPDATA%\dev.dirvis.dirvis-rs\`
//!
//! Explicit files passed with `--config` may be JSON or TOML, chosen by
//! extension.
//!
//! # Example
//!
//! ```ignore
//! use dirvis_rs::config::AppConfig;
//!
//! let mut config = AppConfig::load_or_default();
//! config.frames.frame_count = 600;
//! config.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{DirVisError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.dirvis.dirvis-rs";

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.json";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        DirVisError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            DirVisError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the settings file
pub fn settings_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(SETTINGS_FILE))
}

// ==================== App Config ====================

/// Supported on-disk formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension; anything but `.toml` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version for future migration support
    #[serde(default = "default_config_version")]
    pub version: u32,

    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub commands: CommandSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub frames: FrameSettings,
}

fn default_config_version() -> u32 {
    1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            network: NetworkSettings::default(),
            commands: CommandSettings::default(),
            logging: LoggingSettings::default(),
            frames: FrameSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load settings from the default location; a missing file yields defaults
    pub fn load() -> Result<Self> {
        let path = settings_path().ok_or_else(|| {
            DirVisError::Config("Could not determine settings path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load settings, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Load settings from an explicit JSON or TOML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: Self = match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::from_str(&content).map_err(DirVisError::from),
            ConfigFormat::Toml => toml::from_str(&content).map_err(DirVisError::from),
        }
        .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(SETTINGS_FILE))
    }

    /// Save settings to an explicit JSON or TOML file
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| DirVisError::Serialization(e.to_string()))?,
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| DirVisError::Serialization(e.to_string()))?,
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("settings")), ConfigFormat::Json);
    }

    #[test]
    fn test_empty_json_is_default() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.network, NetworkSettings::default());
        assert_eq!(config.frames.frame_count, 120);
    }

    #[test]
    fn test_toml_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [network]
            idle_wait_ms = 10
            start_on_launch = false

            [logging]
            filter = "warn"
            "#,
        )
        .unwrap();
        assert_eq!(config.network.idle_wait_ms, 10);
        assert!(!config.network.start_on_launch);
        assert_eq!(config.logging.filter, "warn");
        assert_eq!(config.commands, CommandSettings::default());
    }
}
