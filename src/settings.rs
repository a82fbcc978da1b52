//! Settings management for cmswitch
//!
//! Stores user preferences in ~/.config/cmswitch/settings.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User settings for cmswitch
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    /// Game installation directory (holds the Data folder and loader configs)
    #[serde(default)]
    pub game_dir: Option<PathBuf>,

    /// Folder holding the bundled database archives
    #[serde(default)]
    pub resources_dir: Option<PathBuf>,
}

impl Settings {
    /// Get the config directory path (~/.config/cmswitch)
    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("cmswitch");

        Ok(config_dir)
    }

    /// Get the settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.json"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let loaded = Self::settings_path().and_then(|path| Self::load_from(&path));
        match loaded {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Could not load settings: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Load settings from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::settings_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save settings to `path`, creating its parent folder
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Resources default to a `resources` folder inside the game directory
    pub fn effective_resources_dir(&self, game_dir: &Path) -> PathBuf {
        self.resources_dir
            .clone()
            .unwrap_or_else(|| game_dir.join("resources"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert!(settings.game_dir.is_none());
        assert!(settings.resources_dir.is_none());
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/settings.json");
        let settings = Settings {
            game_dir: Some("/games/cm0102".into()),
            resources_dir: None,
        };

        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let loaded = Settings::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "game_dir": "/g", "legacy": 1 }"#).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.game_dir, Some(PathBuf::from("/g")));
    }

    #[test]
    fn test_effective_resources_dir() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.effective_resources_dir(Path::new("/g")),
            PathBuf::from("/g/resources")
        );

        settings.resources_dir = Some("/res".into());
        assert_eq!(
            settings.effective_resources_dir(Path::new("/g")),
            PathBuf::from("/res")
        );
    }
}
