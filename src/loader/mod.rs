//! Game installation layout and loader configuration.
//!
//! This module handles:
//! - Locating the data folder and loader config files under the game root
//! - Regenerating both loader configs for the active database family

pub mod config;
mod encoding;

pub use config::{generate_lines, update_config_file, DEFAULT_LOADER_LINES};
pub use encoding::decode_config_bytes;

use std::path::{Path, PathBuf};

/// Data folder name under the game root.
pub const DATA_FOLDER_NAME: &str = "Data";
/// Loader config used by the standard launcher.
pub const LOADER_CONFIG_FILENAME: &str = "CM0102Loader.ini";
/// Loader config used by the custom launcher profile.
pub const LOADER_CUSTOM_CONFIG_FILENAME: &str = "CM0102LoaderCustom.ini";
/// File every valid data folder contains at its root.
pub const PLAYER_SETUP_FILENAME: &str = "player_setup.cfg";
/// Folder that survives cleanup after a custom import.
pub const FONTS_FOLDER_NAME: &str = "Fonts";
/// Default location for exported custom databases.
pub const CUSTOM_DATABASES_FOLDER_NAME: &str = "Custom Databases";

/// Paths of a game installation.
#[derive(Debug, Clone)]
pub struct GameLayout {
    /// Root directory of the game installation.
    pub root: PathBuf,
    /// Path to the active data folder.
    pub data_dir: PathBuf,
    /// Path to the standard loader config.
    pub loader_config: PathBuf,
    /// Path to the custom loader config.
    pub loader_custom_config: PathBuf,
    /// Path to the custom databases folder.
    pub custom_databases_dir: PathBuf,
}

impl GameLayout {
    /// Creates path references for a game installed at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self {
            data_dir: root.join(DATA_FOLDER_NAME),
            loader_config: root.join(LOADER_CONFIG_FILENAME),
            loader_custom_config: root.join(LOADER_CUSTOM_CONFIG_FILENAME),
            custom_databases_dir: root.join(CUSTOM_DATABASES_FOLDER_NAME),
            root,
        }
    }

    /// Checks whether a data folder exists.
    pub fn has_data_folder(&self) -> bool {
        self.data_dir.is_dir()
    }

    /// Resolves an export destination.
    ///
    /// Bare names land in the custom databases folder; `.zip` is added when
    /// the name has no extension.
    pub fn custom_database_path(&self, name: &Path) -> PathBuf {
        let mut path = if name.is_absolute() || name.parent().is_some_and(|p| !p.as_os_str().is_empty()) {
            name.to_path_buf()
        } else {
            self.custom_databases_dir.join(name)
        };
        if path.extension().is_none() {
            path.set_extension("zip");
        }
        path
    }

    /// Resolves an import source, falling back to the custom databases
    /// folder for bare names that don't exist in the working directory.
    pub fn resolve_import_path(&self, name: &Path) -> PathBuf {
        if name.exists() {
            return name.to_path_buf();
        }
        let candidate = self.custom_database_path(name);
        if candidate.exists() {
            candidate
        } else {
            name.to_path_buf()
        }
    }
}
