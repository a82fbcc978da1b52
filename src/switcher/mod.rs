//! Database switch orchestrator
//!
//! Runs one user action to completion, in a fixed order:
//! 1. Resolve: look the database up and expand its prerequisite chain
//! 2. Install: extract the prerequisite (if any), then the database
//! 3. Normalize: lift a nested payload to the root (custom imports only)
//! 4. Markers: clear every detector file, write the active one
//! 5. Configs: regenerate both loader configs for the database family
//! 6. Verify: the setup file must be at the root (custom imports only)
//!
//! The first failure aborts the remaining steps. Nothing is rolled back, so
//! a failed extraction can leave the data folder as a partial overlay.
//! Operations must not run concurrently against the same game folder; the
//! `&self` receivers are for sharing the catalog, not for parallel switches.

pub mod progress;

pub use progress::{ProgressCallback, ProgressEvent};

use std::cell::Cell;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::archive::{self, ExtractProgress};
use crate::catalog::{Catalog, Database, CUSTOM_DATABASE_NAME};
use crate::detector;
use crate::error::{IoResultExt, SwitchError};
use crate::loader::{
    update_config_file, GameLayout, FONTS_FOLDER_NAME, PLAYER_SETUP_FILENAME,
};
use crate::normalize::FolderNormalizer;
use crate::paths::contains_file_case_insensitive;

/// Result of a completed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// A catalog database is now active
    Switched { name: String, label: String },
    /// A custom archive is now active
    Imported { label: String },
    /// The data folder was saved as a custom archive
    Exported { label: String, path: PathBuf },
}

impl SwitchOutcome {
    /// Status text shown to the user.
    pub fn message(&self) -> String {
        match self {
            SwitchOutcome::Switched { label, .. } => format!("{} database successfully loaded!", label),
            SwitchOutcome::Imported { .. } => "Custom database successfully loaded!".to_string(),
            SwitchOutcome::Exported { .. } => "Custom database successfully saved!".to_string(),
        }
    }
}

/// Status text for either outcome of an operation.
pub fn status_message(result: &Result<SwitchOutcome, SwitchError>) -> String {
    match result {
        Ok(outcome) => outcome.message(),
        Err(e) => e.to_string(),
    }
}

/// Installs, imports and exports databases for one game folder.
pub struct Switcher {
    catalog: Catalog,
    layout: GameLayout,
    progress: Option<ProgressCallback>,
}

impl Switcher {
    pub fn new(catalog: Catalog, layout: GameLayout) -> Self {
        Self {
            catalog,
            layout,
            progress: None,
        }
    }

    /// Sets the observer for progress events.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn layout(&self) -> &GameLayout {
        &self.layout
    }

    fn report(&self, percent: u8, message: &str) {
        if let Some(ref callback) = self.progress {
            callback(ProgressEvent {
                percent,
                message: message.to_string(),
            });
        }
    }

    /// Extracts one database, reporting progress within `start..end`.
    /// Top-level entries named in `keep` survive a wipe.
    fn install_database(
        &self,
        database: &Database,
        keep: &[&str],
        start: u8,
        end: u8,
    ) -> Result<(), SwitchError> {
        info!(
            "Installing {} (wipe: {})",
            database.name, database.delete_data_folder
        );
        let bytes = database.archive.load()?;

        let last_percent = Cell::new(start);
        let message = format!("Extracting {}", database.label);
        let on_progress = |p: ExtractProgress| {
            let percent = progress::scale(start, end, p.entries_done, p.total_entries);
            if percent != last_percent.get() {
                last_percent.set(percent);
                self.report(percent, &message);
            }
        };

        let files = archive::install(
            &bytes,
            &self.layout.data_dir,
            database.delete_data_folder,
            keep,
            Some(&on_progress),
        )?;
        info!("Installed {} files from {}", files, database.name);
        Ok(())
    }

    /// Rewrites both loader configs for `database`.
    fn update_configs(&self, database: &Database) -> Result<(), SwitchError> {
        update_config_file(&self.layout.loader_config, database, false)?;
        update_config_file(&self.layout.loader_custom_config, database, true)?;
        Ok(())
    }

    /// Switches the data folder to the catalog database `name`.
    pub fn switch(&self, name: &str) -> Result<SwitchOutcome, SwitchError> {
        self.report(0, "Loading selected database");

        let chain = self.catalog.prerequisite_chain(name)?;
        let Some((target, prerequisites)) = chain.split_last() else {
            return Err(SwitchError::NotFound(name.to_string()));
        };
        info!(
            "Switching to {} ({} prerequisite(s))",
            target.name,
            prerequisites.len()
        );

        let mut start = 0;
        for prerequisite in prerequisites {
            self.install_database(prerequisite, &[], start, progress::PREREQUISITE_DONE)?;
            start = progress::PREREQUISITE_DONE;
        }
        self.install_database(target, &[], start, progress::INSTALL_DONE)?;

        detector::reconcile(
            &self.layout.data_dir,
            self.catalog.marker_names(),
            &target.name,
            &target.label,
        )?;
        self.update_configs(target)?;

        self.report(progress::COMPLETE, "Database loaded");
        Ok(SwitchOutcome::Switched {
            name: target.name.clone(),
            label: target.label.clone(),
        })
    }

    /// Imports a custom database archive from `archive_path`.
    pub fn import(&self, archive_path: &Path) -> Result<SwitchOutcome, SwitchError> {
        let bytes = std::fs::read(archive_path).with_path("read", archive_path)?;
        let label = archive_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Custom".to_string());
        self.import_database(&Database::custom(label, bytes))
    }

    /// Installs a custom database and flattens whatever layout it came in.
    pub fn import_database(&self, database: &Database) -> Result<SwitchOutcome, SwitchError> {
        self.report(0, "Loading custom database");
        self.install_database(database, &[FONTS_FOLDER_NAME], 0, progress::INSTALL_DONE)?;

        let data_dir = &self.layout.data_dir;
        let normalizer =
            FolderNormalizer::new(data_dir.clone(), PLAYER_SETUP_FILENAME, &[FONTS_FOLDER_NAME]);
        let root = normalizer.locate_data_root(data_dir)?;
        if root != *data_dir {
            normalizer.relocate(&root)?;
        }
        self.report(progress::NORMALIZE_DONE, "Arranging database folders");

        // Archives saved by `export` carry the name they were saved under
        let label = detector::read_marker(data_dir, CUSTOM_DATABASE_NAME)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| database.label.clone());

        detector::reconcile(data_dir, self.catalog.marker_names(), CUSTOM_DATABASE_NAME, &label)?;
        self.update_configs(database)?;

        if !contains_file_case_insensitive(data_dir, PLAYER_SETUP_FILENAME) {
            warn!("No {} in {}", PLAYER_SETUP_FILENAME, data_dir.display());
            return Err(SwitchError::MissingMarker {
                marker: PLAYER_SETUP_FILENAME.to_string(),
            });
        }

        self.report(progress::COMPLETE, "Custom database loaded");
        Ok(SwitchOutcome::Imported { label })
    }

    /// Saves the current data folder as a custom database archive.
    ///
    /// Bare names are stored in the custom databases folder.
    pub fn export(&self, destination: &Path) -> Result<SwitchOutcome, SwitchError> {
        let data_dir = &self.layout.data_dir;
        if !self.layout.has_data_folder() {
            return Err(SwitchError::NoDataFolder(data_dir.clone()));
        }

        let path = self.layout.custom_database_path(destination);
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Custom".to_string());

        self.report(20, "Saving custom database");
        detector::reconcile(data_dir, self.catalog.marker_names(), CUSTOM_DATABASE_NAME, &label)?;
        self.report(40, "Saving custom database");

        archive::export_directory(data_dir, &path)?;

        self.report(progress::COMPLETE, "Custom database saved");
        Ok(SwitchOutcome::Exported { label, path })
    }

    /// Returns `(name, label)` of the installed database, if any.
    pub fn active_database(&self) -> Option<(String, String)> {
        detector::active_marker(&self.layout.data_dir, self.catalog.marker_names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::build_zip;
    use crate::catalog::{test_database, DatabaseFamily};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        let mut cm89 = test_database(
            "cm89_database",
            None,
            true,
            build_zip(&[
                ("player_setup.cfg", "setup89"),
                ("base.dat", "89"),
                ("shared.dat", "89"),
            ]),
        );
        cm89.family = DatabaseFamily::Cm89;

        let mut cm93 = test_database(
            "cm93_database",
            Some("cm89_database"),
            false,
            build_zip(&[("shared.dat", "93"), ("Pictures/", ""), ("Pictures/kit.rgn", "kit")]),
        );
        cm93.family = DatabaseFamily::Cm93;

        let patched = test_database(
            "patched_database",
            None,
            false,
            build_zip(&[("player_setup.cfg", "patched"), ("patch.dat", "p")]),
        );

        Catalog::new(vec![cm89, cm93, patched]).unwrap()
    }

    fn switcher(root: &Path) -> Switcher {
        Switcher::new(catalog(), GameLayout::new(root.to_path_buf()))
    }

    fn markers(switcher: &Switcher) -> Vec<String> {
        let data = &switcher.layout().data_dir;
        switcher
            .catalog()
            .marker_names()
            .filter(|n| detector::marker_path(data, n).exists())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_switch_with_prerequisite() {
        let dir = TempDir::new().unwrap();
        let switcher = switcher(dir.path());
        let data = &switcher.layout().data_dir;
        fs::create_dir_all(data).unwrap();
        fs::write(data.join("stale.dat"), "old").unwrap();
        detector::write_marker(data, "patched_database", "PATCHED_DATABASE").unwrap();

        let outcome = switcher.switch("cm93_database").unwrap();

        assert_eq!(outcome.message(), "CM93_DATABASE database successfully loaded!");
        assert_eq!(fs::read_to_string(data.join("base.dat")).unwrap(), "89");
        assert_eq!(fs::read_to_string(data.join("shared.dat")).unwrap(), "93");
        assert!(data.join("Pictures/kit.rgn").is_file());
        assert!(!data.join("stale.dat").exists());
        assert_eq!(markers(&switcher), vec!["cm93_database"]);

        let config = fs::read_to_string(&switcher.layout().loader_config).unwrap();
        assert!(config.contains("Year = 1993\r\n"));
        assert!(config.contains("PatchFileDirectory = Patches\\CM93\r\n"));
        let custom = fs::read_to_string(&switcher.layout().loader_custom_config).unwrap();
        assert!(custom.contains("Year = 1993\r\n"));
    }

    #[test]
    fn test_overlay_switch_keeps_previous_files() {
        let dir = TempDir::new().unwrap();
        let switcher = switcher(dir.path());
        let data = &switcher.layout().data_dir;

        switcher.switch("cm89_database").unwrap();
        switcher.switch("patched_database").unwrap();

        assert_eq!(fs::read_to_string(data.join("base.dat")).unwrap(), "89");
        assert_eq!(fs::read_to_string(data.join("player_setup.cfg")).unwrap(), "patched");
        assert!(data.join("patch.dat").is_file());
        assert_eq!(markers(&switcher), vec!["patched_database"]);
        assert_eq!(
            switcher.active_database(),
            Some(("patched_database".to_string(), "PATCHED_DATABASE".to_string()))
        );

        let config = fs::read_to_string(&switcher.layout().loader_config).unwrap();
        assert!(config.contains("Year = 2001\r\n"));
        assert_eq!(config.matches("Year =").count(), 1);
    }

    #[test]
    fn test_unknown_database_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let switcher = switcher(dir.path());

        let result = switcher.switch("missing_database");

        assert!(matches!(result, Err(SwitchError::NotFound(ref n)) if n == "missing_database"));
        assert_eq!(status_message(&result), "Unknown database: missing_database");
        assert!(!switcher.layout().data_dir.exists());
        assert!(!switcher.layout().loader_config.exists());
    }

    #[test]
    fn test_import_nested_export_folder() {
        let dir = TempDir::new().unwrap();
        let switcher = switcher(dir.path());
        let data = &switcher.layout().data_dir;
        switcher.switch("cm89_database").unwrap();

        let archive = dir.path().join("Season 2021.zip");
        fs::write(
            &archive,
            build_zip(&[
                ("Export/", ""),
                ("Export/Data/", ""),
                ("Export/Data/player_setup.cfg", "custom"),
                ("Export/Data/index.dat", "idx"),
                ("Export/Data/Pictures/a.rgn", "a"),
                ("Fonts/font.ttf", "font"),
            ]),
        )
        .unwrap();

        let outcome = switcher.import(&archive).unwrap();

        assert_eq!(
            outcome,
            SwitchOutcome::Imported {
                label: "Season 2021".to_string()
            }
        );
        assert_eq!(outcome.message(), "Custom database successfully loaded!");
        assert_eq!(fs::read_to_string(data.join("player_setup.cfg")).unwrap(), "custom");
        assert!(data.join("index.dat").is_file());
        assert!(data.join("Pictures/a.rgn").is_file());
        assert_eq!(fs::read_to_string(data.join("Fonts/font.ttf")).unwrap(), "font");
        assert!(!data.join("Export").exists());
        assert!(!data.join("base.dat").exists());
        assert_eq!(markers(&switcher), vec![CUSTOM_DATABASE_NAME]);
        assert_eq!(
            detector::read_marker(data, CUSTOM_DATABASE_NAME).as_deref(),
            Some("Season 2021")
        );
    }

    #[test]
    fn test_import_keeps_existing_fonts_folder() {
        let dir = TempDir::new().unwrap();
        let switcher = switcher(dir.path());
        let data = &switcher.layout().data_dir;
        switcher.switch("cm89_database").unwrap();
        fs::create_dir_all(data.join("Fonts")).unwrap();
        fs::write(data.join("Fonts/font.ttf"), "font").unwrap();

        let archive = dir.path().join("No Fonts.zip");
        fs::write(
            &archive,
            build_zip(&[
                ("Export/Data/player_setup.cfg", "custom"),
                ("Export/Data/index.dat", "idx"),
            ]),
        )
        .unwrap();

        switcher.import(&archive).unwrap();

        assert_eq!(fs::read_to_string(data.join("Fonts/font.ttf")).unwrap(), "font");
        assert_eq!(fs::read_to_string(data.join("player_setup.cfg")).unwrap(), "custom");
        assert!(data.join("index.dat").is_file());
        assert!(!data.join("base.dat").exists());
        assert!(!data.join("Export").exists());
    }

    #[test]
    fn test_switch_wipe_does_not_keep_fonts() {
        let dir = TempDir::new().unwrap();
        let switcher = switcher(dir.path());
        let data = &switcher.layout().data_dir;
        fs::create_dir_all(data.join("Fonts")).unwrap();
        fs::write(data.join("Fonts/font.ttf"), "font").unwrap();

        switcher.switch("cm89_database").unwrap();

        assert!(!data.join("Fonts").exists());
    }

    #[test]
    fn test_import_without_setup_file() {
        let dir = TempDir::new().unwrap();
        let switcher = switcher(dir.path());

        let archive = dir.path().join("broken.zip");
        fs::write(&archive, build_zip(&[("Stuff/readme.txt", "nothing here")])).unwrap();

        let result = switcher.import(&archive);

        assert!(matches!(result, Err(SwitchError::MissingMarker { .. })));
        assert_eq!(status_message(&result), "No valid database found!");
    }

    #[test]
    fn test_import_invalid_archive_keeps_data() {
        let dir = TempDir::new().unwrap();
        let switcher = switcher(dir.path());
        switcher.switch("patched_database").unwrap();

        let archive = dir.path().join("garbage.zip");
        fs::write(&archive, "not a zip").unwrap();

        let result = switcher.import(&archive);

        assert!(matches!(result, Err(SwitchError::InvalidArchive(_))));
        assert!(switcher.layout().data_dir.join("patch.dat").is_file());
        assert_eq!(markers(&switcher), vec!["patched_database"]);
    }

    #[test]
    fn test_export_then_import_keeps_name() {
        let dir = TempDir::new().unwrap();
        let switcher = switcher(dir.path());
        switcher.switch("cm93_database").unwrap();

        let outcome = switcher.export(Path::new("My Career")).unwrap();
        let SwitchOutcome::Exported { label, path } = outcome.clone() else {
            panic!("expected export outcome, got {:?}", outcome);
        };
        assert_eq!(label, "My Career");
        assert_eq!(path, switcher.layout().custom_databases_dir.join("My Career.zip"));
        assert_eq!(outcome.message(), "Custom database successfully saved!");
        assert_eq!(markers(&switcher), vec![CUSTOM_DATABASE_NAME]);

        switcher.switch("patched_database").unwrap();

        // Copy under another file name: the embedded marker wins
        let copy = dir.path().join("renamed.zip");
        fs::copy(&path, &copy).unwrap();
        let imported = switcher.import(&copy).unwrap();

        assert_eq!(
            imported,
            SwitchOutcome::Imported {
                label: "My Career".to_string()
            }
        );
        let data = &switcher.layout().data_dir;
        assert_eq!(fs::read_to_string(data.join("shared.dat")).unwrap(), "93");
        assert!(!data.join("patch.dat").exists());
        assert_eq!(markers(&switcher), vec![CUSTOM_DATABASE_NAME]);
    }

    #[test]
    fn test_export_without_data_folder() {
        let dir = TempDir::new().unwrap();
        let switcher = switcher(dir.path());

        let result = switcher.export(Path::new("nothing"));

        assert!(matches!(result, Err(SwitchError::NoDataFolder(_))));
    }

    #[test]
    fn test_progress_reaches_checkpoints() {
        let dir = TempDir::new().unwrap();
        let events: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let switcher = switcher(dir.path()).with_progress(Arc::new(move |e: ProgressEvent| {
            sink.lock().unwrap().push(e.percent);
        }));

        switcher.switch("cm93_database").unwrap();

        let percents = events.lock().unwrap().clone();
        assert_eq!(percents.first(), Some(&0));
        assert_eq!(percents.last(), Some(&progress::COMPLETE));
        assert!(percents.contains(&progress::PREREQUISITE_DONE));
        assert!(percents.contains(&progress::INSTALL_DONE));
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    }
}
