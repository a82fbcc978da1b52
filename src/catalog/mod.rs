//! Database catalog.
//!
//! The catalog is a flat, immutable table of `Database` entries keyed by name.
//! Prerequisites are stored as keys into the same table rather than owned
//! links, which lets `Catalog::new` reject unknown keys and cycles up front.

mod builtin;
mod manifest;

pub use builtin::builtin_catalog;
pub use manifest::{load_manifest, CatalogManifest, ManifestEntry};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{IoResultExt, SwitchError};

/// Name of the custom database slot. Also used for its marker file.
pub const CUSTOM_DATABASE_NAME: &str = "custom_database";

/// Database families. Each family selects a different set of loader directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DatabaseFamily {
    /// CM 01/02 databases (original, patched and data updates)
    Standard,
    /// 1989/90 conversion
    Cm89,
    /// 1993/94 conversion
    Cm93,
    /// 1995/96 conversion
    Cm95,
    /// Championship Manager 3 conversion
    Cm3,
}

impl DatabaseFamily {
    pub const ALL: [DatabaseFamily; 5] = [
        DatabaseFamily::Standard,
        DatabaseFamily::Cm89,
        DatabaseFamily::Cm93,
        DatabaseFamily::Cm95,
        DatabaseFamily::Cm3,
    ];

    /// Game start year the loader must use for this family.
    pub fn start_year(&self) -> u16 {
        match self {
            DatabaseFamily::Standard => 2001,
            DatabaseFamily::Cm89 => 1989,
            DatabaseFamily::Cm93 => 1993,
            DatabaseFamily::Cm95 => 1995,
            DatabaseFamily::Cm3 => 1999,
        }
    }

    /// Patch folder, relative to the game root, holding this family's patches.
    pub fn patch_directory(&self) -> &'static str {
        match self {
            DatabaseFamily::Standard => "Patches",
            DatabaseFamily::Cm89 => "Patches\\CM89",
            DatabaseFamily::Cm93 => "Patches\\CM93",
            DatabaseFamily::Cm95 => "Patches\\CM95",
            DatabaseFamily::Cm3 => "Patches\\CM3",
        }
    }

    /// Conversions depend on their patches being applied at startup.
    pub fn auto_load_patches(&self) -> bool {
        !matches!(self, DatabaseFamily::Standard)
    }
}

/// Where a database's zip archive comes from.
#[derive(Debug, Clone)]
pub enum ArchiveSource {
    /// Archive bundled on disk, read when the database is installed.
    Bundled(PathBuf),
    /// Archive already held in memory (custom imports).
    Bytes(Arc<[u8]>),
}

impl ArchiveSource {
    /// Returns the raw archive bytes.
    pub fn load(&self) -> Result<Arc<[u8]>, SwitchError> {
        match self {
            ArchiveSource::Bundled(path) => {
                let bytes = std::fs::read(path).with_path("read archive", path)?;
                Ok(Arc::from(bytes))
            }
            ArchiveSource::Bytes(bytes) => Ok(Arc::clone(bytes)),
        }
    }
}

/// A named, versioned game data set.
#[derive(Debug, Clone)]
pub struct Database {
    /// Stable identifier, used as the marker file name and as the lookup key.
    pub name: String,
    /// Human readable display text.
    pub label: String,
    pub family: DatabaseFamily,
    pub archive: ArchiveSource,
    /// Key of a database that must be installed immediately before this one.
    pub prerequisite: Option<String>,
    /// Wipe the data folder before extracting this database.
    pub delete_data_folder: bool,
}

impl Database {
    /// Builds the custom database slot around a user supplied archive.
    pub fn custom(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: CUSTOM_DATABASE_NAME.to_string(),
            label: label.into(),
            family: DatabaseFamily::Standard,
            archive: ArchiveSource::Bytes(Arc::from(bytes)),
            prerequisite: None,
            delete_data_folder: true,
        }
    }

    /// File name of the detector marker for this database.
    pub fn marker_file_name(&self) -> String {
        format!("{}.txt", self.name)
    }
}

/// Catalog validation errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Duplicate database name: {0}")]
    DuplicateName(String),

    #[error("Database '{database}' requires unknown prerequisite '{prerequisite}'")]
    UnknownPrerequisite {
        database: String,
        prerequisite: String,
    },

    #[error("Prerequisite cycle detected at database '{0}'")]
    CyclicPrerequisite(String),

    #[error("'{0}' is reserved for the custom database slot")]
    ReservedName(String),

    #[error("Failed to read catalog manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog manifest {}: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Ordered, immutable table of built-in databases.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<Database>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate names, dangling prerequisites
    /// and prerequisite cycles.
    pub fn new(entries: Vec<Database>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, db) in entries.iter().enumerate() {
            if db.name == CUSTOM_DATABASE_NAME {
                return Err(CatalogError::ReservedName(db.name.clone()));
            }
            if index.insert(db.name.clone(), i).is_some() {
                return Err(CatalogError::DuplicateName(db.name.clone()));
            }
        }

        for db in &entries {
            if let Some(prereq) = &db.prerequisite {
                if !index.contains_key(prereq) {
                    return Err(CatalogError::UnknownPrerequisite {
                        database: db.name.clone(),
                        prerequisite: prereq.clone(),
                    });
                }
            }
        }

        let catalog = Self { entries, index };
        for db in &catalog.entries {
            catalog.walk_chain(&db.name)?;
        }
        Ok(catalog)
    }

    /// Follows prerequisite links from `name`, target first.
    fn walk_chain(&self, name: &str) -> Result<Vec<&Database>, CatalogError> {
        let mut chain: Vec<&Database> = Vec::new();
        let mut current = self.get(name);

        while let Some(db) = current {
            if chain.iter().any(|seen| seen.name == db.name) {
                return Err(CatalogError::CyclicPrerequisite(db.name.clone()));
            }
            chain.push(db);
            current = db.prerequisite.as_deref().and_then(|p| self.get(p));
        }

        Ok(chain)
    }

    /// Looks up a database by name.
    pub fn get(&self, name: &str) -> Option<&Database> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Returns the databases to install for `name`, base first.
    pub fn prerequisite_chain(&self, name: &str) -> Result<Vec<&Database>, SwitchError> {
        if self.get(name).is_none() {
            return Err(SwitchError::NotFound(name.to_string()));
        }
        let mut chain = self.walk_chain(name)?;
        chain.reverse();
        Ok(chain)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Database> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every name that can own a marker file, including the custom slot.
    pub fn marker_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .map(|db| db.name.as_str())
            .chain(std::iter::once(CUSTOM_DATABASE_NAME))
    }

    /// Loads `<resources>/catalog.json` if present, otherwise the built-in table.
    pub fn load(resources_dir: &Path) -> Result<Self, CatalogError> {
        let manifest = resources_dir.join("catalog.json");
        if manifest.exists() {
            load_manifest(&manifest, resources_dir)
        } else {
            builtin_catalog(resources_dir)
        }
    }
}

#[cfg(test)]
pub(crate) fn test_database(name: &str, prerequisite: Option<&str>, delete: bool, bytes: Vec<u8>) -> Database {
    Database {
        name: name.to_string(),
        label: name.to_uppercase(),
        family: DatabaseFamily::Standard,
        archive: ArchiveSource::Bytes(Arc::from(bytes)),
        prerequisite: prerequisite.map(str::to_string),
        delete_data_folder: delete,
    }
}
