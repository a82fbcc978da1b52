//! JSON catalog manifests.
//!
//! A `catalog.json` placed in the resources folder replaces the built-in
//! table. Archive paths are resolved relative to the resources folder.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ArchiveSource, Catalog, CatalogError, Database, DatabaseFamily};

/// Top-level manifest document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub databases: Vec<ManifestEntry>,
}

/// A single manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub label: String,
    #[serde(default = "default_family")]
    pub family: DatabaseFamily,
    /// Archive file name; defaults to `<name>.zip`
    #[serde(default)]
    pub archive: Option<String>,
    #[serde(default)]
    pub prerequisite: Option<String>,
    #[serde(default)]
    pub delete_data_folder: bool,
}

fn default_family() -> DatabaseFamily {
    DatabaseFamily::Standard
}

/// Reads and validates a manifest.
pub fn load_manifest(path: &Path, resources_dir: &Path) -> Result<Catalog, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;

    let manifest: CatalogManifest =
        serde_json::from_str(&content).map_err(|source| CatalogError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;

    let entries = manifest
        .databases
        .into_iter()
        .map(|entry| {
            let archive = entry
                .archive
                .unwrap_or_else(|| format!("{}.zip", entry.name));
            Database {
                archive: ArchiveSource::Bundled(resources_dir.join(archive)),
                name: entry.name,
                label: entry.label,
                family: entry.family,
                prerequisite: entry.prerequisite,
                delete_data_folder: entry.delete_data_folder,
            }
        })
        .collect();

    Catalog::new(entries)
}
