//! Built-in database table.
//!
//! Archives are expected as `<resources>/<name>.zip`.

use std::path::Path;

use super::{ArchiveSource, Catalog, CatalogError, Database, DatabaseFamily};

struct BuiltinEntry {
    name: &'static str,
    label: &'static str,
    family: DatabaseFamily,
    prerequisite: Option<&'static str>,
    delete_data_folder: bool,
}

const BUILTIN: &[BuiltinEntry] = &[
    BuiltinEntry {
        name: "original_database",
        label: "Original (3.9.60)",
        family: DatabaseFamily::Standard,
        prerequisite: None,
        delete_data_folder: true,
    },
    BuiltinEntry {
        name: "patched_database",
        label: "Patched (3.9.68)",
        family: DatabaseFamily::Standard,
        prerequisite: None,
        delete_data_folder: false,
    },
    BuiltinEntry {
        name: "april_database",
        label: "April 2022",
        family: DatabaseFamily::Standard,
        prerequisite: None,
        delete_data_folder: false,
    },
    BuiltinEntry {
        name: "october_database",
        label: "October 2021",
        family: DatabaseFamily::Standard,
        prerequisite: None,
        delete_data_folder: false,
    },
    BuiltinEntry {
        name: "november_database",
        label: "November 2020",
        family: DatabaseFamily::Standard,
        prerequisite: None,
        delete_data_folder: false,
    },
    BuiltinEntry {
        name: "luessenhoff_database",
        label: "Luessenhoff",
        family: DatabaseFamily::Standard,
        prerequisite: None,
        delete_data_folder: true,
    },
    BuiltinEntry {
        name: "cm89_database",
        label: "1989/90",
        family: DatabaseFamily::Cm89,
        prerequisite: None,
        delete_data_folder: true,
    },
    // The 93/94 and 95/96 conversions only ship the files that differ from 89/90
    BuiltinEntry {
        name: "cm93_database",
        label: "1993/94",
        family: DatabaseFamily::Cm93,
        prerequisite: Some("cm89_database"),
        delete_data_folder: false,
    },
    BuiltinEntry {
        name: "cm95_database",
        label: "1995/96",
        family: DatabaseFamily::Cm95,
        prerequisite: Some("cm89_database"),
        delete_data_folder: false,
    },
    BuiltinEntry {
        name: "cm3_database",
        label: "CM3 1999/00",
        family: DatabaseFamily::Cm3,
        prerequisite: None,
        delete_data_folder: true,
    },
];

/// Builds the built-in catalog with archives located under `resources_dir`.
pub fn builtin_catalog(resources_dir: &Path) -> Result<Catalog, CatalogError> {
    let entries = BUILTIN
        .iter()
        .map(|entry| Database {
            name: entry.name.to_string(),
            label: entry.label.to_string(),
            family: entry.family,
            archive: ArchiveSource::Bundled(resources_dir.join(format!("{}.zip", entry.name))),
            prerequisite: entry.prerequisite.map(str::to_string),
            delete_data_folder: entry.delete_data_folder,
        })
        .collect();

    Catalog::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = builtin_catalog(Path::new("/res")).unwrap();
        assert_eq!(catalog.len(), BUILTIN.len());

        let cm93 = catalog.get("cm93_database").unwrap();
        assert_eq!(cm93.label, "1993/94");
        assert_eq!(cm93.prerequisite.as_deref(), Some("cm89_database"));
        match &cm93.archive {
            ArchiveSource::Bundled(path) => {
                assert_eq!(path, &PathBuf::from("/res/cm93_database.zip"))
            }
            ArchiveSource::Bytes(_) => panic!("built-in archives are bundled"),
        }
    }

    #[test]
    fn test_builtin_chains_are_short() {
        let catalog = builtin_catalog(Path::new("/res")).unwrap();
        for db in catalog.iter() {
            assert!(catalog.prerequisite_chain(&db.name).unwrap().len() <= 2);
        }
    }
}
