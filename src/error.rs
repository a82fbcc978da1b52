//! Error types for database switching.
//!
//! Every failure aborts the remaining steps of the current operation and is
//! surfaced to the caller as a single `SwitchError`. Nothing is rolled back:
//! a failed extraction can leave the data folder as a partial overlay.

use std::path::{Path, PathBuf};

use crate::catalog::CatalogError;

/// Errors produced by switch, import and export operations.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("Unknown database: {0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Post-install verification found no `marker` file at the data folder root.
    #[error("No valid database found!")]
    MissingMarker { marker: String },

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("No data folder found at {}, load a database first", .0.display())]
    NoDataFolder(PathBuf),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl SwitchError {
    /// Wraps an I/O error with a message naming the path involved.
    pub fn io(action: &str, path: &Path, source: std::io::Error) -> Self {
        SwitchError::Io {
            context: format!("Failed to {} {}", action, path.display()),
            source,
        }
    }
}

/// Attaches path context to `std::io::Result`s.
pub trait IoResultExt<T> {
    fn with_path(self, action: &str, path: &Path) -> Result<T, SwitchError>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, action: &str, path: &Path) -> Result<T, SwitchError> {
        self.map_err(|e| SwitchError::io(action, path, e))
    }
}

impl From<zip::result::ZipError> for SwitchError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(source) => SwitchError::Io {
                context: "Failed to read archive".to_string(),
                source,
            },
            other => SwitchError::InvalidArchive(other.to_string()),
        }
    }
}
