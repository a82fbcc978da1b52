//! Folder normalization for custom database archives.
//!
//! Custom archives don't agree on a layout: the payload may sit at the
//! archive root, under `Data/`, or under something like `Export/Data/`. The
//! normalizer finds the folder holding the setup marker and lifts its contents
//! up to the data folder root.
//!
//! The descent follows a single chain: at each level it steps into the first
//! subfolder (skipping protected folders such as `Fonts`). Archives from this
//! ecosystem nest their payload along one path, so branching trees are not
//! searched. A marker at the data folder root does not stop the descent: a
//! nested copy further down the chain is the payload.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{IoResultExt, SwitchError};
use crate::paths::{contains_file_case_insensitive, find_child_case_insensitive, names_equal};

/// Deepest nesting accepted before an archive is rejected.
pub const MAX_NESTING_DEPTH: usize = 16;

/// Locates and flattens nested payloads inside a data folder.
#[derive(Debug, Clone)]
pub struct FolderNormalizer {
    data_dir: PathBuf,
    marker: String,
    protected: Vec<String>,
}

impl FolderNormalizer {
    /// Creates a normalizer for `data_dir` looking for `marker`.
    /// `protected` folder names (any case) are never descended into or deleted.
    pub fn new(data_dir: PathBuf, marker: impl Into<String>, protected: &[&str]) -> Self {
        Self {
            data_dir,
            marker: marker.into(),
            protected: protected.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn is_protected(&self, name: &str) -> bool {
        self.protected.iter().any(|p| names_equal(p, name))
    }

    /// First subfolder of `dir` by name, skipping protected folders.
    fn first_subdirectory(&self, dir: &Path) -> Result<Option<PathBuf>, SwitchError> {
        let mut subdirs = Vec::new();
        for entry in fs::read_dir(dir).with_path("read directory", dir)? {
            let entry = entry.with_path("read directory", dir)?;
            let file_type = entry.file_type().with_path("inspect", &entry.path())?;
            let name = entry.file_name().to_string_lossy().to_string();
            if file_type.is_dir() && !self.is_protected(&name) {
                subdirs.push(entry.path());
            }
        }
        subdirs.sort();
        Ok(subdirs.into_iter().next())
    }

    /// Finds the folder that holds the marker, starting at `start_dir`.
    ///
    /// The data folder itself never counts as a match. It is returned when no
    /// folder below it along the chain holds the marker, meaning the payload
    /// is already flat. Fails with `InvalidArchive` when the chain is deeper
    /// than [`MAX_NESTING_DEPTH`].
    pub fn locate_data_root(&self, start_dir: &Path) -> Result<PathBuf, SwitchError> {
        let mut current = start_dir.to_path_buf();

        for depth in 0..=MAX_NESTING_DEPTH {
            if current != self.data_dir && contains_file_case_insensitive(&current, &self.marker) {
                info!("Found {} at depth {}: {}", self.marker, depth, current.display());
                return Ok(current);
            }

            match self.first_subdirectory(&current)? {
                Some(next) => current = next,
                None => {
                    debug!("No nested {} below {}", self.marker, start_dir.display());
                    return Ok(self.data_dir.clone());
                }
            }
        }

        Err(SwitchError::InvalidArchive(format!(
            "folders nested deeper than {} levels",
            MAX_NESTING_DEPTH
        )))
    }

    /// Moves the contents of `from` to the data folder root.
    ///
    /// Subfolders are moved (merged when a folder of the same name exists),
    /// files are copied over existing ones. Folders left without any file
    /// afterwards, such as the emptied wrapper chain, are deleted unless
    /// protected. If the move fails, whatever was not moved yet stays in a
    /// `.cmswitch-relocate*` folder inside the data folder.
    pub fn relocate(&self, from: &Path) -> Result<(), SwitchError> {
        let to = &self.data_dir;
        if from == to.as_path() {
            return Ok(());
        }

        // Park the payload outside the wrapper chain so the chain can be pruned
        let staging = tempfile::Builder::new()
            .prefix(".cmswitch-relocate")
            .tempdir_in(to)
            .with_path("create staging folder in", to)?;
        let payload = staging.path().join("payload");
        fs::rename(from, &payload).with_path("move", from)?;

        let moved = self
            .prune_empty_dirs(Some(staging.path()))
            .and_then(|_| self.move_payload(&payload));
        if let Err(e) = moved {
            let kept = staging.keep();
            warn!("Relocation failed, unmoved files left in {}", kept.display());
            return Err(e);
        }

        staging
            .close()
            .with_path("remove staging folder in", to)?;

        info!("Relocated {} to {}", from.display(), to.display());
        Ok(())
    }

    /// Moves the children of `payload` into the data folder root.
    fn move_payload(&self, payload: &Path) -> Result<(), SwitchError> {
        let to = &self.data_dir;
        for entry in fs::read_dir(payload).with_path("read directory", payload)? {
            let entry = entry.with_path("read directory", payload)?;
            let src = entry.path();
            let name = entry.file_name();
            let file_type = entry.file_type().with_path("inspect", &src)?;

            if file_type.is_dir() {
                match find_child_case_insensitive(to, &name.to_string_lossy()) {
                    Some(existing) if existing.is_dir() => merge_directories(&src, &existing)?,
                    _ => {
                        let dst = to.join(&name);
                        fs::rename(&src, &dst).with_path("move", &src)?;
                    }
                }
            } else {
                let dst = to.join(&name);
                fs::copy(&src, &dst).with_path("copy", &src)?;
            }
        }
        Ok(())
    }

    /// Deletes direct subfolders of the data folder that contain no files,
    /// keeping protected folders and `skip`.
    fn prune_empty_dirs(&self, skip: Option<&Path>) -> Result<usize, SwitchError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.data_dir).with_path("read directory", &self.data_dir)? {
            let entry = entry.with_path("read directory", &self.data_dir)?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = entry.file_type().with_path("inspect", &path)?;

            if !file_type.is_dir() || self.is_protected(&name) || skip == Some(path.as_path()) {
                continue;
            }

            if !contains_any_file(&path) {
                debug!("Removing leftover folder {}", path.display());
                fs::remove_dir_all(&path).with_path("remove directory", &path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// True when anything other than a directory exists below `dir`.
fn contains_any_file(dir: &Path) -> bool {
    WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| !e.file_type().is_dir())
}

/// Recursively merge source directory into destination with case-insensitive folder matching
fn merge_directories(src: &Path, dst: &Path) -> Result<(), SwitchError> {
    for entry in fs::read_dir(src).with_path("read directory", src)? {
        let entry = entry.with_path("read directory", src)?;
        let src_path = entry.path();
        let item_name = entry.file_name();
        let file_type = entry.file_type().with_path("inspect", &src_path)?;

        if file_type.is_dir() {
            let dst_path = match find_child_case_insensitive(dst, &item_name.to_string_lossy()) {
                // Merge into existing folder (preserves original case)
                Some(existing) if existing.is_dir() => existing,
                _ => {
                    let new_dir = dst.join(&item_name);
                    fs::create_dir_all(&new_dir).with_path("create directory", &new_dir)?;
                    new_dir
                }
            };
            merge_directories(&src_path, &dst_path)?;
        } else {
            // Copy file, overwriting if exists
            let dst_path = dst.join(&item_name);
            fs::copy(&src_path, &dst_path).with_path("copy", &src_path)?;
        }
    }
    Ok(())
}
