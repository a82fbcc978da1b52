//! Archive installation into the data folder.
//!
//! The archive is opened and every entry name validated before anything on
//! disk is touched, so a corrupt or hostile archive never costs the user the
//! current data folder. Once extraction starts there is no rollback: an I/O
//! failure half way through leaves the files written so far in place and is
//! reported as an error.

use std::fs::{self, File};
use std::io::{self, BufWriter, Cursor};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{IoResultExt, SwitchError};
use crate::paths::{names_equal, sanitize_entry_path};

/// Progress information for an extraction
#[derive(Debug, Clone)]
pub struct ExtractProgress {
    /// Entries written so far
    pub entries_done: usize,
    /// Total entries in the archive
    pub total_entries: usize,
    /// Path of the entry just written, relative to the target
    pub current_entry: String,
}

/// A validated archive entry
struct PlannedEntry {
    path: PathBuf,
    is_dir: bool,
}

/// Opens an archive held in memory, failing with `InvalidArchive` when it
/// is not a zip or has no entries.
pub fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, SwitchError> {
    let archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| SwitchError::InvalidArchive(e.to_string()))?;

    if archive.len() == 0 {
        return Err(SwitchError::InvalidArchive("archive is empty".to_string()));
    }

    Ok(archive)
}

fn plan_entries(archive: &ZipArchive<Cursor<&[u8]>>) -> Result<Vec<PlannedEntry>, SwitchError> {
    (0..archive.len())
        .map(|i| {
            let name = archive
                .name_for_index(i)
                .ok_or_else(|| SwitchError::InvalidArchive(format!("missing entry {}", i)))?;
            let path = sanitize_entry_path(name).ok_or_else(|| {
                SwitchError::InvalidArchive(format!("unsafe entry path '{}'", name))
            })?;
            Ok(PlannedEntry {
                path,
                is_dir: name.ends_with('/') || name.ends_with('\\'),
            })
        })
        .collect()
}

/// Removes everything inside `dir`, keeping `dir` itself and any direct
/// child named in `keep` (any case).
pub fn clear_directory(dir: &Path, keep: &[&str]) -> Result<(), SwitchError> {
    for entry in fs::read_dir(dir).with_path("read directory", dir)? {
        let entry = entry.with_path("read directory", dir)?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if keep.iter().any(|k| names_equal(k, &name)) {
            debug!("Keeping {}", path.display());
            continue;
        }
        let file_type = entry.file_type().with_path("inspect", &path)?;

        if file_type.is_dir() {
            fs::remove_dir_all(&path).with_path("remove directory", &path)?;
        } else {
            fs::remove_file(&path).with_path("remove file", &path)?;
        }
    }
    Ok(())
}

/// Extracts `archive` into `target`.
///
/// With `wipe_first` the existing contents of `target` are removed before
/// extraction, except top-level entries named in `keep`. Otherwise the archive is overlaid: shared paths are
/// overwritten, new paths added and paths only present in `target` kept.
/// `target` is created when missing.
///
/// Returns the number of files written.
pub fn install(
    archive: &[u8],
    target: &Path,
    wipe_first: bool,
    keep: &[&str],
    progress: Option<&dyn Fn(ExtractProgress)>,
) -> Result<usize, SwitchError> {
    let mut zip = open_archive(archive)?;
    let planned = plan_entries(&zip)?;

    if target.exists() {
        if wipe_first {
            info!("Wiping {}", target.display());
            clear_directory(target, keep)?;
        }
    } else {
        fs::create_dir_all(target).with_path("create directory", target)?;
    }

    let total_entries = planned.len();
    let mut files_written = 0;

    for (i, entry) in planned.iter().enumerate() {
        let dest_path = target.join(&entry.path);

        if entry.is_dir {
            fs::create_dir_all(&dest_path).with_path("create directory", &dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).with_path("create directory", parent)?;
            }

            let mut source = zip.by_index(i)?;
            let output = File::create(&dest_path).with_path("create file", &dest_path)?;
            let mut writer = BufWriter::new(output);
            io::copy(&mut source, &mut writer).with_path("extract", &dest_path)?;
            drop(source);
            writer
                .into_inner()
                .map_err(|e| e.into_error())
                .with_path("write", &dest_path)?;
            files_written += 1;
        }

        if let Some(callback) = progress {
            callback(ExtractProgress {
                entries_done: i + 1,
                total_entries,
                current_entry: entry.path.display().to_string(),
            });
        }
    }

    debug!(
        "Extracted {} files ({} entries) into {}",
        files_written,
        total_entries,
        target.display()
    );
    Ok(files_written)
}
