//! Database detector files.
//!
//! A detector file `<database name>.txt` at the data folder root records which
//! database is installed. Its single line holds the display name. Overlay
//! installs would otherwise leave an older detector next to the new one, so
//! all known detectors are cleared before a new one is written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IoResultExt, SwitchError};

/// Path of the detector file for `name`.
pub fn marker_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{}.txt", name))
}

/// Removes the detector file of every name in `names`. Missing files are fine.
pub fn clear_markers<'a>(
    data_dir: &Path,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<usize, SwitchError> {
    let mut removed = 0;
    for name in names {
        let path = marker_path(data_dir, name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed detector file {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(SwitchError::io("remove", &path, e)),
        }
    }
    Ok(removed)
}

/// Writes the detector file for `name` containing `label`.
pub fn write_marker(data_dir: &Path, name: &str, label: &str) -> Result<(), SwitchError> {
    let path = marker_path(data_dir, name);
    fs::write(&path, format!("{}\r\n", label)).with_path("write", &path)
}

/// Reads the display name stored in the detector file for `name`.
pub fn read_marker(data_dir: &Path, name: &str) -> Option<String> {
    let content = fs::read_to_string(marker_path(data_dir, name)).ok()?;
    let label = content.lines().next().unwrap_or_default().trim();
    Some(label.to_string())
}

/// Finds the installed database among `names`.
///
/// Returns `(name, label)` of the first detector found.
pub fn active_marker<'a>(
    data_dir: &Path,
    names: impl IntoIterator<Item = &'a str>,
) -> Option<(String, String)> {
    names
        .into_iter()
        .find_map(|name| read_marker(data_dir, name).map(|label| (name.to_string(), label)))
}

/// Clears every known detector, then writes the one for `name`.
pub fn reconcile<'a>(
    data_dir: &Path,
    names: impl IntoIterator<Item = &'a str>,
    name: &str,
    label: &str,
) -> Result<(), SwitchError> {
    clear_markers(data_dir, names)?;
    write_marker(data_dir, name, label)
}
