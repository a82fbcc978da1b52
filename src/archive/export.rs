//! Zipping the data folder into a custom database archive.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use tracing::info;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{IoResultExt, SwitchError};

/// Zips the contents of `source` into `destination`.
///
/// Entry names are relative to `source`, so the archive extracts flat into a
/// data folder. The zip is written to a temporary file next to `destination`
/// and moved into place once complete; an existing file is replaced.
///
/// Returns the number of files stored.
pub fn export_directory(source: &Path, destination: &Path) -> Result<usize, SwitchError> {
    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).with_path("create directory", parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".cmswitch-export")
        .suffix(".zip")
        .tempfile_in(parent)
        .with_path("create temporary file in", parent)?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut files_stored = 0;

    {
        let mut zip = ZipWriter::new(temp.as_file_mut());

        for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source).to_path_buf();
                SwitchError::io("walk", &path, io::Error::other(e))
            })?;
            let path = entry.path();

            let relative = path
                .strip_prefix(source)
                .map_err(|_| SwitchError::io("export", path, io::Error::other("path outside data folder")))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if entry.file_type().is_dir() {
                zip.add_directory(format!("{}/", name), options)?;
            } else if entry.file_type().is_file() {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                zip.start_file(name, options.large_file(size >= u32::MAX as u64))?;
                let file = File::open(path).with_path("open", path)?;
                io::copy(&mut BufReader::new(file), &mut zip).with_path("compress", path)?;
                files_stored += 1;
            }
        }

        let file = zip.finish()?;
        file.flush().with_path("write", destination)?;
    }

    temp.persist(destination)
        .map_err(|e| SwitchError::io("save", destination, e.error))?;

    info!(
        "Exported {} files from {} to {}",
        files_stored,
        source.display(),
        destination.display()
    );
    Ok(files_stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::install;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_export_then_install_reproduces_folder() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("Data");
        fs::create_dir_all(data.join("Fonts")).unwrap();
        fs::create_dir_all(data.join("Empty")).unwrap();
        fs::write(data.join("player_setup.cfg"), b"setup").unwrap();
        fs::write(data.join("Fonts/font.ttf"), b"font").unwrap();

        let archive = dir.path().join("out/My Database.zip");
        let stored = export_directory(&data, &archive).unwrap();
        assert_eq!(stored, 2);

        let restored = dir.path().join("Restored");
        install(&fs::read(&archive).unwrap(), &restored, true, &[], None).unwrap();

        assert_eq!(fs::read(restored.join("player_setup.cfg")).unwrap(), b"setup");
        assert_eq!(fs::read(restored.join("Fonts/font.ttf")).unwrap(), b"font");
        assert!(restored.join("Empty").is_dir());
    }

    #[test]
    fn test_export_replaces_existing_archive() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("Data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("index.dat"), b"v2").unwrap();

        let archive = dir.path().join("db.zip");
        fs::write(&archive, b"old contents").unwrap();

        export_directory(&data, &archive).unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
        assert_eq!(zip.by_index(0).unwrap().name(), "index.dat");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".cmswitch-export"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
