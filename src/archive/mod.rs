//! Database archive handling.
//!
//! Database archives are plain zip files. `extract` installs an archive into
//! the data folder (wiping or overlaying), `export` zips the data folder back
//! up as a custom database.

pub mod export;
pub mod extract;

pub use export::export_directory;
pub use extract::{clear_directory, install, open_archive, ExtractProgress};

/// Builds an in-memory zip from `(name, contents)` pairs. Names ending in
/// `/` become directory entries.
#[cfg(test)]
pub(crate) fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;

    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();

    for (name, contents) in entries {
        if name.ends_with('/') {
            zip.add_directory(name.to_string(), options).unwrap();
        } else {
            zip.start_file(name.to_string(), options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
    }

    zip.finish().unwrap().into_inner()
}
