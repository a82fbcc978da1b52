//! Path helpers for Windows-authored archives
//!
//! Database archives are built on Windows. This module handles:
//! - Converting `\` to `/` in zip entry names
//! - Rejecting entry names that would escape the extraction folder
//! - Case-insensitive file lookups (Windows is case-insensitive, Linux is not)

use std::path::{Component, Path, PathBuf};

/// Convert Windows path separators to Linux
/// `Data\Fonts\font.ttf` -> `Data/Fonts/font.ttf`
pub fn to_linux_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Turns a zip entry name into a relative path that stays inside the
/// extraction folder. Returns `None` for absolute paths, `..` components and
/// names that reduce to nothing.
pub fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    let linux = to_linux_path(name);
    let mut out = PathBuf::new();

    for component in Path::new(&linux).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    // Drive letters survive as a normal component on Linux
    if let Some(first) = out.components().next() {
        if first.as_os_str().to_string_lossy().ends_with(':') {
            return None;
        }
    }

    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Find a direct child of `dir` by name, ignoring case.
///
/// An exact match wins over a case-insensitive one.
pub fn find_child_case_insensitive(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.exists() {
        return Some(exact);
    }

    let target_lower = name.to_lowercase();
    std::fs::read_dir(dir).ok()?.find_map(|entry| {
        let entry = entry.ok()?;
        let entry_name = entry.file_name();
        if entry_name.to_string_lossy().to_lowercase() == target_lower {
            Some(entry.path())
        } else {
            None
        }
    })
}

/// True when `dir` directly contains a regular file called `name` (any case).
pub fn contains_file_case_insensitive(dir: &Path, name: &str) -> bool {
    if dir.join(name).is_file() {
        return true;
    }

    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.filter_map(|e| e.ok()).any(|entry| {
        names_equal(&entry.file_name().to_string_lossy(), name) && entry.path().is_file()
    })
}

/// Case-insensitive comparison of a single file name
pub fn names_equal(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_to_linux_path() {
        assert_eq!(to_linux_path("Data\\Fonts\\font.ttf"), "Data/Fonts/font.ttf");
        assert_eq!(to_linux_path("already/linux/path"), "already/linux/path");
    }

    #[test]
    fn test_sanitize_entry_path() {
        assert_eq!(
            sanitize_entry_path("Export\\Data\\index.dat"),
            Some(PathBuf::from("Export/Data/index.dat"))
        );
        assert_eq!(sanitize_entry_path("./a/b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(sanitize_entry_path("../evil.txt"), None);
        assert_eq!(sanitize_entry_path("a/../../evil.txt"), None);
        assert_eq!(sanitize_entry_path("/etc/passwd"), None);
        assert_eq!(sanitize_entry_path("C:\\Windows\\evil.dll"), None);
        assert_eq!(sanitize_entry_path("./"), None);
    }

    #[test]
    fn test_find_child_case_insensitive() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("PLAYER_SETUP.CFG"), b"").unwrap();
        std::fs::create_dir(dir.path().join("Fonts")).unwrap();

        assert!(contains_file_case_insensitive(dir.path(), "player_setup.cfg"));
        assert!(!contains_file_case_insensitive(dir.path(), "fonts"));
        assert_eq!(
            find_child_case_insensitive(dir.path(), "fonts"),
            Some(dir.path().join("Fonts"))
        );
        assert_eq!(find_child_case_insensitive(dir.path(), "missing"), None);
    }

    #[test]
    fn test_file_found_behind_same_named_folder() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("player_setup.cfg")).unwrap();
        assert!(!contains_file_case_insensitive(dir.path(), "player_setup.cfg"));

        std::fs::write(dir.path().join("PLAYER_SETUP.CFG"), b"").unwrap();
        assert!(contains_file_case_insensitive(dir.path(), "player_setup.cfg"));
    }

    #[test]
    fn test_names_equal() {
        assert!(names_equal("Fonts", "FONTS"));
        assert!(!names_equal("Fonts", "Font"));
    }
}
