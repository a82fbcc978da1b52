//! Loader config generation.
//!
//! The loader reads `Key = Value` directives. Three of them depend on the
//! database family: the game start year, the patch folder and whether the
//! patches in that folder are applied automatically. Generation rewrites
//! those directives and passes every other line through untouched, so user
//! settings (speed, graphics, comments) survive a database switch.

use std::io;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::encoding::decode_config_bytes;
use crate::catalog::{Database, DatabaseFamily};
use crate::error::{IoResultExt, SwitchError};

/// Starting point when no loader config exists yet.
pub const DEFAULT_LOADER_LINES: &[&str] = &[
    "Year = 2001",
    "SpeedMultiplier = 4",
    "CurrencyMultiplier = 1.0",
    "ColouredAttributes = true",
    "DisableUnprotectedContracts = true",
    "HideNonPublicBids = true",
    "IncreaseToSevenSubs = true",
    "RegenFixes = true",
    "ForceLoadAllPlayers = false",
    "DataDirectory = Data",
    "Debug = false",
    "NoCD = true",
    "PatchFileDirectory = Patches",
    "AutoLoadPatchFiles = false",
];

/// Directives whose value depends on the database family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Year,
    PatchFileDirectory,
    AutoLoadPatchFiles,
}

impl Directive {
    /// Order in which missing directives are appended.
    const ALL: [Directive; 3] = [
        Directive::Year,
        Directive::PatchFileDirectory,
        Directive::AutoLoadPatchFiles,
    ];

    fn key(&self) -> &'static str {
        match self {
            Directive::Year => "Year",
            Directive::PatchFileDirectory => "PatchFileDirectory",
            Directive::AutoLoadPatchFiles => "AutoLoadPatchFiles",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.key().eq_ignore_ascii_case(key))
    }

    fn value_for(&self, family: DatabaseFamily) -> String {
        match self {
            Directive::Year => family.start_year().to_string(),
            Directive::PatchFileDirectory => family.patch_directory().to_string(),
            Directive::AutoLoadPatchFiles => family.auto_load_patches().to_string(),
        }
    }

    fn render(&self, family: DatabaseFamily) -> String {
        format!("{} = {}", self.key(), self.value_for(family))
    }
}

/// Splits a `Key = Value` line. Comments and free text return `None`.
fn parse_directive(line: &str) -> Option<(&str, &str)> {
    static DIRECTIVE_RE: OnceLock<Regex> = OnceLock::new();
    let re = DIRECTIVE_RE
        .get_or_init(|| Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_]*)\s*=\s*(.*?)\s*$").unwrap());

    let caps = re.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// True when `value` names one of the patch folders this tool manages.
fn is_family_patch_directory(value: &str) -> bool {
    let normalized = value.replace('/', "\\").trim_end_matches('\\').to_lowercase();
    DatabaseFamily::ALL
        .iter()
        .any(|f| f.patch_directory().to_lowercase() == normalized)
}

/// Produces the config lines for `database`.
///
/// `existing` is the current config text, or `None` to start from
/// [`DEFAULT_LOADER_LINES`]. Family directives are rewritten in place (first
/// occurrence wins, later duplicates are dropped) and appended when missing.
///
/// With `custom_overlay` a `PatchFileDirectory` pointing at a folder the user
/// picked is left alone; only values naming a known family patch folder are
/// rewritten.
///
/// Running this on its own output with the same database yields the same
/// lines.
pub fn generate_lines(existing: Option<&str>, database: &Database, custom_overlay: bool) -> Vec<String> {
    let family = database.family;
    let source: Vec<&str> = match existing {
        Some(text) => text.lines().collect(),
        None => DEFAULT_LOADER_LINES.to_vec(),
    };

    let mut seen: Vec<Directive> = Vec::with_capacity(Directive::ALL.len());
    let mut lines = Vec::with_capacity(source.len() + Directive::ALL.len());

    for line in source {
        let directive = parse_directive(line).and_then(|(key, value)| Some((Directive::from_key(key)?, value)));

        match directive {
            Some((directive, _)) if seen.contains(&directive) => {
                debug!("Dropping duplicate loader directive: {}", line.trim());
            }
            Some((Directive::PatchFileDirectory, value))
                if custom_overlay && !value.is_empty() && !is_family_patch_directory(value) =>
            {
                seen.push(Directive::PatchFileDirectory);
                lines.push(format!("{} = {}", Directive::PatchFileDirectory.key(), value));
            }
            Some((directive, _)) => {
                seen.push(directive);
                lines.push(directive.render(family));
            }
            None => lines.push(line.to_string()),
        }
    }

    for directive in Directive::ALL {
        if !seen.contains(&directive) {
            lines.push(directive.render(family));
        }
    }

    lines
}

/// Regenerates the loader config at `path` for `database`.
pub fn update_config_file(path: &Path, database: &Database, custom_overlay: bool) -> Result<(), SwitchError> {
    let existing = match std::fs::read(path) {
        Ok(bytes) => Some(decode_config_bytes(&bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(SwitchError::io("read", path, e)),
    };

    let lines = generate_lines(existing.as_deref(), database, custom_overlay);

    let mut content = lines.join("\r\n");
    content.push_str("\r\n");
    std::fs::write(path, content).with_path("write", path)?;

    debug!("Updated loader config {}", path.display());
    Ok(())
}
