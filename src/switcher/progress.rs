//! Progress reporting
//!
//! Percentages are advisory. They exist so a caller can keep a progress bar
//! moving during long extractions; nothing depends on them for correctness.

use std::sync::Arc;

/// Progress event sent to the observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Overall completion, 0 to 100
    pub percent: u8,
    /// Short description of the current step
    pub message: String,
}

/// Callback invoked for each progress event
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Checkpoint after the prerequisite database is installed.
pub const PREREQUISITE_DONE: u8 = 40;
/// Checkpoint after the requested database is installed.
pub const INSTALL_DONE: u8 = 80;
/// Checkpoint after custom archive folders are normalized.
pub const NORMALIZE_DONE: u8 = 90;
pub const COMPLETE: u8 = 100;

/// Maps `done` out of `total` onto the `start..end` percent range.
pub fn scale(start: u8, end: u8, done: usize, total: usize) -> u8 {
    if total == 0 || end <= start {
        return end;
    }
    let span = (end - start) as usize;
    start + (span * done.min(total) / total) as u8
}
