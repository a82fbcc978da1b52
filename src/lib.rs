//! cmswitch - Championship Manager 01/02 database switcher
//!
//! Installs versioned database archives into the game's single `Data`
//! folder, keeps the loader configs in step with the active database family,
//! and saves/restores the current data folder as custom database archives.

pub mod archive;
pub mod catalog;
pub mod detector;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod paths;
pub mod settings;
pub mod switcher;

pub use catalog::{Catalog, Database, DatabaseFamily};
pub use error::SwitchError;
pub use loader::GameLayout;
pub use switcher::{status_message, SwitchOutcome, Switcher};
