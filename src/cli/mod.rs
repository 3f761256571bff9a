//! CLI argument parsing and processing

pub mod args;
pub mod edits;

// Re-exports
pub use args::{Cli, Command, ConfigAction, EditArgs, LogFormat, SecretString};
pub use edits::{apply_edits, parse_edits, reference_targets, DraftEdit};
