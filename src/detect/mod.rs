// ABOUTME: Advisory detectors run over diffs and listings from the remote executor.
// ABOUTME: Failures here are reported as warnings and never abort a transition.

mod changes;
mod migrations;

pub use changes::{
    INDEX_DEFINITIONS_FILE, MANIFEST_FILE, find_sample_config, has_changes,
    manifest_has_additions,
};
pub use migrations::{
    MigrationKind, MigrationReport, MigrationScan, database_reminders, scan,
};

use thiserror::Error;

/// Name of the application config read for database reminders.
pub const APP_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("can't parse the config.json: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("config.json not found: {0}")]
    ConfigUnavailable(String),
}
