//! Backup/restore settings.

use carebook_drive::DriveConfig;
use serde::{Deserialize, Serialize};

/// Upper bound on parallel transfers within one run.
pub const MAX_CONCURRENCY: usize = 8;

/// Settings for one backup or restore run.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Name of the backup folder under the drive root
    #[serde(default = "default_root_folder_name")]
    pub root_folder_name: String,

    /// Parallel uploads / downloads / deletions
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_patients_manifest")]
    pub patients_manifest: String,

    #[serde(default = "default_records_manifest")]
    pub records_manifest: String,

    #[serde(default)]
    pub drive: DriveConfig,
}

fn default_root_folder_name() -> String {
    "CarebookBackup".to_string()
}

const fn default_concurrency() -> usize {
    4
}

fn default_patients_manifest() -> String {
    "patients.json".to_string()
}

fn default_records_manifest() -> String {
    "records.json".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root_folder_name: default_root_folder_name(),
            concurrency: default_concurrency(),
            patients_manifest: default_patients_manifest(),
            records_manifest: default_records_manifest(),
            drive: DriveConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Parse a JSON configuration, filling in defaults for missing fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Worker count actually used: `concurrency` clamped to `1..=MAX_CONCURRENCY`.
    pub fn workers(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}
