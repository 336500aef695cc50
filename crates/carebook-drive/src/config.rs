//! Drive endpoint configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Endpoints and transport settings for [`crate::DriveClient`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriveConfig {
    /// Metadata API base (no trailing `/`)
    #[serde(default = "DriveConfig::default_api_base")]
    pub api_base: String,
    /// Media upload API base (no trailing `/`)
    #[serde(default = "DriveConfig::default_upload_base")]
    pub upload_base: String,
    /// Per-request transport timeout in seconds
    #[serde(default = "DriveConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl DriveConfig {
    fn default_api_base() -> String {
        "https://www.googleapis.com/drive/v3".to_string()
    }

    fn default_upload_base() -> String {
        "https://www.googleapis.com/upload/drive/v3".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        60
    }

    /// Transport timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: Self::default_api_base(),
            upload_base: Self::default_upload_base(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}
