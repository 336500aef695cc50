//! Attachment references and the watched file categories.

use serde::{Deserialize, Serialize};

/// Reference to a file owned by the app.
///
/// `local_uri` is an absolute device path while the data is local and a path
/// relative to the app's base directory inside a backup manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub local_uri: String,
    /// Size in bytes as last seen on disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileRef {
    pub fn new(local_uri: impl Into<String>) -> Self {
        Self {
            local_uri: local_uri.into(),
            size: None,
        }
    }
}

/// A watched local directory whose contents are backed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Patient profile pictures
    Avatars,
    /// Record attachments
    Attachments,
}

impl Category {
    /// Every category, in processing order.
    pub const ALL: [Category; 2] = [Category::Avatars, Category::Attachments];

    /// Directory name, both locally and on the remote side.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Avatars => "avatars",
            Category::Attachments => "attachments",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.dir_name() == name)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}
