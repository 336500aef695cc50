//! Patient models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::FileRef;

/// A patient profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Local integer id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Date of birth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    /// Profile picture stored under `avatars/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<FileRef>,
}

impl Patient {
    /// Create a patient with no birth date or avatar.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            date_of_birth: None,
            avatar: None,
        }
    }

    /// Attach an avatar.
    pub fn with_avatar(mut self, local_uri: impl Into<String>) -> Self {
        self.avatar = Some(FileRef::new(local_uri));
        self
    }

    /// Avatar path, if set and non-empty.
    pub fn avatar_uri(&self) -> Option<&str> {
        self.avatar
            .as_ref()
            .map(|a| a.local_uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}
