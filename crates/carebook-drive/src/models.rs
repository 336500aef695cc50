//! Wire types for the drive API.

use serde::{Deserialize, Serialize};

/// MIME type the backend reserves for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type of the backup manifests.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Alias the backend accepts for the top of the user's drive.
pub const ROOT_FOLDER_ID: &str = "root";

/// A file or folder as listed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Backend-assigned id
    pub id: String,
    /// Name within its parent (not unique on the backend side)
    pub name: String,
    /// Parent folder ids
    #[serde(default)]
    pub parents: Vec<String>,
    /// MIME type
    #[serde(default)]
    pub mime_type: String,
    /// RFC 3339 modification time, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

impl RemoteFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    pub fn is_json(&self) -> bool {
        self.mime_type == JSON_MIME_TYPE
    }
}

/// One page of a `files.list` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileList {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    pub next_page_token: Option<String>,
}

/// Metadata sent on folder creation and as the first upload part.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileMetadata<'a> {
    pub name: &'a str,
    pub parents: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<&'a str>,
}

/// Response body of create / upload.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedFile {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_list() {
        let body = r#"{
            "nextPageToken": "tok-2",
            "files": [
                {"id": "f1", "name": "a.png", "parents": ["p1"], "mimeType": "image/png", "modifiedTime": "2024-01-15T10:00:00.000Z"},
                {"id": "d1", "name": "avatars", "mimeType": "application/vnd.google-apps.folder"}
            ]
        }"#;
        let list: FileList = serde_json::from_str(body).unwrap();
        assert_eq!(list.next_page_token.as_deref(), Some("tok-2"));
        assert_eq!(list.files.len(), 2);
        assert!(!list.files[0].is_folder());
        assert!(list.files[1].is_folder());
        assert!(list.files[1].parents.is_empty());
        assert_eq!(list.files[0].modified_time.as_deref(), Some("2024-01-15T10:00:00.000Z"));
        assert!(list.files[1].modified_time.is_none());
    }

    #[test]
    fn test_parse_empty_list() {
        let list: FileList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
        assert!(list.next_page_token.is_none());
    }

    #[test]
    fn test_metadata_serialization() {
        let meta = FileMetadata {
            name: "avatars",
            parents: ["root-id"],
            mime_type: Some(FOLDER_MIME_TYPE),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(
            json,
            r#"{"name":"avatars","parents":["root-id"],"mimeType":"application/vnd.google-apps.folder"}"#
        );

        let meta = FileMetadata {
            name: "r1.jpg",
            parents: ["att"],
            mime_type: None,
        };
        assert_eq!(
            serde_json::to_string(&meta).unwrap(),
            r#"{"name":"r1.jpg","parents":["att"]}"#
        );
    }
}
