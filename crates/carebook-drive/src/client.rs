//! Drive API HTTP client.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};

use crate::config::DriveConfig;
use crate::models::{CreatedFile, FileList, FileMetadata, RemoteFile, FOLDER_MIME_TYPE};
use crate::multipart;
use crate::query::Query;
use crate::{classify_status, DriveResult};

/// Fields requested for every listed item.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, parents, mimeType, modifiedTime)";

/// Largest page the backend serves.
const PAGE_SIZE: &str = "1000";

/// Blocking drive client.
///
/// Stateless apart from the connection pool: the bearer token is supplied on
/// every call, so one client can outlive any number of token refreshes.
pub struct DriveClient {
    http: Client,
    config: DriveConfig,
}

impl DriveClient {
    /// Build a client with the configured transport timeout.
    pub fn new(config: DriveConfig) -> DriveResult<Self> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// List every non-trashed item matching `query`, following page tokens.
    pub fn list_files(&self, token: &str, query: &Query) -> DriveResult<Vec<RemoteFile>> {
        let q = query.to_expression();
        debug!(query = %q, "listing drive files");

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(format!("{}/files", self.config.api_base))
                .bearer_auth(token)
                .query(&[
                    ("q", q.as_str()),
                    ("fields", LIST_FIELDS),
                    ("spaces", "drive"),
                    ("pageSize", PAGE_SIZE),
                ]);
            if let Some(next) = &page_token {
                request = request.query(&[("pageToken", next.as_str())]);
            }

            let page: FileList = send(request)?.json()?;
            trace!(count = page.files.len(), "received page");
            files.extend(page.files);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(files)
    }

    /// Create a folder under `parent_id` and return its id.
    pub fn create_folder(&self, token: &str, name: &str, parent_id: &str) -> DriveResult<String> {
        debug!(name, parent_id, "creating drive folder");
        let metadata = FileMetadata {
            name,
            parents: [parent_id],
            mime_type: Some(FOLDER_MIME_TYPE),
        };
        let request = self
            .http
            .post(format!("{}/files", self.config.api_base))
            .bearer_auth(token)
            .query(&[("fields", "id")])
            .json(&metadata);
        let created: CreatedFile = send(request)?.json()?;
        Ok(created.id)
    }

    /// Upload `bytes` as a new file `name` under `parent_id` and return its id.
    pub fn upload_file(
        &self,
        token: &str,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> DriveResult<String> {
        debug!(name, parent_id, mime_type, size = bytes.len(), "uploading file");
        let metadata = serde_json::to_vec(&FileMetadata {
            name,
            parents: [parent_id],
            mime_type: None,
        })?;
        let boundary = multipart::new_boundary();
        let body = multipart::encode(&metadata, mime_type, bytes, &boundary);

        let request = self
            .http
            .post(format!("{}/files", self.config.upload_base))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(CONTENT_TYPE, multipart::content_type(&boundary))
            .body(body);
        let created: CreatedFile = send(request)?.json()?;
        Ok(created.id)
    }

    /// Download the content of `file_id`.
    pub fn download_file(&self, token: &str, file_id: &str) -> DriveResult<Vec<u8>> {
        debug!(file_id, "downloading file");
        let request = self
            .http
            .get(format!("{}/files/{}", self.config.api_base, file_id))
            .bearer_auth(token)
            .query(&[("alt", "media")]);
        let bytes = send(request)?.bytes()?;
        Ok(bytes.to_vec())
    }

    /// Permanently delete `file_id`.
    pub fn delete_file(&self, token: &str, file_id: &str) -> DriveResult<()> {
        debug!(file_id, "deleting file");
        let request = self
            .http
            .delete(format!("{}/files/{}", self.config.api_base, file_id))
            .bearer_auth(token);
        send(request)?;
        Ok(())
    }
}

/// Send a request and turn non-2xx statuses into errors.
fn send(request: RequestBuilder) -> DriveResult<Response> {
    let response = request.send()?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(classify_status(status.as_u16(), body))
}
