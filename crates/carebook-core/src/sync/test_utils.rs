//! In-memory remote backend for tests.
//!
//! [`MemoryRemote`] applies [`Query`] filters the way the drive does, counts
//! every call and can be told to fail specific operations.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use carebook_drive::{Query, RemoteFile, FOLDER_MIME_TYPE};
use chrono::{DateTime, SecondsFormat, Utc};

use super::{RemoteStore, SyncError, SyncResult};

/// Calls made against a [`MemoryRemote`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub create_folder: usize,
    pub upload: usize,
    pub download: usize,
    pub delete: usize,
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, Stored>,
    next_id: u64,
    calls: CallCounts,
    token: Option<String>,
    fail_uploads: BTreeSet<String>,
    fail_downloads: BTreeSet<String>,
    fail_deletes: BTreeSet<String>,
    fail_folder_queries: bool,
}

struct Stored {
    meta: RemoteFile,
    bytes: Vec<u8>,
}

impl State {
    fn insert(&mut self, name: &str, parent_id: &str, mime_type: &str, bytes: &[u8]) -> String {
        self.next_id += 1;
        let id = format!("id-{:06}", self.next_id);
        let modified = DateTime::<Utc>::from_timestamp(1_700_000_000 + self.next_id as i64, 0)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let meta = RemoteFile {
            id: id.clone(),
            name: name.to_string(),
            parents: vec![parent_id.to_string()],
            mime_type: mime_type.to_string(),
            modified_time: Some(modified),
        };
        self.files.insert(
            id.clone(),
            Stored {
                meta,
                bytes: bytes.to_vec(),
            },
        );
        id
    }

    fn check_token(&self, token: &str) -> SyncResult<()> {
        match &self.token {
            Some(expected) if expected != token => {
                Err(SyncError::Auth("HTTP 401: invalid credentials".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Drive-like store kept in memory.
#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every call whose token is not `token`.
    pub fn with_token(token: &str) -> Self {
        let remote = Self::new();
        remote.lock().token = Some(token.to_string());
        remote
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make uploads of files named `name` fail with a network error.
    pub fn fail_upload_of(&self, name: &str) {
        self.lock().fail_uploads.insert(name.to_string());
    }

    /// Make downloads of files named `name` fail with a network error.
    pub fn fail_download_of(&self, name: &str) {
        self.lock().fail_downloads.insert(name.to_string());
    }

    /// Make deletes of files named `name` fail with a network error.
    pub fn fail_delete_of(&self, name: &str) {
        self.lock().fail_deletes.insert(name.to_string());
    }

    /// Make every folder lookup fail with a network error.
    pub fn fail_folder_queries(&self) {
        self.lock().fail_folder_queries = true;
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn reset_calls(&self) {
        self.lock().calls = CallCounts::default();
    }

    /// Seed a folder without counting a call.
    pub fn insert_folder(&self, name: &str, parent_id: &str) -> String {
        self.lock().insert(name, parent_id, FOLDER_MIME_TYPE, &[])
    }

    /// Seed a file without counting a call.
    pub fn insert_file(&self, name: &str, parent_id: &str, mime_type: &str, bytes: &[u8]) -> String {
        self.lock().insert(name, parent_id, mime_type, bytes)
    }

    /// Every stored item, folders included.
    pub fn all(&self) -> Vec<RemoteFile> {
        self.lock().files.values().map(|s| s.meta.clone()).collect()
    }

    pub fn folders(&self) -> Vec<RemoteFile> {
        self.all().into_iter().filter(RemoteFile::is_folder).collect()
    }

    /// Stored non-folder items.
    pub fn files(&self) -> Vec<RemoteFile> {
        self.all().into_iter().filter(|f| !f.is_folder()).collect()
    }

    /// Direct children of `parent_id`.
    pub fn children(&self, parent_id: &str) -> Vec<RemoteFile> {
        self.all()
            .into_iter()
            .filter(|f| f.parents.iter().any(|p| p == parent_id))
            .collect()
    }

    /// Id of the single folder `name` under `parent_id`, if there is one.
    pub fn folder_id(&self, name: &str, parent_id: &str) -> Option<String> {
        self.children(parent_id)
            .into_iter()
            .find(|f| f.is_folder() && f.name == name)
            .map(|f| f.id)
    }

    /// Content of the stored file `id`.
    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.lock().files.get(id).map(|s| s.bytes.clone())
    }

    /// Replace the content of the stored file `id`.
    pub fn set_content(&self, id: &str, bytes: &[u8]) {
        if let Some(stored) = self.lock().files.get_mut(id) {
            stored.bytes = bytes.to_vec();
        }
    }
}

impl RemoteStore for MemoryRemote {
    fn list_files(&self, token: &str, query: &Query) -> SyncResult<Vec<RemoteFile>> {
        let mut state = self.lock();
        state.calls.list += 1;
        state.check_token(token)?;
        let folder_lookup = format!("mimeType='{}'", FOLDER_MIME_TYPE);
        if state.fail_folder_queries && query.to_expression().contains(&folder_lookup) {
            return Err(SyncError::Network("simulated folder lookup failure".to_string()));
        }
        Ok(state
            .files
            .values()
            .filter(|s| query.matches(&s.meta))
            .map(|s| s.meta.clone())
            .collect())
    }

    fn create_folder(&self, token: &str, name: &str, parent_id: &str) -> SyncResult<String> {
        let mut state = self.lock();
        state.calls.create_folder += 1;
        state.check_token(token)?;
        Ok(state.insert(name, parent_id, FOLDER_MIME_TYPE, &[]))
    }

    fn upload_file(
        &self,
        token: &str,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> SyncResult<String> {
        let mut state = self.lock();
        state.calls.upload += 1;
        state.check_token(token)?;
        if state.fail_uploads.contains(name) {
            return Err(SyncError::Network(format!("simulated upload failure for {}", name)));
        }
        Ok(state.insert(name, parent_id, mime_type, bytes))
    }

    fn download_file(&self, token: &str, file_id: &str) -> SyncResult<Vec<u8>> {
        let mut state = self.lock();
        state.calls.download += 1;
        state.check_token(token)?;
        let stored = state
            .files
            .get(file_id)
            .ok_or_else(|| SyncError::NotFound(format!("file {}", file_id)))?;
        if state.fail_downloads.contains(&stored.meta.name) {
            return Err(SyncError::Network(format!(
                "simulated download failure for {}",
                stored.meta.name
            )));
        }
        Ok(stored.bytes.clone())
    }

    fn delete_file(&self, token: &str, file_id: &str) -> SyncResult<()> {
        let mut state = self.lock();
        state.calls.delete += 1;
        state.check_token(token)?;
        let name = match state.files.get(file_id) {
            Some(stored) => stored.meta.name.clone(),
            None => return Err(SyncError::NotFound(format!("file {}", file_id))),
        };
        if state.fail_deletes.contains(&name) {
            return Err(SyncError::Network(format!("simulated delete failure for {}", name)));
        }
        state.files.remove(file_id);
        Ok(())
    }
}
