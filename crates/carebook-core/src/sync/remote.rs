//! Remote backend seam.

use carebook_drive::{DriveClient, Query, RemoteFile};

use super::SyncResult;

/// Operations the engine needs from the remote backend.
///
/// Called from transfer workers, hence `Send + Sync`.
pub trait RemoteStore: Send + Sync {
    fn list_files(&self, token: &str, query: &Query) -> SyncResult<Vec<RemoteFile>>;

    fn create_folder(&self, token: &str, name: &str, parent_id: &str) -> SyncResult<String>;

    fn upload_file(
        &self,
        token: &str,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> SyncResult<String>;

    fn download_file(&self, token: &str, file_id: &str) -> SyncResult<Vec<u8>>;

    fn delete_file(&self, token: &str, file_id: &str) -> SyncResult<()>;
}

impl RemoteStore for DriveClient {
    fn list_files(&self, token: &str, query: &Query) -> SyncResult<Vec<RemoteFile>> {
        Ok(DriveClient::list_files(self, token, query)?)
    }

    fn create_folder(&self, token: &str, name: &str, parent_id: &str) -> SyncResult<String> {
        Ok(DriveClient::create_folder(self, token, name, parent_id)?)
    }

    fn upload_file(
        &self,
        token: &str,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> SyncResult<String> {
        Ok(DriveClient::upload_file(self, token, name, parent_id, mime_type, bytes)?)
    }

    fn download_file(&self, token: &str, file_id: &str) -> SyncResult<Vec<u8>> {
        Ok(DriveClient::download_file(self, token, file_id)?)
    }

    fn delete_file(&self, token: &str, file_id: &str) -> SyncResult<()> {
        Ok(DriveClient::delete_file(self, token, file_id)?)
    }
}
