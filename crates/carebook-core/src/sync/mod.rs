//! Backup/restore reconciliation engine.
//!
//! Local state (two collections plus the files they reference) and the
//! remote backup folder are reconciled one direction at a time:
//!
//! - [`backup()`]: prune local orphans, upload manifests and live files,
//!   then delete remote files nothing references anymore.
//! - [`restore()`]: download everything into a staging area, parse the
//!   manifests and only then replace local files and collections.
//!
//! Both are safe to re-run. Folders and data files are found by name before
//! anything is created, so a second run against unchanged state creates
//! nothing new.
//!
//! Collaborators are injected through [`SyncContext`]; nothing here holds
//! global state. The folder cache lives for exactly one run.

mod backup;
mod credentials;
pub mod folders;
pub mod live_set;
pub mod manifest;
pub mod pool;
mod progress;
pub mod prune;
mod remote;
mod restore;
mod store;
pub mod test_utils;

pub use backup::{backup, BackupReport, ItemError};
pub use credentials::{CredentialProvider, StaticToken};
pub use folders::FolderResolver;
pub use live_set::LiveSet;
pub use progress::{NoProgress, ProgressEvent, ProgressSink, SyncPhase};
pub use prune::prune_orphans;
pub use remote::RemoteStore;
pub use restore::{restore, RestoreReport};
pub use store::CollectionStore;

use std::io;

use carebook_drive::DriveError;
use thiserror::Error;

use crate::config::SyncConfig;
use crate::db::DbError;
use crate::files::LocalFiles;

/// Engine errors.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed manifest {name}: {message}")]
    Parse { name: String, message: String },

    #[error("Local I/O error at {path}: {message}")]
    LocalIo { path: String, message: String },

    #[error("Local store error: {0}")]
    Store(#[from] DbError),
}

impl SyncError {
    pub fn local_io(path: &str, e: io::Error) -> Self {
        SyncError::LocalIo {
            path: path.to_string(),
            message: e.to_string(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Auth(_))
    }
}

impl From<DriveError> for SyncError {
    fn from(e: DriveError) -> Self {
        match e {
            DriveError::Auth { .. } => SyncError::Auth(e.to_string()),
            DriveError::NotFound(what) => SyncError::NotFound(what),
            DriveError::Http { .. } | DriveError::Network(_) | DriveError::Decode(_) => {
                SyncError::Network(e.to_string())
            }
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Everything one run talks to.
pub struct SyncContext<'a> {
    pub remote: &'a dyn RemoteStore,
    pub credentials: &'a dyn CredentialProvider,
    pub store: &'a dyn CollectionStore,
    pub files: &'a dyn LocalFiles,
    pub config: &'a SyncConfig,
    pub progress: &'a dyn ProgressSink,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_error_mapping() {
        let auth: SyncError = DriveError::Auth {
            status: 401,
            body: "expired".into(),
        }
        .into();
        assert!(auth.is_auth());

        let missing: SyncError = DriveError::NotFound("file f1".into()).into();
        assert!(matches!(missing, SyncError::NotFound(ref w) if w == "file f1"));

        let server: SyncError = DriveError::Http {
            status: 503,
            body: "busy".into(),
        }
        .into();
        assert!(matches!(server, SyncError::Network(ref m) if m.contains("503")));

        let transport: SyncError = DriveError::Network("reset".into()).into();
        assert!(matches!(transport, SyncError::Network(_)));
    }

    #[test]
    fn test_local_io_keeps_path() {
        let err = SyncError::local_io("/x/a.png", io::Error::new(io::ErrorKind::Other, "disk full"));
        assert_eq!(err.to_string(), "Local I/O error at /x/a.png: disk full");
    }
}
