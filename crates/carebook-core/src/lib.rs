//! Carebook Core Library
//!
//! Local-first records manager for patients, dated medical records and the
//! photos and scans attached to them, with one-way-at-a-time backup to a
//! cloud drive.
//!
//! # Architecture
//!
//! ```text
//!   SQLite collections          watched directories
//!   (patients, records)         (avatars/, attachments/)
//!            │                           │
//!            └────────────┬──────────────┘
//!                         │
//!                  LiveSet + local prune
//!                         │
//!           ┌─────────────┴─────────────┐
//!           ▼                           ▼
//!        backup()                   restore()
//!   manifests + live files     staging → parse → commit
//!           │                           ▲
//!           ▼                           │
//!   ┌───────────────────────────────────┴───┐
//!   │ CarebookBackup/                       │
//!   │   patients.json  records.json         │
//!   │   avatars/       attachments/         │
//!   └───────────────────────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **Local and remote converge on the set of referenced files.** Every run is
//! safe to repeat, and a failed restore never leaves local state half written.
//!
//! # Modules
//!
//! - [`db`]: SQLite collection store
//! - [`models`]: Domain types (Patient, MedicalRecord, FileRef)
//! - [`files`]: Local file store and path mapping
//! - [`sync`]: Backup/restore reconciliation engine
//! - [`config`]: Run settings

pub mod config;
pub mod db;
pub mod files;
pub mod models;
pub mod sync;

// Re-export commonly used types
pub use config::SyncConfig;
pub use db::Database;
pub use files::{DiskFiles, LocalFiles};
pub use models::{Category, FileRef, MedicalRecord, Patient};
pub use sync::{backup, restore, BackupReport, RestoreReport, SyncError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use carebook_drive::{DriveClient, DriveError};
use chrono::NaiveDate;

use sync::{CollectionStore, ProgressEvent, ProgressSink, StaticToken, SyncContext};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CarebookError {
    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Local I/O error: {0}")]
    LocalIoError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<SyncError> for CarebookError {
    fn from(e: SyncError) -> Self {
        let message = e.to_string();
        match e {
            SyncError::Auth(_) => CarebookError::AuthError(message),
            SyncError::Network(_) => CarebookError::NetworkError(message),
            SyncError::NotFound(_) => CarebookError::NotFound(message),
            SyncError::Parse { .. } => CarebookError::ParseError(message),
            SyncError::LocalIo { .. } => CarebookError::LocalIoError(message),
            SyncError::Store(_) => CarebookError::DatabaseError(message),
        }
    }
}

impl From<db::DbError> for CarebookError {
    fn from(e: db::DbError) -> Self {
        CarebookError::DatabaseError(e.to_string())
    }
}

impl From<DriveError> for CarebookError {
    fn from(e: DriveError) -> Self {
        SyncError::from(e).into()
    }
}

impl From<serde_json::Error> for CarebookError {
    fn from(e: serde_json::Error) -> Self {
        CarebookError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CarebookError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CarebookError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a vault: the database at `db_path` plus the watched
/// directories under `files_dir`. `config_json` overrides [`SyncConfig`]
/// defaults.
#[uniffi::export]
pub fn open_vault(
    db_path: String,
    files_dir: String,
    config_json: Option<String>,
) -> Result<Arc<CarebookCore>, CarebookError> {
    let config = match config_json {
        Some(json) => SyncConfig::from_json(&json)?,
        None => SyncConfig::default(),
    };
    let db = Database::open(&db_path)?;
    let drive = DriveClient::new(config.drive.clone())?;
    Ok(Arc::new(CarebookCore {
        db: Arc::new(Mutex::new(db)),
        files: DiskFiles::new(files_dir),
        config,
        drive,
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe vault handle for FFI.
#[derive(uniffi::Object)]
pub struct CarebookCore {
    db: Arc<Mutex<Database>>,
    files: DiskFiles,
    config: SyncConfig,
    drive: DriveClient,
}

#[uniffi::export]
impl CarebookCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Add or update a patient.
    pub fn upsert_patient(&self, patient: FfiPatient) -> Result<(), CarebookError> {
        let patient = Patient::try_from(patient)?;
        let db = self.db.lock()?;
        db.upsert_patient(&patient)?;
        Ok(())
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> Result<Option<FfiPatient>, CarebookError> {
        let db = self.db.lock()?;
        Ok(db.get_patient(id)?.map(Into::into))
    }

    /// All patients, by id.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, CarebookError> {
        let db = self.db.lock()?;
        Ok(db.list_patients()?.into_iter().map(Into::into).collect())
    }

    /// Delete a patient. Returns whether it existed.
    pub fn delete_patient(&self, id: i64) -> Result<bool, CarebookError> {
        let db = self.db.lock()?;
        Ok(db.delete_patient(id)?)
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Add or update a medical record.
    pub fn upsert_record(&self, record: FfiMedicalRecord) -> Result<(), CarebookError> {
        let record = MedicalRecord::try_from(record)?;
        let db = self.db.lock()?;
        db.upsert_record(&record)?;
        Ok(())
    }

    /// All records, oldest first.
    pub fn list_records(&self) -> Result<Vec<FfiMedicalRecord>, CarebookError> {
        let db = self.db.lock()?;
        Ok(db.list_records()?.into_iter().map(Into::into).collect())
    }

    /// Records of one patient, oldest first.
    pub fn list_records_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<FfiMedicalRecord>, CarebookError> {
        let db = self.db.lock()?;
        Ok(db
            .list_records_for_patient(patient_id)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Delete a record. Returns whether it existed.
    pub fn delete_record(&self, id: i64) -> Result<bool, CarebookError> {
        let db = self.db.lock()?;
        Ok(db.delete_record(id)?)
    }

    // =========================================================================
    // File Operations
    // =========================================================================

    /// Store `bytes` as `name` in a watched directory and return its URI.
    ///
    /// `category` is `"avatars"` or `"attachments"`.
    pub fn save_file(
        &self,
        category: String,
        name: String,
        bytes: Vec<u8>,
    ) -> Result<String, CarebookError> {
        let category = Category::from_dir_name(&category)
            .ok_or_else(|| CarebookError::InvalidInput(format!("unknown category {}", category)))?;
        if !files::paths::is_safe_name(&name) {
            return Err(CarebookError::InvalidInput(format!("bad file name {:?}", name)));
        }
        let uri = self.files.category_path(category, &name);
        self.files
            .write(&uri, &bytes)
            .map_err(|e| SyncError::local_io(&uri, e))?;
        Ok(uri)
    }

    // =========================================================================
    // Backup / Restore
    // =========================================================================

    /// Back up to the cloud drive.
    pub fn backup(&self, access_token: String) -> Result<FfiBackupReport, CarebookError> {
        self.run_backup(access_token, &sync::NoProgress)
    }

    /// Back up, reporting progress to `listener`.
    pub fn backup_with_progress(
        &self,
        access_token: String,
        listener: Box<dyn FfiProgressListener>,
    ) -> Result<FfiBackupReport, CarebookError> {
        self.run_backup(access_token, &ListenerSink(listener.as_ref()))
    }

    /// Replace local data with the cloud backup.
    pub fn restore(&self, access_token: String) -> Result<FfiRestoreReport, CarebookError> {
        self.run_restore(access_token, &sync::NoProgress)
    }

    /// Restore, reporting progress to `listener`.
    pub fn restore_with_progress(
        &self,
        access_token: String,
        listener: Box<dyn FfiProgressListener>,
    ) -> Result<FfiRestoreReport, CarebookError> {
        self.run_restore(access_token, &ListenerSink(listener.as_ref()))
    }

    /// RFC 3339 time of the last fully successful backup.
    pub fn last_backup_at(&self) -> Result<Option<String>, CarebookError> {
        let db = self.db.lock()?;
        Ok(db.last_backup_at()?.map(|at| at.to_rfc3339()))
    }
}

impl CarebookCore {
    fn run_backup(
        &self,
        access_token: String,
        progress: &dyn ProgressSink,
    ) -> Result<FfiBackupReport, CarebookError> {
        let db = self.db.lock()?;
        let token = StaticToken::new(access_token);
        let report = sync::backup(&SyncContext {
            remote: &self.drive,
            credentials: &token,
            store: &*db,
            files: &self.files,
            config: &self.config,
            progress,
        })?;
        Ok(report.into())
    }

    fn run_restore(
        &self,
        access_token: String,
        progress: &dyn ProgressSink,
    ) -> Result<FfiRestoreReport, CarebookError> {
        let db = self.db.lock()?;
        let token = StaticToken::new(access_token);
        let report = sync::restore(&SyncContext {
            remote: &self.drive,
            credentials: &token,
            store: &*db,
            files: &self.files,
            config: &self.config,
            progress,
        })?;
        Ok(report.into())
    }
}

// =========================================================================
// Progress Callback
// =========================================================================

/// Progress listener implemented on the app side.
#[uniffi::export(callback_interface)]
pub trait FfiProgressListener: Send + Sync {
    fn on_progress(&self, event: FfiProgressEvent);
}

struct ListenerSink<'a>(&'a dyn FfiProgressListener);

impl ProgressSink for ListenerSink<'_> {
    fn on_progress(&self, event: &ProgressEvent) {
        self.0.on_progress(event.clone().into());
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: i64,
    pub name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
    pub avatar_uri: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            avatar_uri: patient.avatar_uri().map(str::to_string),
            id: patient.id,
            name: patient.name,
            date_of_birth: patient.date_of_birth.map(|d| d.to_string()),
        }
    }
}

impl TryFrom<FfiPatient> for Patient {
    type Error = CarebookError;

    fn try_from(patient: FfiPatient) -> Result<Self, Self::Error> {
        let mut converted = Patient::new(patient.id, patient.name);
        converted.date_of_birth = patient.date_of_birth.as_deref().map(parse_date).transpose()?;
        if let Some(uri) = patient.avatar_uri.filter(|uri| !uri.is_empty()) {
            converted = converted.with_avatar(uri);
        }
        Ok(converted)
    }
}

/// FFI-safe medical record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicalRecord {
    pub id: i64,
    pub patient_id: i64,
    /// `YYYY-MM-DD`
    pub date: String,
    pub category: String,
    pub text: String,
    pub amount: f64,
    pub attachment_uris: Vec<String>,
}

impl From<MedicalRecord> for FfiMedicalRecord {
    fn from(record: MedicalRecord) -> Self {
        Self {
            attachment_uris: record.attachment_uris().map(str::to_string).collect(),
            id: record.id,
            patient_id: record.patient_id,
            date: record.date.to_string(),
            category: record.category,
            text: record.text,
            amount: record.amount,
        }
    }
}

impl TryFrom<FfiMedicalRecord> for MedicalRecord {
    type Error = CarebookError;

    fn try_from(record: FfiMedicalRecord) -> Result<Self, Self::Error> {
        let mut converted = MedicalRecord::new(
            record.id,
            record.patient_id,
            parse_date(&record.date)?,
            record.category,
        );
        converted.text = record.text;
        converted.amount = record.amount;
        converted.attachments = record
            .attachment_uris
            .into_iter()
            .filter(|uri| !uri.is_empty())
            .map(FileRef::new)
            .collect();
        Ok(converted)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, CarebookError> {
    value
        .parse()
        .map_err(|e| CarebookError::InvalidInput(format!("bad date {:?}: {}", value, e)))
}

/// FFI-safe per-item failure.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiItemError {
    pub name: String,
    pub message: String,
}

/// FFI-safe backup outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBackupReport {
    pub success: bool,
    pub uploaded: u32,
    pub skipped: u32,
    pub deleted_remote: u32,
    pub pruned_local: u32,
    pub errors: Vec<FfiItemError>,
    pub completed_at: String,
}

impl From<BackupReport> for FfiBackupReport {
    fn from(report: BackupReport) -> Self {
        Self {
            success: report.success,
            uploaded: report.uploaded as u32,
            skipped: report.skipped as u32,
            deleted_remote: report.deleted_remote as u32,
            pruned_local: report.pruned_local as u32,
            errors: report
                .errors
                .into_iter()
                .map(|e| FfiItemError {
                    name: e.name,
                    message: e.message,
                })
                .collect(),
            completed_at: report.completed_at.to_rfc3339(),
        }
    }
}

/// FFI-safe restore outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRestoreReport {
    pub success: bool,
    pub patients_count: u32,
    pub records_count: u32,
    pub files_restored: u32,
    pub pruned_local: u32,
}

impl From<RestoreReport> for FfiRestoreReport {
    fn from(report: RestoreReport) -> Self {
        Self {
            success: report.success,
            patients_count: report.patients_count as u32,
            records_count: report.records_count as u32,
            files_restored: report.files_restored as u32,
            pruned_local: report.pruned_local as u32,
        }
    }
}

/// FFI-safe progress event.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProgressEvent {
    /// Phase name, e.g. `"Uploading"`
    pub phase: String,
    pub item: Option<String>,
    pub completed: u32,
    pub total: u32,
    pub error: Option<String>,
}

impl From<ProgressEvent> for FfiProgressEvent {
    fn from(event: ProgressEvent) -> Self {
        Self {
            phase: format!("{:?}", event.phase),
            item: event.item,
            completed: event.completed as u32,
            total: event.total as u32,
            error: event.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> Arc<CarebookCore> {
        open_vault(
            dir.path().join("carebook.db").to_string_lossy().to_string(),
            dir.path().join("files").to_string_lossy().to_string(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_patient_round_trip() {
        let dir = TempDir::new().unwrap();
        let core = open(&dir);

        core.upsert_patient(FfiPatient {
            id: 1,
            name: "Ada".into(),
            date_of_birth: Some("1990-05-01".into()),
            avatar_uri: None,
        })
        .unwrap();

        let patient = core.get_patient(1).unwrap().unwrap();
        assert_eq!(patient.name, "Ada");
        assert_eq!(patient.date_of_birth.as_deref(), Some("1990-05-01"));
        assert_eq!(core.list_patients().unwrap().len(), 1);
        assert!(core.delete_patient(1).unwrap());
        assert!(core.get_patient(1).unwrap().is_none());
    }

    #[test]
    fn test_record_with_saved_attachment() {
        let dir = TempDir::new().unwrap();
        let core = open(&dir);

        let uri = core
            .save_file("attachments".into(), "scan.jpg".into(), vec![1, 2, 3])
            .unwrap();
        assert!(uri.ends_with("/attachments/scan.jpg"));

        core.upsert_record(FfiMedicalRecord {
            id: 10,
            patient_id: 1,
            date: "2024-01-15".into(),
            category: "lab".into(),
            text: "bloodwork".into(),
            amount: 42.5,
            attachment_uris: vec![uri.clone()],
        })
        .unwrap();

        let records = core.list_records_for_patient(1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attachment_uris, vec![uri]);
    }

    #[test]
    fn test_invalid_input_rejected() {
        let dir = TempDir::new().unwrap();
        let core = open(&dir);

        let bad_date = core.upsert_record(FfiMedicalRecord {
            id: 1,
            patient_id: 1,
            date: "15/01/2024".into(),
            category: "lab".into(),
            text: String::new(),
            amount: 0.0,
            attachment_uris: vec![],
        });
        assert!(matches!(bad_date, Err(CarebookError::InvalidInput(_))));

        let bad_category = core.save_file("notes".into(), "a.txt".into(), vec![]);
        assert!(matches!(bad_category, Err(CarebookError::InvalidInput(_))));

        for name in ["../a.png", "..", "a\\b.png"] {
            let bad_name = core.save_file("avatars".into(), name.into(), vec![]);
            assert!(matches!(bad_name, Err(CarebookError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_backup_without_token_is_auth_error() {
        let dir = TempDir::new().unwrap();
        let core = open(&dir);
        assert!(matches!(core.backup(String::new()), Err(CarebookError::AuthError(_))));
        assert!(core.last_backup_at().unwrap().is_none());
    }

    #[test]
    fn test_open_vault_rejects_bad_config() {
        let dir = TempDir::new().unwrap();
        let result = open_vault(
            dir.path().join("db").to_string_lossy().to_string(),
            dir.path().to_string_lossy().to_string(),
            Some("{broken".into()),
        );
        assert!(matches!(result, Err(CarebookError::InvalidInput(_))));
    }

    #[test]
    fn test_sync_error_mapping() {
        let err: CarebookError = SyncError::Parse {
            name: "records.json".into(),
            message: "eof".into(),
        }
        .into();
        assert!(matches!(err, CarebookError::ParseError(ref m) if m.contains("records.json")));
    }
}
