//! Local collection store seam.

use chrono::{DateTime, Utc};

use super::{SyncError, SyncResult};
use crate::db::{Database, DbError, LAST_BACKUP_KEY, LAST_RESTORE_KEY};
use crate::models::{MedicalRecord, Patient};

/// Read-all / replace-all access to the two collections.
pub trait CollectionStore {
    fn read_patients(&self) -> SyncResult<Vec<Patient>>;

    fn read_records(&self) -> SyncResult<Vec<MedicalRecord>>;

    /// Replace both collections as one unit. On error nothing changed.
    fn replace_all(&self, patients: &[Patient], records: &[MedicalRecord]) -> SyncResult<()>;

    fn last_backup_at(&self) -> SyncResult<Option<DateTime<Utc>>>;

    fn set_last_backup_at(&self, at: DateTime<Utc>) -> SyncResult<()>;

    fn set_last_restore_at(&self, at: DateTime<Utc>) -> SyncResult<()>;
}

impl CollectionStore for Database {
    fn read_patients(&self) -> SyncResult<Vec<Patient>> {
        Ok(self.list_patients()?)
    }

    fn read_records(&self) -> SyncResult<Vec<MedicalRecord>> {
        Ok(self.list_records()?)
    }

    fn replace_all(&self, patients: &[Patient], records: &[MedicalRecord]) -> SyncResult<()> {
        Ok(Database::replace_all(self, patients, records)?)
    }

    fn last_backup_at(&self) -> SyncResult<Option<DateTime<Utc>>> {
        match self.get_sync_state(LAST_BACKUP_KEY)? {
            Some(value) => {
                let at = DateTime::parse_from_rfc3339(&value).map_err(|e| {
                    SyncError::Store(DbError::InvalidData(format!(
                        "bad {} {:?}: {}",
                        LAST_BACKUP_KEY, value, e
                    )))
                })?;
                Ok(Some(at.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    fn set_last_backup_at(&self, at: DateTime<Utc>) -> SyncResult<()> {
        Ok(self.set_sync_state(LAST_BACKUP_KEY, &at.to_rfc3339())?)
    }

    fn set_last_restore_at(&self, at: DateTime<Utc>) -> SyncResult<()> {
        Ok(self.set_sync_state(LAST_RESTORE_KEY, &at.to_rfc3339())?)
    }
}
