//! Portable manifest documents.
//!
//! Backups store both collections as JSON arrays whose file references are
//! relative to the app's base directory. Restoring rewrites them against the
//! local base and re-states each file from disk.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::live_set::LiveSet;
use super::{SyncError, SyncResult};
use crate::files::{paths, LocalFiles};
use crate::models::{Category, FileRef, MedicalRecord, Patient};

/// Patients with avatars rewritten relative to `base`. Avatars not in `live`
/// are left out.
pub fn portable_patients(patients: &[Patient], base: &str, live: &LiveSet) -> Vec<Patient> {
    patients
        .iter()
        .cloned()
        .map(|mut patient| {
            patient.avatar = patient
                .avatar
                .filter(|avatar| live.contains(Category::Avatars, &avatar.local_uri))
                .map(|avatar| to_portable(avatar, base));
            patient
        })
        .collect()
}

/// Records with attachments rewritten relative to `base`. Attachments not in
/// `live` are left out.
pub fn portable_records(records: &[MedicalRecord], base: &str, live: &LiveSet) -> Vec<MedicalRecord> {
    records
        .iter()
        .cloned()
        .map(|mut record| {
            record.attachments = record
                .attachments
                .into_iter()
                .filter(|attachment| live.contains(Category::Attachments, &attachment.local_uri))
                .map(|attachment| to_portable(attachment, base))
                .collect();
            record
        })
        .collect()
}

fn to_portable(file: FileRef, base: &str) -> FileRef {
    FileRef {
        local_uri: paths::to_portable(&file.local_uri, base),
        size: file.size,
    }
}

pub fn encode<T: Serialize>(items: &[T]) -> SyncResult<Vec<u8>> {
    serde_json::to_vec_pretty(items).map_err(|e| SyncError::Parse {
        name: std::any::type_name::<T>().to_string(),
        message: e.to_string(),
    })
}

/// Parse manifest `name`. Anything but a JSON array of `T` is a parse error.
pub fn decode<T: DeserializeOwned>(name: &str, bytes: &[u8]) -> SyncResult<Vec<T>> {
    serde_json::from_slice(bytes).map_err(|e| SyncError::Parse {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// Point avatars at the local base. Avatars whose file is absent are dropped.
pub fn localize_patients(patients: Vec<Patient>, files: &dyn LocalFiles) -> SyncResult<Vec<Patient>> {
    patients
        .into_iter()
        .map(|mut patient| {
            patient.avatar = match patient.avatar.take() {
                Some(avatar) => localize(avatar, files)?,
                None => None,
            };
            Ok(patient)
        })
        .collect()
}

/// Point attachments at the local base. Attachments whose file is absent are dropped.
pub fn localize_records(
    records: Vec<MedicalRecord>,
    files: &dyn LocalFiles,
) -> SyncResult<Vec<MedicalRecord>> {
    records
        .into_iter()
        .map(|mut record| {
            let mut kept = Vec::with_capacity(record.attachments.len());
            for attachment in std::mem::take(&mut record.attachments) {
                if let Some(local) = localize(attachment, files)? {
                    kept.push(local);
                }
            }
            record.attachments = kept;
            Ok(record)
        })
        .collect()
}

fn localize(file: FileRef, files: &dyn LocalFiles) -> SyncResult<Option<FileRef>> {
    if file.local_uri.is_empty() {
        return Ok(None);
    }
    let local_uri = paths::to_local(&file.local_uri, files.base_uri());
    match files
        .stat(&local_uri)
        .map_err(|e| SyncError::local_io(&local_uri, e))?
    {
        Some(size) => Ok(Some(FileRef {
            local_uri,
            size: Some(size),
        })),
        None => {
            warn!(uri = %file.local_uri, "dropping reference to file missing from backup");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::DiskFiles;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const BASE: &str = "/data/app/files/";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_portable_rewrites_paths() {
        let patients = vec![Patient::new(1, "A").with_avatar("/data/app/files/avatars/a.png")];
        let records = vec![MedicalRecord::new(1, 1, date(), "visit")
            .with_attachment("file:///data/app/files/attachments/r1.jpg")];
        let live = LiveSet::compute(&patients, &records, BASE);

        let patients = portable_patients(&patients, BASE, &live);
        let records = portable_records(&records, BASE, &live);
        assert_eq!(patients[0].avatar_uri(), Some("avatars/a.png"));
        assert_eq!(records[0].attachments[0].local_uri, "attachments/r1.jpg");
    }

    #[test]
    fn test_portable_leaves_out_stale_references() {
        let patients = vec![Patient::new(1, "A").with_avatar("/data/app/files/avatars/gone.png")];
        let records = vec![MedicalRecord::new(1, 1, date(), "visit")
            .with_attachment("/tmp/elsewhere/r1.jpg")
            .with_attachment("/data/app/files/attachments/r2.jpg")];
        // The avatar file is gone, as `retain_existing` would have found
        let live = LiveSet::compute(&[], &records, BASE);
        assert_eq!(live.len(), 1);

        let patients = portable_patients(&patients, BASE, &live);
        let records = portable_records(&records, BASE, &live);
        assert!(patients[0].avatar.is_none());
        assert_eq!(records[0].attachments.len(), 1);
        assert_eq!(records[0].attachments[0].local_uri, "attachments/r2.jpg");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let err = decode::<Patient>("patients.json", b"[{\"id\": ").unwrap_err();
        assert!(matches!(err, SyncError::Parse { ref name, .. } if name == "patients.json"));

        let err = decode::<Patient>("patients.json", b"{\"id\": 1}").unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));
    }

    #[test]
    fn test_encode_decode_keeps_camel_case() {
        let bytes = encode(&[Patient::new(7, "Zed").with_avatar("avatars/z.png")]).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"localUri\": \"avatars/z.png\""));

        let back: Vec<Patient> = decode("patients.json", &bytes).unwrap();
        assert_eq!(back[0].id, 7);
    }

    #[test]
    fn test_localize_restates_and_drops_missing() {
        let dir = TempDir::new().unwrap();
        let files = DiskFiles::new(dir.path());
        files
            .write(&files.category_path(Category::Avatars, "a.png"), b"12345")
            .unwrap();

        let patients = vec![
            Patient::new(1, "A").with_avatar("avatars/a.png"),
            Patient::new(2, "B").with_avatar("avatars/missing.png"),
        ];
        let patients = localize_patients(patients, &files).unwrap();

        let avatar = patients[0].avatar.as_ref().unwrap();
        assert_eq!(avatar.local_uri, files.category_path(Category::Avatars, "a.png"));
        assert_eq!(avatar.size, Some(5));
        assert!(patients[1].avatar.is_none());
    }
}
