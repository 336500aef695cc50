//! Patient database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{parse_date, Database, DbResult};
use crate::models::{FileRef, Patient};

const PATIENT_COLUMNS: &str = "id, name, date_of_birth, avatar";

/// Raw patient row before JSON / date decoding.
struct PatientRow {
    id: i64,
    name: String,
    date_of_birth: Option<String>,
    avatar: Option<String>,
}

impl PatientRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            date_of_birth: row.get(2)?,
            avatar: row.get(3)?,
        })
    }

    fn into_patient(self) -> DbResult<Patient> {
        let date_of_birth = match self.date_of_birth.as_deref() {
            Some(s) if !s.is_empty() => Some(parse_date(s)?),
            _ => None,
        };
        let avatar: Option<FileRef> = match self.avatar.as_deref() {
            Some(s) if !s.is_empty() => Some(serde_json::from_str(s)?),
            _ => None,
        };
        Ok(Patient {
            id: self.id,
            name: self.name,
            date_of_birth,
            avatar,
        })
    }
}

/// Insert a patient; fails if the id is taken.
pub(super) fn write_patient(conn: &Connection, patient: &Patient) -> DbResult<()> {
    execute_patient(conn, "INSERT", patient)
}

fn execute_patient(conn: &Connection, verb: &str, patient: &Patient) -> DbResult<()> {
    let avatar = patient.avatar.as_ref().map(serde_json::to_string).transpose()?;
    conn.execute(
        &format!(
            "{} INTO patients ({}, updated_at) VALUES (?1, ?2, ?3, ?4, datetime('now'))",
            verb, PATIENT_COLUMNS
        ),
        params![
            patient.id,
            patient.name,
            patient.date_of_birth.map(|d| d.to_string()),
            avatar,
        ],
    )?;
    Ok(())
}

impl Database {
    /// Insert or overwrite a patient.
    pub fn upsert_patient(&self, patient: &Patient) -> DbResult<()> {
        execute_patient(&self.conn, "INSERT OR REPLACE", patient)
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                PatientRow::from_row,
            )
            .optional()?;
        row.map(PatientRow::into_patient).transpose()
    }

    /// List all patients.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM patients ORDER BY id", PATIENT_COLUMNS))?;

        let rows = stmt
            .query_map([], PatientRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(PatientRow::into_patient).collect()
    }

    /// Delete a patient. Their records are left for the caller to remove.
    pub fn delete_patient(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut patient = Patient::new(1, "Ada").with_avatar("/files/avatars/ada.png");
        patient.date_of_birth = NaiveDate::from_ymd_opt(1990, 4, 2);
        db.upsert_patient(&patient).unwrap();

        let retrieved = db.get_patient(1).unwrap().unwrap();
        assert_eq!(retrieved, patient);
    }

    #[test]
    fn test_upsert_overwrites() {
        let db = setup_db();

        let mut patient = Patient::new(1, "Ada").with_avatar("/files/avatars/ada.png");
        db.upsert_patient(&patient).unwrap();

        patient.name = "Ada L.".into();
        patient.avatar = None;
        db.upsert_patient(&patient).unwrap();

        let all = db.list_patients().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Ada L.");
        assert!(all[0].avatar.is_none());
    }

    #[test]
    fn test_get_missing() {
        let db = setup_db();
        assert!(db.get_patient(42).unwrap().is_none());
    }

    #[test]
    fn test_delete_patient() {
        let db = setup_db();
        db.upsert_patient(&Patient::new(1, "Ada")).unwrap();

        assert!(db.delete_patient(1).unwrap());
        assert!(!db.delete_patient(1).unwrap());
        assert!(db.list_patients().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_date_is_reported() {
        let db = setup_db();
        db.conn()
            .execute(
                "INSERT INTO patients (id, name, date_of_birth) VALUES (1, 'Ada', 'yesterday')",
                [],
            )
            .unwrap();

        assert!(matches!(
            db.get_patient(1),
            Err(super::super::DbError::InvalidData(_))
        ));
    }
}
