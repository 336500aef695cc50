//! Medical record database operations.

use rusqlite::{params, Connection, Row};

use super::{parse_date, Database, DbResult};
use crate::models::MedicalRecord;

const RECORD_COLUMNS: &str = "id, patient_id, date, category, text, amount, attachments";

/// Raw record row before JSON / date decoding.
struct RecordRow {
    id: i64,
    patient_id: i64,
    date: String,
    category: String,
    text: String,
    amount: f64,
    attachments: String,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            date: row.get(2)?,
            category: row.get(3)?,
            text: row.get(4)?,
            amount: row.get(5)?,
            attachments: row.get(6)?,
        })
    }

    fn into_record(self) -> DbResult<MedicalRecord> {
        Ok(MedicalRecord {
            id: self.id,
            patient_id: self.patient_id,
            date: parse_date(&self.date)?,
            category: self.category,
            text: self.text,
            amount: self.amount,
            attachments: serde_json::from_str(&self.attachments)?,
        })
    }
}

/// Insert a record; fails if the id is taken.
pub(super) fn write_record(conn: &Connection, record: &MedicalRecord) -> DbResult<()> {
    execute_record(conn, "INSERT", record)
}

fn execute_record(conn: &Connection, verb: &str, record: &MedicalRecord) -> DbResult<()> {
    let attachments = serde_json::to_string(&record.attachments)?;
    conn.execute(
        &format!(
            "{} INTO medical_records ({}, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))",
            verb, RECORD_COLUMNS
        ),
        params![
            record.id,
            record.patient_id,
            record.date.to_string(),
            record.category,
            record.text,
            record.amount,
            attachments,
        ],
    )?;
    Ok(())
}

impl Database {
    /// Insert or overwrite a record.
    pub fn upsert_record(&self, record: &MedicalRecord) -> DbResult<()> {
        execute_record(&self.conn, "INSERT OR REPLACE", record)
    }

    /// List all records, oldest first.
    pub fn list_records(&self) -> DbResult<Vec<MedicalRecord>> {
        self.query_records(
            &format!("SELECT {} FROM medical_records ORDER BY date, id", RECORD_COLUMNS),
            params![],
        )
    }

    /// List one patient's records, oldest first.
    pub fn list_records_for_patient(&self, patient_id: i64) -> DbResult<Vec<MedicalRecord>> {
        self.query_records(
            &format!(
                "SELECT {} FROM medical_records WHERE patient_id = ? ORDER BY date, id",
                RECORD_COLUMNS
            ),
            params![patient_id],
        )
    }

    /// Delete a record.
    pub fn delete_record(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medical_records WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    fn query_records(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> DbResult<Vec<MedicalRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }
}
