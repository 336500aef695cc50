//! Database layer for carebook.
//!
//! The local collection store: patients, medical records and a small
//! key/value table for sync bookkeeping.

mod schema;
mod patients;
mod records;
mod sync_state;

pub use schema::*;
#[allow(unused_imports)]
pub use patients::*;
#[allow(unused_imports)]
pub use records::*;
pub use sync_state::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::models::{MedicalRecord, Patient};

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Replace both collections in one transaction.
    ///
    /// Either every row of the old state is gone and the new state is fully
    /// present, or nothing changed.
    pub fn replace_all(&self, patients: &[Patient], records: &[MedicalRecord]) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM medical_records", [])?;
        tx.execute("DELETE FROM patients", [])?;
        for patient in patients {
            patients::write_patient(&tx, patient)?;
        }
        for record in records {
            records::write_record(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` column value.
fn parse_date(value: &str) -> DbResult<chrono::NaiveDate> {
    value
        .parse()
        .map_err(|e| DbError::InvalidData(format!("bad date {:?}: {}", value, e)))
}
