//! SQLite schema definition.

/// Complete database schema for carebook.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    date_of_birth TEXT,                          -- YYYY-MM-DD
    avatar TEXT,                                 -- JSON FileRef
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);

-- ============================================================================
-- Medical Records
-- ============================================================================

-- patient_id is deliberately not a foreign key: a restore replaces both
-- tables wholesale and the app owns referential consistency.
CREATE TABLE IF NOT EXISTS medical_records (
    id INTEGER PRIMARY KEY,
    patient_id INTEGER NOT NULL,
    date TEXT NOT NULL,                          -- YYYY-MM-DD
    category TEXT NOT NULL DEFAULT '',
    text TEXT NOT NULL DEFAULT '',
    amount REAL NOT NULL DEFAULT 0,
    attachments TEXT NOT NULL DEFAULT '[]',      -- JSON array of FileRef
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_records_patient ON medical_records(patient_id);
CREATE INDEX IF NOT EXISTS idx_records_date ON medical_records(date);

-- ============================================================================
-- Sync State
-- ============================================================================

CREATE TABLE IF NOT EXISTS sync_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

INSERT OR IGNORE INTO sync_state (key, value) VALUES ('last_backup_at', '');
INSERT OR IGNORE INTO sync_state (key, value) VALUES ('last_restore_at', '');
"#;
