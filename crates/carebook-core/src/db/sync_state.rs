//! Sync bookkeeping key/value operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};

/// Key holding the RFC 3339 time of the last fully successful backup.
pub const LAST_BACKUP_KEY: &str = "last_backup_at";

/// Key holding the RFC 3339 time of the last committed restore.
pub const LAST_RESTORE_KEY: &str = "last_restore_at";

impl Database {
    /// Get sync state value. Empty strings are stored as "unset".
    pub fn get_sync_state(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM sync_state WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    /// Set sync state value.
    pub fn set_sync_state(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_state (key, value, updated_at) VALUES (?, ?, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }
}
