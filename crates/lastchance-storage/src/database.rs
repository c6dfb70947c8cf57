//! Database connection and operations

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::Result;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode so timer tasks never block the writer
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, updated_at],
            )?;
            Ok(())
        })?;

        Ok(())
    }

    /// Write a group of settings keys in one transaction.
    ///
    /// The progress keys reference each other, so a partial write must never
    /// reach disk. A crash between per-key upserts would leave a store the
    /// consistency check can only resolve by erasing everything.
    pub fn set_settings(&self, entries: &[(&str, &str)]) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, updated_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove a group of settings keys in one transaction.
    ///
    /// Progress keys must never be cleared independently, so failure resets
    /// go through here rather than through per-key deletes.
    pub fn clear_settings(&self, keys: &[&str]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let count: i32 =
                conn.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_settings_roundtrip() {
        let db = Database::open_in_memory().unwrap();

        assert!(db.get_setting("theme").unwrap().is_none());

        db.set_setting("theme", "dark").unwrap();
        assert_eq!(db.get_setting("theme").unwrap().as_deref(), Some("dark"));

        // Overwrite
        db.set_setting("theme", "light").unwrap();
        assert_eq!(db.get_setting("theme").unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn test_set_settings_writes_the_whole_group() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("streak", "1").unwrap();

        db.set_settings(&[
            ("history", "I tried."),
            ("streak", "2"),
            ("last_write", "2026-01-02T00:00:00Z"),
        ])
        .unwrap();

        assert_eq!(db.get_setting("history").unwrap().as_deref(), Some("I tried."));
        assert_eq!(db.get_setting("streak").unwrap().as_deref(), Some("2"));
        assert_eq!(
            db.get_setting("last_write").unwrap().as_deref(),
            Some("2026-01-02T00:00:00Z")
        );
    }

    #[test]
    fn test_clear_settings_is_atomic_group() {
        let db = Database::open_in_memory().unwrap();

        db.set_setting("history", "I tried.").unwrap();
        db.set_setting("streak", "1").unwrap();
        db.set_setting("last_write", "2026-01-01T00:00:00Z").unwrap();
        db.set_setting("theme", "dark").unwrap();

        db.clear_settings(&["history", "streak", "last_write"])
            .unwrap();

        assert!(db.get_setting("history").unwrap().is_none());
        assert!(db.get_setting("streak").unwrap().is_none());
        assert!(db.get_setting("last_write").unwrap().is_none());
        // Theme survives a progress wipe
        assert_eq!(db.get_setting("theme").unwrap().as_deref(), Some("dark"));
    }
}
