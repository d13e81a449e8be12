//! Local-storage operations backed by SQLite.

use rusqlite::OptionalExtension;

use super::{Database, DbResult, StorageBackend};

impl StorageBackend for Database {
    fn get_item(&self, key: &str) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn set_item(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            [key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM local_storage WHERE key = ?", [key])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_get_missing_key() {
        let db = setup_db();
        assert_eq!(db.get_item("nothing").unwrap(), None);
    }

    #[test]
    fn test_set_and_overwrite() {
        let db = setup_db();

        db.set_item("results", "[]").unwrap();
        assert_eq!(db.get_item("results").unwrap().as_deref(), Some("[]"));

        db.set_item("results", r#"[{"id":"CLR-000001"}]"#).unwrap();
        assert_eq!(
            db.get_item("results").unwrap().as_deref(),
            Some(r#"[{"id":"CLR-000001"}]"#)
        );
    }

    #[test]
    fn test_remove_item() {
        let db = setup_db();
        db.set_item("results", "[]").unwrap();

        assert!(db.remove_item("results").unwrap());
        assert!(!db.remove_item("results").unwrap());
        assert_eq!(db.get_item("results").unwrap(), None);
    }
}
