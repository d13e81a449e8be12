//! Storage layer for clarifind.

mod memory;
mod schema;
mod storage;

pub use memory::*;
pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage lock poisoned: {0}")]
    Poisoned(String),

    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
}

pub type DbResult<T> = Result<T, DbError>;

/// Key/value persistence, shaped like browser local storage.
///
/// Values are whole serialized documents; there is no partial write.
pub trait StorageBackend {
    /// Read the value stored under `key`.
    fn get_item(&self, key: &str) -> DbResult<Option<String>>;

    /// Replace the value stored under `key`.
    fn set_item(&self, key: &str, value: &str) -> DbResult<()>;

    /// Remove `key`. Returns whether anything was removed.
    fn remove_item(&self, key: &str) -> DbResult<bool>;
}

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
}
