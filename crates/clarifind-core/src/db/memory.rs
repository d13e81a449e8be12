//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{DbError, DbResult, StorageBackend};

/// Volatile key/value storage with an optional per-value size limit,
/// mirroring the quota a browser enforces on local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any value larger than `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    fn lock(&self) -> DbResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|e| DbError::Poisoned(e.to_string()))
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> DbResult<()> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(DbError::QuotaExceeded {
                    needed: value.len(),
                    quota,
                });
            }
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> DbResult<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }
}
