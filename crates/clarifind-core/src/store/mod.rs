//! Lab result store.
//!
//! The whole collection lives as one JSON document under a single storage
//! key. Every operation re-reads it, applies its change to an id-indexed
//! [`Ledger`] and writes the whole document back.

mod demo;
mod ledger;
mod lifecycle;
mod query;
mod reference;

pub use query::*;
pub use reference::*;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::config::CoreConfig;
use crate::db::{DbError, StorageBackend};
use crate::models::{LabResult, LabResultPatch, ResultStatus};
use crate::upload::{encode_data_uri, format_size, infer_test_type, UploadError, UploadedFile};
use ledger::Ledger;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Version conflict on {id}: expected {expected}, found {found}")]
    Conflict {
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("Invalid status transition {from} -> {to}: {reason}")]
    InvalidTransition {
        from: ResultStatus,
        to: ResultStatus,
        reason: &'static str,
    },

    #[error("Missing information: {0}")]
    MissingInformation(&'static str),

    #[error("No reference numbers left")]
    ReferenceSpaceExhausted,

    #[error("Not permitted for {0}")]
    Forbidden(&'static str),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Storage(DbError::Json(e))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Format a timestamp the way the web client does (`2024-01-14T14:45:00.000Z`).
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Lab result store over a pluggable storage backend.
pub struct LabResultStore<S> {
    backend: S,
    storage_key: String,
    fresh_window: chrono::Duration,
}

impl<S: StorageBackend> LabResultStore<S> {
    /// Create a store with default configuration.
    pub fn new(backend: S) -> Self {
        Self::with_config(backend, &CoreConfig::default())
    }

    pub fn with_config(backend: S, config: &CoreConfig) -> Self {
        Self {
            backend,
            storage_key: config.storage_key.clone(),
            fresh_window: config.fresh_window(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Read the collection. Missing or unreadable storage yields an empty ledger.
    fn load(&self) -> Ledger {
        let stored = match self.backend.get_item(&self.storage_key) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(key = %self.storage_key, error = %e, "Failed to read lab results");
                return Ledger::default();
            }
        };

        match stored {
            Some(json) => Ledger::decode(&json).unwrap_or_else(|e| {
                tracing::warn!(key = %self.storage_key, error = %e, "Discarding corrupt lab results");
                Ledger::default()
            }),
            None => Ledger::default(),
        }
    }

    fn persist(&self, ledger: &Ledger) -> StoreResult<()> {
        let json = ledger.encode()?;
        self.backend.set_item(&self.storage_key, &json)?;
        Ok(())
    }

    /// All records in insertion order.
    pub fn get_all(&self) -> Vec<LabResult> {
        let records = self.load().into_records();
        tracing::debug!(count = records.len(), "Loaded lab results");
        records
    }

    /// Get a record by reference number.
    pub fn get_by_id(&self, id: &str) -> Option<LabResult> {
        self.load().get(id).cloned()
    }

    /// Store a new upload as a pending result.
    pub fn create(&self, file: &UploadedFile, patient_email: &str) -> StoreResult<LabResult> {
        self.create_at(file, patient_email, Utc::now())
    }

    /// Store a new upload with an explicit upload time.
    pub fn create_at(
        &self,
        file: &UploadedFile,
        patient_email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<LabResult> {
        let mut ledger = self.load();
        let id = generate_reference(now.timestamp_millis(), |c| ledger.contains(c))?;

        let result = LabResult {
            id,
            patient_email: patient_email.to_string(),
            file_name: file.name.clone(),
            file_data: encode_data_uri(&file.bytes, &file.mime_type),
            file_type: file.mime_type.clone(),
            file_size: format_size(file.size()),
            upload_date: iso_timestamp(now),
            status: ResultStatus::Pending,
            test_type: infer_test_type(&file.name).to_string(),
            interpretation: None,
            assigned_doctor: None,
            assigned_at: None,
            priority: None,
            version: 1,
        };

        ledger.push(result.clone());
        self.persist(&ledger)?;

        tracing::info!(
            id = %result.id,
            test_type = %result.test_type,
            size = %result.file_size,
            "Saved lab result"
        );
        Ok(result)
    }

    /// Read a file from disk and store it as a new result.
    pub fn create_from_path<P: AsRef<Path>>(
        &self,
        path: P,
        mime_type: &str,
        patient_email: &str,
    ) -> StoreResult<LabResult> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(UploadError::Read)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.create(&UploadedFile::new(name, mime_type, bytes), patient_email)
    }

    /// Merge `patch` into the record with `id`. `None` if no such record.
    pub fn update(&self, id: &str, patch: LabResultPatch) -> StoreResult<Option<LabResult>> {
        self.update_with(id, patch, None)
    }

    /// Like [`update`](Self::update), but fail with [`StoreError::Conflict`]
    /// if the record changed since `expected_version` was read.
    pub fn update_checked(
        &self,
        id: &str,
        expected_version: u64,
        patch: LabResultPatch,
    ) -> StoreResult<Option<LabResult>> {
        self.update_with(id, patch, Some(expected_version))
    }

    pub(crate) fn update_with(
        &self,
        id: &str,
        patch: LabResultPatch,
        expected_version: Option<u64>,
    ) -> StoreResult<Option<LabResult>> {
        self.modify(id, |record| {
            if let Some(expected) = expected_version {
                if record.version != expected {
                    return Err(StoreError::Conflict {
                        id: record.id.clone(),
                        expected,
                        found: record.version,
                    });
                }
            }
            Ok(patch)
        })
    }

    /// Derive a patch from the current record and apply it, all against a
    /// single read of the collection.
    pub(crate) fn modify<F>(&self, id: &str, build_patch: F) -> StoreResult<Option<LabResult>>
    where
        F: FnOnce(&LabResult) -> StoreResult<LabResultPatch>,
    {
        let mut ledger = self.load();
        let Some(record) = ledger.get_mut(id) else {
            tracing::debug!(id, "Update skipped, no such lab result");
            return Ok(None);
        };

        let patch = build_patch(record)?;
        record.apply(patch);
        record.version += 1;
        let updated = record.clone();

        self.persist(&ledger)?;
        tracing::debug!(id, version = updated.version, "Updated lab result");
        Ok(Some(updated))
    }

    /// Remove a record. Returns whether one was removed.
    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut ledger = self.load();
        if !ledger.remove(id) {
            return Ok(false);
        }
        self.persist(&ledger)?;
        tracing::info!(id, "Deleted lab result");
        Ok(true)
    }

    /// Overwrite the whole collection.
    pub fn replace_all(&self, records: Vec<LabResult>) -> StoreResult<()> {
        self.persist(&Ledger::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, MemoryStorage};

    fn setup_store() -> LabResultStore<MemoryStorage> {
        LabResultStore::new(MemoryStorage::new())
    }

    fn cbc_file() -> UploadedFile {
        UploadedFile::new("CBC_Results.pdf", "application/pdf", b"%PDF-1.4".to_vec())
    }

    #[test]
    fn test_create_pending_result() {
        let store = setup_store();
        let result = store.create(&cbc_file(), "john.doe@email.com").unwrap();

        assert!(is_reference(&result.id));
        assert_eq!(result.status, ResultStatus::Pending);
        assert_eq!(result.test_type, "Complete Blood Count");
        assert_eq!(result.file_size, "8 Bytes");
        assert_eq!(result.file_data, "data:application/pdf;base64,JVBERi0xLjQ=");
        assert_eq!(result.version, 1);
        assert!(result.upload_date.ends_with('Z'));
    }

    #[test]
    fn test_create_same_millisecond_gets_unique_ids() {
        let store = setup_store();
        let now = Utc::now();
        let a = store.create_at(&cbc_file(), "a@email.com", now).unwrap();
        let b = store.create_at(&cbc_file(), "b@email.com", now).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.get_all().len(), 2);
    }

    #[test]
    fn test_get_all_preserves_insertion_order() {
        let store = setup_store();
        let now = Utc::now();
        let ids: Vec<String> = (0..3)
            .map(|i| {
                let at = now + chrono::Duration::milliseconds(i * 7);
                store.create_at(&cbc_file(), "a@email.com", at).unwrap().id
            })
            .collect();

        let stored: Vec<String> = store.get_all().into_iter().map(|r| r.id).collect();
        assert_eq!(stored, ids);
    }

    #[test]
    fn test_corrupt_storage_reads_as_empty() {
        let store = setup_store();
        store
            .backend()
            .set_item(crate::config::DEFAULT_STORAGE_KEY, "{not json")
            .unwrap();
        assert!(store.get_all().is_empty());
        assert!(store.get_by_id("CLR-000001").is_none());
    }

    #[test]
    fn test_update_missing_id_returns_none() {
        let store = setup_store();
        let patch = LabResultPatch::default().status(ResultStatus::Completed);
        assert!(store.update("CLR-404404", patch).unwrap().is_none());
    }

    #[test]
    fn test_update_bumps_version() {
        let store = setup_store();
        let created = store.create(&cbc_file(), "a@email.com").unwrap();

        let updated = store
            .update(&created.id, LabResultPatch::default().interpretation("ok"))
            .unwrap()
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.interpretation.as_deref(), Some("ok"));
        assert_eq!(store.get_by_id(&created.id).unwrap(), updated);
    }

    #[test]
    fn test_update_checked_detects_stale_version() {
        let store = setup_store();
        let created = store.create(&cbc_file(), "a@email.com").unwrap();

        // Another writer gets there first
        store
            .update(&created.id, LabResultPatch::default().interpretation("first"))
            .unwrap();

        let result = store.update_checked(
            &created.id,
            created.version,
            LabResultPatch::default().interpretation("second"),
        );
        assert!(matches!(
            result,
            Err(StoreError::Conflict { expected: 1, found: 2, .. })
        ));
        assert_eq!(
            store.get_by_id(&created.id).unwrap().interpretation.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn test_delete() {
        let store = setup_store();
        let created = store.create(&cbc_file(), "a@email.com").unwrap();

        assert!(store.delete(&created.id).unwrap());
        assert!(!store.delete(&created.id).unwrap());
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn test_create_fails_when_storage_full() {
        let store = LabResultStore::new(MemoryStorage::with_quota(64));
        let result = store.create(&cbc_file(), "a@email.com");
        assert!(matches!(
            result,
            Err(StoreError::Storage(DbError::QuotaExceeded { .. }))
        ));
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn test_sqlite_backend() {
        let store = LabResultStore::new(Database::open_in_memory().unwrap());
        let created = store.create(&cbc_file(), "a@email.com").unwrap();
        assert_eq!(store.get_by_id(&created.id).unwrap(), created);
    }

    #[test]
    fn test_custom_storage_key() {
        let config = CoreConfig {
            storage_key: "other_key".into(),
            ..Default::default()
        };
        let store = LabResultStore::with_config(MemoryStorage::new(), &config);
        store.create(&cbc_file(), "a@email.com").unwrap();

        assert!(store.backend().get_item("other_key").unwrap().is_some());
        assert!(store
            .backend()
            .get_item(crate::config::DEFAULT_STORAGE_KEY)
            .unwrap()
            .is_none());
    }
}
