//! Clarifind Core Library
//!
//! Local-first lab-result review: patients upload result files, doctors
//! claim them, review them and send back an interpretation.
//!
//! # Architecture
//!
//! ```text
//!   Patient upload ──▶ validate ──▶ encode (data URI) ──▶ [pending]
//!                                                            │
//!                                               Doctor claims (assign)
//!                                                            │
//!                                                      [in-review] ◀── save draft
//!                                                            │
//!                                                 send interpretation
//!                                                            │
//!                                                      [completed]
//!
//!   every step:  read collection ──▶ mutate ledger ──▶ write collection
//!                          (one JSON document under one storage key)
//! ```
//!
//! # Modules
//!
//! - [`db`]: storage backends (SQLite, in-memory) behind [`db::StorageBackend`]
//! - [`models`]: domain types (LabResult, Doctor, Principal)
//! - [`store`]: record store, lifecycle operations and queries
//! - [`upload`]: upload validation, data URI encoding, test type inference
//! - [`config`]: runtime configuration
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod store;
pub mod upload;

// Re-export commonly used types
pub use crate::config::CoreConfig;
pub use db::{Database, MemoryStorage, StorageBackend};
pub use models::{
    Capability, Doctor, LabResult, LabResultPatch, Principal, Priority, ResultStatus,
};
pub use store::{DashboardSummary, LabResultStore, StoreError};
pub use upload::{UploadLimits, UploadedFile};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClarifindError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing information: {0}")]
    MissingInformation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for ClarifindError {
    fn from(e: db::DbError) -> Self {
        ClarifindError::DatabaseError(e.to_string())
    }
}

impl From<upload::UploadError> for ClarifindError {
    fn from(e: upload::UploadError) -> Self {
        ClarifindError::InvalidInput(e.to_string())
    }
}

impl From<StoreError> for ClarifindError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Storage(e) => e.into(),
            StoreError::Upload(e) => e.into(),
            StoreError::Conflict { .. } => ClarifindError::Conflict(e.to_string()),
            StoreError::InvalidTransition { .. } => ClarifindError::InvalidInput(e.to_string()),
            StoreError::MissingInformation(_) => ClarifindError::MissingInformation(e.to_string()),
            StoreError::ReferenceSpaceExhausted => ClarifindError::DatabaseError(e.to_string()),
            StoreError::Forbidden(_) => ClarifindError::Forbidden(e.to_string()),
        }
    }
}

impl From<::config::ConfigError> for ClarifindError {
    fn from(e: ::config::ConfigError) -> Self {
        ClarifindError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClarifindError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClarifindError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
///
/// Configuration is read from `config_path` (if given) and `CLARIFIND_*`
/// environment variables. Logging is installed with the configured filter
/// unless the host already installed a subscriber.
#[uniffi::export]
pub fn open_database(
    path: String,
    config_path: Option<String>,
) -> Result<Arc<ClarifindCore>, ClarifindError> {
    let config = CoreConfig::load(config_path.as_deref().map(Path::new))?;
    logging::init_logging(&config.log_filter);
    let db = Database::open(&path)?;
    tracing::info!(path = %path, "Opened lab result database");
    Ok(Arc::new(ClarifindCore::new(db, &config)))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<ClarifindCore>, ClarifindError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(ClarifindCore::new(db, &CoreConfig::default())))
}

/// The doctors results can be assigned to.
#[uniffi::export]
pub fn available_doctors() -> Vec<FfiDoctor> {
    models::available_doctors()
        .into_iter()
        .map(|d| d.into())
        .collect()
}

/// Install the log subscriber. Returns `false` if one was already installed.
#[uniffi::export]
pub fn enable_logging(filter: String) -> bool {
    logging::init_logging(&filter)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe store wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClarifindCore {
    store: Arc<Mutex<LabResultStore<Database>>>,
    limits: UploadLimits,
    refresh_interval_secs: u64,
}

impl ClarifindCore {
    fn new(db: Database, config: &CoreConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(LabResultStore::with_config(db, config))),
            limits: UploadLimits::from(config),
            refresh_interval_secs: config.refresh_interval_secs,
        }
    }
}

/// Fail unless `principal` holds `capability`.
fn require(principal: &Principal, capability: Capability) -> Result<(), ClarifindError> {
    if principal.allows(capability) {
        Ok(())
    } else {
        tracing::warn!(principal = principal.kind(), ?capability, "Capability denied");
        Err(StoreError::Forbidden(principal.kind()).into())
    }
}

/// The doctor behind a principal that passed a doctor-only capability check.
fn require_doctor(principal: &Principal) -> Result<&Doctor, ClarifindError> {
    principal
        .as_doctor()
        .ok_or_else(|| StoreError::Forbidden(principal.kind()).into())
}

fn to_ffi(results: Vec<LabResult>) -> Vec<FfiLabResult> {
    results.into_iter().map(|r| r.into()).collect()
}

#[uniffi::export]
impl ClarifindCore {
    // =========================================================================
    // Upload Operations
    // =========================================================================

    /// Validate and store a patient's upload.
    pub fn upload_lab_result(
        &self,
        principal: FfiPrincipal,
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    ) -> Result<FfiLabResult, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::Upload)?;
        let Principal::Patient { email } = &principal else {
            return Err(StoreError::Forbidden(principal.kind()).into());
        };

        let file = UploadedFile::new(file_name, mime_type, bytes);
        upload::validate_upload(&file, email, &self.limits)?;

        let store = self.store.lock()?;
        let result = store.create(&file, email)?;
        Ok(result.into())
    }

    /// Stored file content, decoded for download.
    pub fn download_lab_result(
        &self,
        principal: FfiPrincipal,
        id: String,
    ) -> Result<FfiFileContent, ClarifindError> {
        let result = self
            .get_lab_result(principal, id.clone())?
            .ok_or(ClarifindError::NotFound(id))?;
        let (mime_type, bytes) = upload::decode_data_uri(&result.file_data)?;
        Ok(FfiFileContent {
            file_name: result.file_name,
            mime_type,
            bytes,
        })
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Get a result by reference number, if visible to the principal.
    pub fn get_lab_result(
        &self,
        principal: FfiPrincipal,
        id: String,
    ) -> Result<Option<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::ViewOwn)?;
        let store = self.store.lock()?;
        Ok(store
            .get_by_id(&id)
            .filter(|r| principal.can_view(r))
            .map(|r| r.into()))
    }

    /// All results for doctors; a patient's own uploads for patients.
    pub fn list_lab_results(
        &self,
        principal: FfiPrincipal,
    ) -> Result<Vec<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        let store = self.store.lock()?;
        let results = match &principal {
            Principal::Doctor(_) => {
                require(&principal, Capability::ViewAll)?;
                store.get_all()
            }
            Principal::Patient { email } => {
                require(&principal, Capability::ViewOwn)?;
                store.by_patient_email(email)
            }
        };
        Ok(to_ffi(results))
    }

    /// Fresh pending results the requesting doctor may claim.
    pub fn fresh_results(&self, principal: FfiPrincipal) -> Result<Vec<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::ViewAll)?;
        let doctor = require_doctor(&principal)?;
        let store = self.store.lock()?;
        Ok(to_ffi(store.fresh(Some(&doctor.id))))
    }

    /// Results with a status; `mine_only` restricts to the requesting doctor.
    pub fn results_by_status(
        &self,
        principal: FfiPrincipal,
        status: FfiResultStatus,
        mine_only: bool,
    ) -> Result<Vec<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::ViewAll)?;
        let doctor = require_doctor(&principal)?;
        let store = self.store.lock()?;
        let doctor_id = mine_only.then_some(doctor.id.as_str());
        Ok(to_ffi(store.by_status_and_doctor(status.into(), doctor_id)))
    }

    pub fn unassigned_results(
        &self,
        principal: FfiPrincipal,
    ) -> Result<Vec<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::ViewAll)?;
        let store = self.store.lock()?;
        Ok(to_ffi(store.unassigned()))
    }

    /// Results currently held by the requesting doctor.
    pub fn my_results(&self, principal: FfiPrincipal) -> Result<Vec<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::ViewAll)?;
        let doctor = require_doctor(&principal)?;
        let store = self.store.lock()?;
        Ok(to_ffi(store.by_doctor(&doctor.id)))
    }

    /// Search by patient email, file name or reference number.
    pub fn search_lab_results(
        &self,
        principal: FfiPrincipal,
        query: String,
    ) -> Result<Vec<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::ViewOwn)?;
        let store = self.store.lock()?;
        let results = store
            .search(&query)
            .into_iter()
            .filter(|r| principal.can_view(r))
            .collect();
        Ok(to_ffi(results))
    }

    pub fn dashboard_summary(
        &self,
        principal: FfiPrincipal,
    ) -> Result<FfiDashboardSummary, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::ViewAll)?;
        let doctor = require_doctor(&principal)?;
        let store = self.store.lock()?;
        Ok(store.summary(Some(&doctor.id)).into())
    }

    /// Polling interval the dashboard should refresh at.
    pub fn refresh_interval_secs(&self) -> u64 {
        self.refresh_interval_secs
    }

    // =========================================================================
    // Lifecycle Operations
    // =========================================================================

    /// Claim a result for the requesting doctor, who must be on the roster.
    pub fn claim_lab_result(
        &self,
        principal: FfiPrincipal,
        id: String,
    ) -> Result<Option<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::Assign)?;
        let doctor_id = require_doctor(&principal)?.id.clone();
        let doctor = models::find_doctor(&doctor_id).ok_or(ClarifindError::NotFound(doctor_id))?;
        let store = self.store.lock()?;
        Ok(store.assign(&id, &doctor)?.map(|r| r.into()))
    }

    /// Assign a result to a doctor from the roster.
    pub fn assign_lab_result(
        &self,
        principal: FfiPrincipal,
        id: String,
        doctor_id: String,
    ) -> Result<Option<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::Assign)?;
        let doctor = models::find_doctor(&doctor_id).ok_or(ClarifindError::NotFound(doctor_id))?;
        let store = self.store.lock()?;
        Ok(store.assign(&id, &doctor)?.map(|r| r.into()))
    }

    pub fn unassign_lab_result(
        &self,
        principal: FfiPrincipal,
        id: String,
    ) -> Result<Option<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::Assign)?;
        let store = self.store.lock()?;
        Ok(store.unassign(&id)?.map(|r| r.into()))
    }

    pub fn update_status(
        &self,
        principal: FfiPrincipal,
        id: String,
        status: FfiResultStatus,
    ) -> Result<Option<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::Review)?;
        let store = self.store.lock()?;
        Ok(store.update_status(&id, status.into())?.map(|r| r.into()))
    }

    /// Send the final interpretation; completes the result.
    ///
    /// With `expected_version`, fails with `Conflict` if the result changed
    /// since the caller read it.
    pub fn send_interpretation(
        &self,
        principal: FfiPrincipal,
        id: String,
        text: String,
        expected_version: Option<u64>,
    ) -> Result<Option<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::Review)?;
        let store = self.store.lock()?;
        let sent = match expected_version {
            Some(version) => store.send_interpretation_checked(&id, version, &text)?,
            None => store.send_interpretation(&id, &text)?,
        };
        Ok(sent.map(|r| r.into()))
    }

    pub fn save_draft(
        &self,
        principal: FfiPrincipal,
        id: String,
        text: String,
        expected_version: Option<u64>,
    ) -> Result<Option<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::Review)?;
        let store = self.store.lock()?;
        let saved = match expected_version {
            Some(version) => store.save_draft_checked(&id, version, &text)?,
            None => store.save_draft(&id, &text)?,
        };
        Ok(saved.map(|r| r.into()))
    }

    pub fn set_priority(
        &self,
        principal: FfiPrincipal,
        id: String,
        priority: FfiPriority,
    ) -> Result<Option<FfiLabResult>, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::Review)?;
        let store = self.store.lock()?;
        Ok(store.set_priority(&id, priority.into())?.map(|r| r.into()))
    }

    pub fn delete_lab_result(
        &self,
        principal: FfiPrincipal,
        id: String,
    ) -> Result<bool, ClarifindError> {
        let principal: Principal = principal.into();
        require(&principal, Capability::Delete)?;
        let store = self.store.lock()?;
        Ok(store.delete(&id)?)
    }

    /// Seed demo data into an empty store.
    pub fn initialize_demo_data(&self) -> Result<bool, ClarifindError> {
        let store = self.store.lock()?;
        Ok(store.initialize_demo_data()?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe doctor.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiDoctor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub specialization: Option<String>,
}

impl From<Doctor> for FfiDoctor {
    fn from(doctor: Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name,
            email: doctor.email,
            specialization: doctor.specialization,
        }
    }
}

impl From<FfiDoctor> for Doctor {
    fn from(doctor: FfiDoctor) -> Self {
        Doctor {
            id: doctor.id,
            name: doctor.name,
            email: doctor.email,
            specialization: doctor.specialization,
        }
    }
}

/// FFI-safe principal.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiPrincipal {
    Patient { email: String },
    Doctor { doctor: FfiDoctor },
}

impl From<FfiPrincipal> for Principal {
    fn from(principal: FfiPrincipal) -> Self {
        match principal {
            FfiPrincipal::Patient { email } => Principal::Patient { email },
            FfiPrincipal::Doctor { doctor } => Principal::Doctor(doctor.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiResultStatus {
    Pending,
    InReview,
    Completed,
}

impl From<ResultStatus> for FfiResultStatus {
    fn from(status: ResultStatus) -> Self {
        match status {
            ResultStatus::Pending => FfiResultStatus::Pending,
            ResultStatus::InReview => FfiResultStatus::InReview,
            ResultStatus::Completed => FfiResultStatus::Completed,
        }
    }
}

impl From<FfiResultStatus> for ResultStatus {
    fn from(status: FfiResultStatus) -> Self {
        match status {
            FfiResultStatus::Pending => ResultStatus::Pending,
            FfiResultStatus::InReview => ResultStatus::InReview,
            FfiResultStatus::Completed => ResultStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl From<Priority> for FfiPriority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => FfiPriority::Low,
            Priority::Normal => FfiPriority::Normal,
            Priority::High => FfiPriority::High,
            Priority::Urgent => FfiPriority::Urgent,
        }
    }
}

impl From<FfiPriority> for Priority {
    fn from(priority: FfiPriority) -> Self {
        match priority {
            FfiPriority::Low => Priority::Low,
            FfiPriority::Normal => Priority::Normal,
            FfiPriority::High => Priority::High,
            FfiPriority::Urgent => Priority::Urgent,
        }
    }
}

/// FFI-safe lab result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLabResult {
    pub id: String,
    pub patient_email: String,
    pub file_name: String,
    pub file_data: String,
    pub file_type: String,
    pub file_size: String,
    pub upload_date: String,
    pub status: FfiResultStatus,
    pub test_type: String,
    pub interpretation: Option<String>,
    pub assigned_doctor: Option<FfiDoctor>,
    pub assigned_at: Option<String>,
    /// Unset priority is reported as `Normal`
    pub priority: FfiPriority,
    pub version: u64,
}

impl From<LabResult> for FfiLabResult {
    fn from(result: LabResult) -> Self {
        let priority = result.effective_priority().into();
        Self {
            id: result.id,
            patient_email: result.patient_email,
            file_name: result.file_name,
            file_data: result.file_data,
            file_type: result.file_type,
            file_size: result.file_size,
            upload_date: result.upload_date,
            status: result.status.into(),
            test_type: result.test_type,
            interpretation: result.interpretation,
            assigned_doctor: result.assigned_doctor.map(|d| d.into()),
            assigned_at: result.assigned_at,
            priority,
            version: result.version,
        }
    }
}

/// Decoded file for download.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFileContent {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// FFI-safe dashboard counts.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FfiDashboardSummary {
    pub total: u64,
    pub fresh: u64,
    pub pending: u64,
    pub in_review: u64,
    pub completed: u64,
    pub assigned_to_me: u64,
}

impl From<DashboardSummary> for FfiDashboardSummary {
    fn from(summary: DashboardSummary) -> Self {
        Self {
            total: summary.total as u64,
            fresh: summary.fresh as u64,
            pending: summary.pending as u64,
            in_review: summary.in_review as u64,
            completed: summary.completed as u64,
            assigned_to_me: summary.assigned_to_doctor as u64,
        }
    }
}
