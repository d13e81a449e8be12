//! Demo data for empty installations.

use chrono::{DateTime, Duration, Utc};

use super::{iso_timestamp, LabResultStore, StoreResult};
use crate::db::StorageBackend;
use crate::models::{find_doctor, LabResult, Priority, ResultStatus};

// Truncated PDF header; enough for a viewer to recognise the type.
const DEMO_PDF: &str = "data:application/pdf;base64,JVBERi0xLjQKJcfsj6IKNSAwIG9iago8PAovTGVuZ3RoIDYgMCBSCi9GaWx0ZXIgL0ZsYXRlRGVjb2RlCj4+CnN0cmVhbQp4nDPQM1Qo5ypUMFAw0DMwslAwtTTVMzIxV7AwMdSzUPBIzcnPS1WwUUitKC5JzUvPTFGwUYOCUlJRfgb6BuYKFpo";

const THYROID_INTERPRETATION: &str = "Your thyroid function tests show normal TSH, T3, and T4 levels. \
All values are within the healthy reference ranges, indicating that your thyroid gland is \
functioning properly. Continue with your current lifestyle and follow up as recommended by \
your primary care physician.";

impl<S: StorageBackend> LabResultStore<S> {
    /// Seed demo results if the store is empty. Returns whether data was written.
    pub fn initialize_demo_data(&self) -> StoreResult<bool> {
        self.initialize_demo_data_at(Utc::now())
    }

    pub fn initialize_demo_data_at(&self, now: DateTime<Utc>) -> StoreResult<bool> {
        if !self.load().is_empty() {
            return Ok(false);
        }

        let records = demo_results(now);
        let count = records.len();
        self.replace_all(records)?;
        tracing::info!(count, "Initialized demo lab results");
        Ok(true)
    }
}

struct DemoResult {
    id: &'static str,
    patient_email: &'static str,
    file_name: &'static str,
    upload_date: String,
    status: ResultStatus,
    file_size: &'static str,
    test_type: &'static str,
    doctor_id: Option<&'static str>,
    assigned_at: Option<&'static str>,
    interpretation: Option<&'static str>,
    priority: Priority,
}

impl From<DemoResult> for LabResult {
    fn from(demo: DemoResult) -> Self {
        LabResult {
            id: demo.id.to_string(),
            patient_email: demo.patient_email.to_string(),
            file_name: demo.file_name.to_string(),
            file_data: DEMO_PDF.to_string(),
            file_type: "application/pdf".to_string(),
            file_size: demo.file_size.to_string(),
            upload_date: demo.upload_date,
            status: demo.status,
            test_type: demo.test_type.to_string(),
            interpretation: demo.interpretation.map(str::to_string),
            assigned_doctor: demo.doctor_id.and_then(find_doctor),
            assigned_at: demo.assigned_at.map(str::to_string),
            priority: Some(demo.priority),
            version: 1,
        }
    }
}

fn demo_results(now: DateTime<Utc>) -> Vec<LabResult> {
    vec![
        DemoResult {
            id: "CLR-123456",
            patient_email: "john.doe@email.com",
            file_name: "CBC_Results_Jan2024.pdf",
            upload_date: iso_timestamp(now),
            status: ResultStatus::Pending,
            file_size: "1.2 MB",
            test_type: "Complete Blood Count",
            doctor_id: None,
            assigned_at: None,
            interpretation: None,
            priority: Priority::Normal,
        },
        DemoResult {
            id: "CLR-123457",
            patient_email: "sarah.smith@email.com",
            file_name: "Lipid_Panel_Results.pdf",
            upload_date: "2024-01-14T14:45:00Z".to_string(),
            status: ResultStatus::InReview,
            file_size: "0.8 MB",
            test_type: "Lipid Panel",
            doctor_id: Some("doc-002"),
            assigned_at: Some("2024-01-14T15:00:00Z"),
            interpretation: None,
            priority: Priority::Normal,
        },
        DemoResult {
            id: "CLR-123458",
            patient_email: "mike.jones@email.com",
            file_name: "Thyroid_Function_Test.pdf",
            upload_date: "2024-01-13T09:15:00Z".to_string(),
            status: ResultStatus::Completed,
            file_size: "1.0 MB",
            test_type: "Thyroid Function",
            doctor_id: Some("doc-003"),
            assigned_at: Some("2024-01-13T10:00:00Z"),
            interpretation: Some(THYROID_INTERPRETATION),
            priority: Priority::Normal,
        },
        DemoResult {
            id: "CLR-123459",
            patient_email: "emma.williams@email.com",
            file_name: "Glucose_A1C_Results.pdf",
            upload_date: iso_timestamp(now - Duration::hours(2)),
            status: ResultStatus::Pending,
            file_size: "0.9 MB",
            test_type: "Glucose/Diabetes Panel",
            doctor_id: None,
            assigned_at: None,
            interpretation: None,
            priority: Priority::High,
        },
        DemoResult {
            id: "CLR-123460",
            patient_email: "alex.brown@email.com",
            file_name: "Liver_Function_Panel.pdf",
            upload_date: "2024-01-12T16:30:00Z".to_string(),
            status: ResultStatus::InReview,
            file_size: "1.1 MB",
            test_type: "Liver Function",
            doctor_id: Some("doc-001"),
            assigned_at: Some("2024-01-12T17:00:00Z"),
            interpretation: None,
            priority: Priority::Normal,
        },
    ]
    .into_iter()
    .map(LabResult::from)
    .collect()
}
