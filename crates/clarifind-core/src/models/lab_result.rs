//! Lab result models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::doctor::Doctor;

/// Review status of a lab result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ResultStatus {
    /// Uploaded, waiting for a doctor to claim it
    Pending,
    /// Claimed by a doctor
    InReview,
    /// Interpretation sent to the patient
    Completed,
}

impl ResultStatus {
    /// Wire name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Pending => "pending",
            ResultStatus::InReview => "in-review",
            ResultStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triage priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A single uploaded lab result.
///
/// Field names serialize in camelCase so the persisted collection keeps
/// the layout the web client reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    /// Reference number (`CLR-######`)
    pub id: String,
    pub patient_email: String,
    pub file_name: String,
    /// File content as a data URI
    pub file_data: String,
    /// MIME type
    pub file_type: String,
    /// Human-readable size ("1.5 MB")
    pub file_size: String,
    /// Upload timestamp, ISO-8601 with milliseconds
    pub upload_date: String,
    pub status: ResultStatus,
    /// Test type inferred from the file name
    pub test_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_doctor: Option<Doctor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Revision counter for optimistic concurrency (0 for legacy data)
    #[serde(default)]
    pub version: u64,
}

impl LabResult {
    /// Priority, treating an unset value as normal.
    pub fn effective_priority(&self) -> Priority {
        self.priority.unwrap_or_default()
    }

    /// Check if a doctor currently holds this result.
    pub fn is_assigned(&self) -> bool {
        self.assigned_doctor.is_some()
    }

    /// Check if this result is assigned to the given doctor.
    pub fn is_assigned_to(&self, doctor_id: &str) -> bool {
        self.assigned_doctor
            .as_ref()
            .is_some_and(|d| d.id == doctor_id)
    }

    /// Completed with an interpretation attached.
    pub fn is_resolved(&self) -> bool {
        self.status == ResultStatus::Completed && self.interpretation.is_some()
    }

    /// Apply a partial update. Fields left as `None` in the patch are kept.
    pub fn apply(&mut self, patch: LabResultPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(interpretation) = patch.interpretation {
            self.interpretation = interpretation;
        }
        if let Some(doctor) = patch.assigned_doctor {
            self.assigned_doctor = doctor;
        }
        if let Some(assigned_at) = patch.assigned_at {
            self.assigned_at = assigned_at;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
    }
}

/// Shallow partial update of the mutable fields of a [`LabResult`].
///
/// Outer `None` leaves a field alone; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabResultPatch {
    pub status: Option<ResultStatus>,
    pub interpretation: Option<Option<String>>,
    pub assigned_doctor: Option<Option<Doctor>>,
    pub assigned_at: Option<Option<String>>,
    pub priority: Option<Option<Priority>>,
}

impl LabResultPatch {
    pub fn status(mut self, status: ResultStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn interpretation(mut self, text: impl Into<String>) -> Self {
        self.interpretation = Some(Some(text.into()));
        self
    }

    pub fn assign(mut self, doctor: Doctor, at: String) -> Self {
        self.assigned_doctor = Some(Some(doctor));
        self.assigned_at = Some(Some(at));
        self
    }

    pub fn clear_assignment(mut self) -> Self {
        self.assigned_doctor = Some(None);
        self.assigned_at = Some(None);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(Some(priority));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result() -> LabResult {
        LabResult {
            id: "CLR-000001".into(),
            patient_email: "john.doe@email.com".into(),
            file_name: "CBC_Results.pdf".into(),
            file_data: "data:application/pdf;base64,JVBERi0=".into(),
            file_type: "application/pdf".into(),
            file_size: "1.2 MB".into(),
            upload_date: "2024-01-14T14:45:00.000Z".into(),
            status: ResultStatus::Pending,
            test_type: "Complete Blood Count".into(),
            interpretation: None,
            assigned_doctor: None,
            assigned_at: None,
            priority: None,
            version: 1,
        }
    }

    #[test]
    fn test_serializes_camel_case_and_omits_unset() {
        let json = serde_json::to_value(make_result()).unwrap();
        assert_eq!(json["patientEmail"], "john.doe@email.com");
        assert_eq!(json["status"], "pending");
        assert!(json.get("assignedDoctor").is_none());
        assert!(json.get("interpretation").is_none());
    }

    #[test]
    fn test_deserializes_legacy_record_without_version() {
        let json = r#"{
            "id": "CLR-123457",
            "patientEmail": "sarah.smith@email.com",
            "fileName": "Lipid_Panel_Results.pdf",
            "fileData": "data:application/pdf;base64,",
            "fileType": "application/pdf",
            "uploadDate": "2024-01-14T14:45:00Z",
            "status": "in-review",
            "fileSize": "0.8 MB",
            "testType": "Lipid Panel",
            "priority": "high"
        }"#;
        let result: LabResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.status, ResultStatus::InReview);
        assert_eq!(result.priority, Some(Priority::High));
        assert_eq!(result.version, 0);
    }

    #[test]
    fn test_effective_priority_defaults_to_normal() {
        let mut result = make_result();
        assert_eq!(result.effective_priority(), Priority::Normal);
        result.priority = Some(Priority::Urgent);
        assert_eq!(result.effective_priority(), Priority::Urgent);
    }

    #[test]
    fn test_apply_is_shallow() {
        let mut result = make_result();
        result.interpretation = Some("draft".into());

        result.apply(LabResultPatch::default().status(ResultStatus::Completed));
        assert_eq!(result.status, ResultStatus::Completed);
        assert_eq!(result.interpretation.as_deref(), Some("draft"));

        result.apply(LabResultPatch {
            interpretation: Some(None),
            ..Default::default()
        });
        assert!(result.interpretation.is_none());
    }
}
