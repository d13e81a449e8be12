//! Doctor models.

use serde::{Deserialize, Serialize};

/// A doctor who can claim and interpret lab results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

impl Doctor {
    pub fn new(id: &str, name: &str, email: &str, specialization: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            specialization: specialization.map(str::to_string),
        }
    }
}

/// The doctor roster. Not persisted; the auth backend is not consulted.
pub fn available_doctors() -> Vec<Doctor> {
    vec![
        Doctor::new(
            "doc-001",
            "Dr. Sarah Wilson",
            "sarah.wilson@clarifind.com",
            Some("Internal Medicine"),
        ),
        Doctor::new(
            "doc-002",
            "Dr. Michael Chen",
            "michael.chen@clarifind.com",
            Some("Cardiology"),
        ),
        Doctor::new(
            "doc-003",
            "Dr. Emily Rodriguez",
            "emily.rodriguez@clarifind.com",
            Some("Endocrinology"),
        ),
        Doctor::new(
            "doc-004",
            "Dr. David Park",
            "david.park@clarifind.com",
            Some("General Practice"),
        ),
    ]
}

/// Look up a doctor on the roster by ID.
pub fn find_doctor(doctor_id: &str) -> Option<Doctor> {
    available_doctors().into_iter().find(|d| d.id == doctor_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_ids_unique() {
        let doctors = available_doctors();
        assert_eq!(doctors.len(), 4);
        let ids: std::collections::HashSet<_> = doctors.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), doctors.len());
    }

    #[test]
    fn test_find_doctor() {
        let doctor = find_doctor("doc-002").unwrap();
        assert_eq!(doctor.name, "Dr. Michael Chen");
        assert_eq!(doctor.specialization.as_deref(), Some("Cardiology"));
        assert!(find_doctor("doc-999").is_none());
    }
}
