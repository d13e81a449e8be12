//! Authenticated principals and the capabilities they carry.

use super::doctor::Doctor;
use super::lab_result::LabResult;

/// The signed-in user, as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Patient { email: String },
    Doctor(Doctor),
}

/// Operations gated by user type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Upload a new lab result
    Upload,
    /// See results belonging to the principal
    ViewOwn,
    /// See every result in the store
    ViewAll,
    /// Claim or release a result
    Assign,
    /// Change status, priority, or write interpretations
    Review,
    /// Remove a result from the store
    Delete,
}

impl Principal {
    pub fn allows(&self, capability: Capability) -> bool {
        match self {
            Principal::Patient { .. } => {
                matches!(capability, Capability::Upload | Capability::ViewOwn)
            }
            Principal::Doctor(_) => !matches!(capability, Capability::Upload),
        }
    }

    /// Check whether this principal may read the given result.
    pub fn can_view(&self, result: &LabResult) -> bool {
        match self {
            Principal::Patient { email } => result.patient_email.eq_ignore_ascii_case(email),
            Principal::Doctor(_) => true,
        }
    }

    pub fn as_doctor(&self) -> Option<&Doctor> {
        match self {
            Principal::Doctor(doctor) => Some(doctor),
            Principal::Patient { .. } => None,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Principal::Patient { .. } => "patient",
            Principal::Doctor(_) => "doctor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::find_doctor;

    #[test]
    fn test_patient_capabilities() {
        let patient = Principal::Patient {
            email: "john.doe@email.com".into(),
        };
        assert!(patient.allows(Capability::Upload));
        assert!(patient.allows(Capability::ViewOwn));
        assert!(!patient.allows(Capability::ViewAll));
        assert!(!patient.allows(Capability::Assign));
        assert!(!patient.allows(Capability::Review));
        assert!(!patient.allows(Capability::Delete));
    }

    #[test]
    fn test_doctor_capabilities() {
        let doctor = Principal::Doctor(find_doctor("doc-001").unwrap());
        assert!(!doctor.allows(Capability::Upload));
        assert!(doctor.allows(Capability::ViewAll));
        assert!(doctor.allows(Capability::Assign));
        assert!(doctor.allows(Capability::Review));
        assert_eq!(doctor.as_doctor().unwrap().id, "doc-001");
    }
}
