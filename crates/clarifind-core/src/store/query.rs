//! Read-side views over the result collection.
//!
//! Every view is a linear scan of [`LabResultStore::get_all`].

use chrono::{DateTime, Utc};

use super::{iso_timestamp, LabResultStore};
use crate::db::StorageBackend;
use crate::models::{LabResult, ResultStatus};

/// Result counts shown on the doctor dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total: usize,
    pub fresh: usize,
    pub pending: usize,
    pub in_review: usize,
    pub completed: usize,
    /// Results held by the requesting doctor (0 without a doctor)
    pub assigned_to_doctor: usize,
}

impl<S: StorageBackend> LabResultStore<S> {
    pub fn by_status(&self, status: ResultStatus) -> Vec<LabResult> {
        self.filter(|r| r.status == status)
    }

    pub fn by_doctor(&self, doctor_id: &str) -> Vec<LabResult> {
        self.filter(|r| r.is_assigned_to(doctor_id))
    }

    pub fn unassigned(&self) -> Vec<LabResult> {
        self.filter(|r| !r.is_assigned())
    }

    /// Results with `status`, optionally restricted to one doctor's.
    pub fn by_status_and_doctor(
        &self,
        status: ResultStatus,
        doctor_id: Option<&str>,
    ) -> Vec<LabResult> {
        self.filter(|r| r.status == status && doctor_id.map_or(true, |d| r.is_assigned_to(d)))
    }

    /// Results uploaded by a patient (email compared case-insensitively).
    pub fn by_patient_email(&self, email: &str) -> Vec<LabResult> {
        let email = email.to_lowercase();
        self.filter(|r| r.patient_email.to_lowercase() == email)
    }

    /// Pending results uploaded within the fresh window.
    ///
    /// With a doctor, results held by other doctors are excluded.
    pub fn fresh(&self, doctor_id: Option<&str>) -> Vec<LabResult> {
        self.fresh_at(Utc::now(), doctor_id)
    }

    pub fn fresh_at(&self, now: DateTime<Utc>, doctor_id: Option<&str>) -> Vec<LabResult> {
        let cutoff = self.fresh_cutoff(now);
        self.filter(|r| is_fresh(r, &cutoff, doctor_id))
    }

    /// Case-insensitive substring search over patient email, file name and
    /// reference number. The term is matched as typed, surrounding whitespace
    /// included; an empty term matches everything.
    pub fn search(&self, term: &str) -> Vec<LabResult> {
        let term = term.to_lowercase();
        if term.is_empty() {
            return self.get_all();
        }
        self.filter(|r| {
            r.patient_email.to_lowercase().contains(&term)
                || r.file_name.to_lowercase().contains(&term)
                || r.id.to_lowercase().contains(&term)
        })
    }

    pub fn summary(&self, doctor_id: Option<&str>) -> DashboardSummary {
        self.summary_at(Utc::now(), doctor_id)
    }

    pub fn summary_at(&self, now: DateTime<Utc>, doctor_id: Option<&str>) -> DashboardSummary {
        let cutoff = self.fresh_cutoff(now);
        let mut summary = DashboardSummary::default();

        for record in self.get_all() {
            summary.total += 1;
            match record.status {
                ResultStatus::Pending => summary.pending += 1,
                ResultStatus::InReview => summary.in_review += 1,
                ResultStatus::Completed => summary.completed += 1,
            }
            if is_fresh(&record, &cutoff, doctor_id) {
                summary.fresh += 1;
            }
            if doctor_id.is_some_and(|d| record.is_assigned_to(d)) {
                summary.assigned_to_doctor += 1;
            }
        }
        summary
    }

    fn fresh_cutoff(&self, now: DateTime<Utc>) -> String {
        let cutoff = now
            .checked_sub_signed(self.fresh_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        iso_timestamp(cutoff)
    }

    fn filter<F>(&self, predicate: F) -> Vec<LabResult>
    where
        F: Fn(&LabResult) -> bool,
    {
        self.get_all().into_iter().filter(|r| predicate(r)).collect()
    }
}

// Upload dates are compared as ISO-8601 strings.
fn is_fresh(record: &LabResult, cutoff: &str, doctor_id: Option<&str>) -> bool {
    record.status == ResultStatus::Pending
        && record.upload_date.as_str() > cutoff
        && doctor_id.map_or(true, |d| !record.is_assigned() || record.is_assigned_to(d))
}
