//! Review lifecycle: claim, release, status changes and interpretations.
//!
//! ```text
//!   pending ──assign──▶ in-review ──send_interpretation──▶ completed
//!      ▲                    │
//!      └─────unassign───────┘
//! ```

use chrono::{DateTime, Utc};

use super::{iso_timestamp, LabResultStore, StoreError, StoreResult};
use crate::db::StorageBackend;
use crate::models::{Doctor, LabResult, LabResultPatch, Priority, ResultStatus};

impl<S: StorageBackend> LabResultStore<S> {
    /// Assign a doctor and move the result into review.
    ///
    /// An existing assignment is replaced; the last caller wins.
    pub fn assign(&self, id: &str, doctor: &Doctor) -> StoreResult<Option<LabResult>> {
        self.assign_at(id, doctor, Utc::now())
    }

    pub fn assign_at(
        &self,
        id: &str,
        doctor: &Doctor,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<LabResult>> {
        let assigned = self.modify(id, |record| {
            if let Some(previous) = &record.assigned_doctor {
                if previous.id != doctor.id {
                    tracing::info!(
                        id,
                        previous = %previous.id,
                        doctor = %doctor.id,
                        "Reassigning lab result"
                    );
                }
            }
            Ok(LabResultPatch::default()
                .assign(doctor.clone(), iso_timestamp(now))
                .status(ResultStatus::InReview))
        })?;

        if assigned.is_some() {
            tracing::info!(id, doctor = %doctor.id, "Assigned lab result");
        }
        Ok(assigned)
    }

    /// Release the assignment and return the result to the pending queue.
    pub fn unassign(&self, id: &str) -> StoreResult<Option<LabResult>> {
        let released = self.update(
            id,
            LabResultPatch::default()
                .clear_assignment()
                .status(ResultStatus::Pending),
        )?;

        if released.is_some() {
            tracing::info!(id, "Unassigned lab result");
        }
        Ok(released)
    }

    /// Change the status alone.
    ///
    /// Rejects transitions that would leave a pending result assigned, or an
    /// in-review/completed result without a doctor; use [`assign`](Self::assign)
    /// and [`unassign`](Self::unassign) for those.
    pub fn update_status(&self, id: &str, status: ResultStatus) -> StoreResult<Option<LabResult>> {
        self.modify(id, |record| {
            check_transition(record, status)?;
            Ok(LabResultPatch::default().status(status))
        })
    }

    /// Attach the final interpretation and complete the result.
    pub fn send_interpretation(&self, id: &str, text: &str) -> StoreResult<Option<LabResult>> {
        self.send_interpretation_with(id, text, None)
    }

    /// Like [`send_interpretation`](Self::send_interpretation), but fail with
    /// [`StoreError::Conflict`] if the record moved past `expected_version`.
    pub fn send_interpretation_checked(
        &self,
        id: &str,
        expected_version: u64,
        text: &str,
    ) -> StoreResult<Option<LabResult>> {
        self.send_interpretation_with(id, text, Some(expected_version))
    }

    fn send_interpretation_with(
        &self,
        id: &str,
        text: &str,
        expected_version: Option<u64>,
    ) -> StoreResult<Option<LabResult>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::MissingInformation(
                "write an interpretation before sending",
            ));
        }

        let sent = self.update_with(
            id,
            LabResultPatch::default()
                .interpretation(text)
                .status(ResultStatus::Completed),
            expected_version,
        )?;

        if sent.is_some() {
            tracing::info!(id, "Sent interpretation");
        }
        Ok(sent)
    }

    /// Save interpretation text without changing status.
    ///
    /// Blank text is ignored and the stored record returned unchanged.
    pub fn save_draft(&self, id: &str, text: &str) -> StoreResult<Option<LabResult>> {
        self.save_draft_with(id, text, None)
    }

    pub fn save_draft_checked(
        &self,
        id: &str,
        expected_version: u64,
        text: &str,
    ) -> StoreResult<Option<LabResult>> {
        self.save_draft_with(id, text, Some(expected_version))
    }

    fn save_draft_with(
        &self,
        id: &str,
        text: &str,
        expected_version: Option<u64>,
    ) -> StoreResult<Option<LabResult>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(self.get_by_id(id));
        }
        self.update_with(
            id,
            LabResultPatch::default().interpretation(text),
            expected_version,
        )
    }

    pub fn set_priority(&self, id: &str, priority: Priority) -> StoreResult<Option<LabResult>> {
        self.update(id, LabResultPatch::default().priority(priority))
    }
}

fn check_transition(record: &LabResult, to: ResultStatus) -> StoreResult<()> {
    let from = record.status;
    if from == to {
        return Ok(());
    }

    match (to, record.is_assigned()) {
        (ResultStatus::Pending, true) => Err(StoreError::InvalidTransition {
            from,
            to,
            reason: "result is still assigned",
        }),
        (ResultStatus::InReview | ResultStatus::Completed, false) => {
            Err(StoreError::InvalidTransition {
                from,
                to,
                reason: "no doctor assigned",
            })
        }
        _ => Ok(()),
    }
}
