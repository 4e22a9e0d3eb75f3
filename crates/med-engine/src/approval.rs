//! Audit approval: SUBMITTED -> APPROVED | DENIED, each terminal.
//!
//! Approval claims the audit with a status compare-and-set before touching the ledger, so two
//! reviewers racing on the same audit cannot both apply corrections. If a correction fails,
//! counts already written are restored where untouched since, and the audit returns to
//! SUBMITTED.

use crate::{publish, Ledger};
use chrono::Utc;
use med_notify::{MedEvent, Notifier};
use med_types::*;
use std::sync::Arc;

pub struct ApprovalWorkflow<S> {
    store: Arc<S>,
    ledger: Ledger<S>,
    notifier: Arc<dyn Notifier>,
}

impl<S: MedStore> ApprovalWorkflow<S> {
    pub fn new(store: Arc<S>, ledger: Ledger<S>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            ledger,
            notifier,
        }
    }

    pub async fn get(&self, id: Id) -> Result<MedicationAudit, MedError> {
        self.store
            .get_audit(id)
            .await?
            .ok_or_else(|| MedError::NotFound(format!("audit {}", id)))
    }

    /// Approve and set every discrepant line's ledger count to the counted value.
    pub async fn approve(
        &self,
        id: Id,
        staff_id: Id,
        notes: Option<String>,
    ) -> Result<MedicationAudit, MedError> {
        self.pending(id).await?;
        let audit = self
            .store
            .transition_audit(
                id,
                AuditStatus::Submitted,
                AuditStatus::Approved,
                Some(review(staff_id, notes)),
            )
            .await?;

        let mut applied: Vec<(i64, ResidentMedication)> = Vec::new();
        for line in audit.discrepancies() {
            match self.ledger.correct(line.medication_id, line.current_count).await {
                Ok(done) => applied.push(done),
                Err(e) => {
                    tracing::warn!(
                        audit_id = id,
                        medication_id = line.medication_id,
                        error = %e,
                        "audit correction failed, rolling back"
                    );
                    self.roll_back(id, &applied).await;
                    return Err(e);
                }
            }
        }

        tracing::info!(
            audit_id = id,
            staff_id,
            corrections = applied.len(),
            "audit approved"
        );
        self.reviewed(&audit, staff_id).await;
        Ok(audit)
    }

    /// Deny. The ledger is not touched.
    pub async fn deny(
        &self,
        id: Id,
        staff_id: Id,
        notes: Option<String>,
    ) -> Result<MedicationAudit, MedError> {
        self.pending(id).await?;
        let audit = self
            .store
            .transition_audit(
                id,
                AuditStatus::Submitted,
                AuditStatus::Denied,
                Some(review(staff_id, notes)),
            )
            .await?;
        tracing::info!(audit_id = id, staff_id, "audit denied");
        self.reviewed(&audit, staff_id).await;
        Ok(audit)
    }

    async fn pending(&self, id: Id) -> Result<MedicationAudit, MedError> {
        let audit = self.get(id).await?;
        if audit.status != AuditStatus::Submitted {
            return Err(MedError::InvalidState(format!(
                "audit {} is already {}",
                id, audit.status
            )));
        }
        Ok(audit)
    }

    /// Undo applied corrections newest first. A line written since its correction keeps its
    /// current count.
    async fn roll_back(&self, id: Id, applied: &[(i64, ResidentMedication)]) {
        for (previous, saved) in applied.iter().rev() {
            if let Err(e) = self.ledger.restore(saved, *previous).await {
                tracing::error!(
                    audit_id = id,
                    medication_id = saved.id,
                    previous = *previous,
                    current_count = saved.current_count,
                    error = %e,
                    "count not restored after aborted approval"
                );
            }
        }
        if let Err(e) = self
            .store
            .transition_audit(id, AuditStatus::Approved, AuditStatus::Submitted, None)
            .await
        {
            tracing::error!(audit_id = id, error = %e, "failed to reopen audit after aborted approval");
        }
    }

    async fn reviewed(&self, audit: &MedicationAudit, staff_id: Id) {
        publish(
            self.notifier.as_ref(),
            MedEvent::AuditReviewed {
                audit_id: audit.id,
                program_id: audit.program_id,
                status: audit.status,
                reviewed_by: staff_id,
            },
        )
        .await;
    }
}

fn review(staff_id: Id, notes: Option<String>) -> AuditReview {
    AuditReview {
        reviewed_by: staff_id,
        reviewed_at: Utc::now(),
        notes,
    }
}
