//! Audit reconciler: compares a shift's physical recount with the ledger.
//!
//! Submission snapshots each line's on-hand count as `previous_count` and records the
//! variance. It never writes the ledger; corrections happen only when the audit is approved.

use crate::{derive_shift, publish, AlertEngine, Ledger, NewAlert};
use chrono::Utc;
use med_notify::{MedEvent, Notifier};
use med_types::*;
use std::collections::HashSet;
use std::sync::Arc;

pub struct AuditReconciler<S> {
    store: Arc<S>,
    ledger: Ledger<S>,
    alerts: AlertEngine<S>,
    notifier: Arc<dyn Notifier>,
}

impl<S: MedStore> AuditReconciler<S> {
    pub fn new(
        store: Arc<S>,
        ledger: Ledger<S>,
        alerts: AlertEngine<S>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            ledger,
            alerts,
            notifier,
        }
    }

    pub async fn submit(&self, req: SubmitAuditRequest) -> Result<MedicationAudit, MedError> {
        let shift = match req.shift.as_deref() {
            Some(tag) => tag.parse::<Shift>()?,
            None => derive_shift(req.audit_time),
        };
        if req.lines.is_empty() {
            return Err(MedError::Validation(
                "audit must contain at least one line".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(req.lines.len());
        for input in req.lines {
            if !seen.insert(input.medication_id) {
                return Err(MedError::Validation(format!(
                    "medication {} is counted twice",
                    input.medication_id
                )));
            }
            if input.counted < 0 {
                return Err(MedError::Validation(format!(
                    "counted quantity for medication {} must not be negative",
                    input.medication_id
                )));
            }
            let med = match self.ledger.get(input.medication_id).await {
                Ok(med) => med,
                Err(MedError::NotFound(msg)) => return Err(MedError::Validation(msg)),
                Err(e) => return Err(e),
            };
            if med.resident_id != input.resident_id || med.program_id != req.program_id {
                return Err(MedError::Validation(format!(
                    "medication {} does not belong to resident {} in program {}",
                    med.id, input.resident_id, req.program_id
                )));
            }
            lines.push(AuditCountLine::new(
                input.resident_id,
                med.id,
                med.current_count,
                input.counted,
                input.notes,
            ));
        }

        let has_discrepancies = lines.iter().any(AuditCountLine::is_discrepancy);
        let audit = self
            .store
            .insert_audit(MedicationAudit {
                id: 0,
                program_id: req.program_id,
                audit_date: req.audit_date,
                audit_time: req.audit_time,
                shift,
                notes: req.notes,
                status: AuditStatus::Submitted,
                has_discrepancies,
                submitted_by: req.staff_id,
                submitted_at: Utc::now(),
                review: None,
                lines,
            })
            .await?;

        let discrepancy_count = audit.discrepancies().count();
        tracing::info!(
            audit_id = audit.id,
            program_id = audit.program_id,
            shift = %audit.shift,
            lines = audit.lines.len(),
            discrepancy_count,
            "audit submitted"
        );

        // The audit is committed: alert failures are logged, not returned.
        for line in audit.discrepancies() {
            if let Err(e) = self.alerts.raise(discrepancy_alert(&audit, line)).await {
                tracing::warn!(
                    audit_id = audit.id,
                    medication_id = line.medication_id,
                    variance = line.variance,
                    error = %e,
                    "discrepancy alert failed"
                );
            }
        }

        publish(
            self.notifier.as_ref(),
            MedEvent::AuditSubmitted {
                audit_id: audit.id,
                program_id: audit.program_id,
                has_discrepancies,
                discrepancy_count,
            },
        )
        .await;
        Ok(audit)
    }
}

fn discrepancy_alert(audit: &MedicationAudit, line: &AuditCountLine) -> NewAlert {
    NewAlert {
        program_id: audit.program_id,
        resident_id: line.resident_id,
        medication_id: Some(line.medication_id),
        audit_id: Some(audit.id),
        alert_type: AlertType::Critical,
        source: AlertSource::AuditDiscrepancy,
        title: "Medication count discrepancy".to_string(),
        description: format!(
            "Audit {} ({} shift {}): expected {}, counted {}, variance {:+}",
            audit.id,
            audit.audit_date,
            audit.shift,
            line.previous_count,
            line.current_count,
            line.variance
        ),
    }
}
