//! MedicationEngine: composes the ledger, recorder, reconciler, approval workflow, and alert
//! engine over one store and implements `MedTracker`.

use crate::*;
use async_trait::async_trait;
use med_notify::Notifier;
use med_types::*;
use std::sync::Arc;

pub struct MedicationEngine<S> {
    store: Arc<S>,
    ledger: Ledger<S>,
    recorder: AdministrationRecorder<S>,
    reconciler: AuditReconciler<S>,
    approval: ApprovalWorkflow<S>,
    alerts: AlertEngine<S>,
    config: EngineConfig,
}

impl<S: MedStore> MedicationEngine<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>, config: EngineConfig) -> Self {
        let ledger = Ledger::new(store.clone());
        let alerts = AlertEngine::new(store.clone(), notifier.clone());
        Self {
            recorder: AdministrationRecorder::new(store.clone(), ledger.clone()),
            reconciler: AuditReconciler::new(
                store.clone(),
                ledger.clone(),
                alerts.clone(),
                notifier.clone(),
            ),
            approval: ApprovalWorkflow::new(store.clone(), ledger.clone(), notifier),
            store,
            ledger,
            alerts,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn check_low_stock(&self, med: &ResidentMedication) {
        let Some(threshold) = self.config.low_stock_threshold else {
            return;
        };
        if med.current_count > threshold {
            return;
        }
        if let Err(e) = self.alerts.raise_low_stock(med, threshold).await {
            tracing::warn!(medication_id = med.id, error = %e, "low-stock alert failed");
        }
    }
}

#[async_trait]
impl<S: MedStore + 'static> MedTracker for MedicationEngine<S> {
    async fn add_medication(
        &self,
        req: AddMedicationRequest,
    ) -> Result<ResidentMedication, MedError> {
        tracing::debug!(staff_id = req.staff_id, resident_id = req.resident_id, "add medication");
        self.ledger
            .create_line(req.resident_id, req.program_id, req.attrs, req.initial_count)
            .await
    }

    async fn update_medication(
        &self,
        id: Id,
        req: UpdateMedicationRequest,
    ) -> Result<ResidentMedication, MedError> {
        tracing::debug!(medication_id = id, staff_id = req.staff_id, "update medication");
        self.ledger.update_attrs(id, req).await
    }

    async fn discontinue_medication(
        &self,
        id: Id,
        staff_id: Id,
    ) -> Result<ResidentMedication, MedError> {
        tracing::debug!(medication_id = id, staff_id, "discontinue medication");
        self.ledger.discontinue(id).await
    }

    async fn decrement_medication(
        &self,
        id: Id,
        req: DecrementRequest,
    ) -> Result<ResidentMedication, MedError> {
        tracing::debug!(medication_id = id, staff_id = req.staff_id, "decrement medication");
        let med = self.ledger.decrement(id, req.quantity).await?;
        self.check_low_stock(&med).await;
        Ok(med)
    }

    async fn set_medication_count(
        &self,
        id: Id,
        req: SetCountRequest,
    ) -> Result<ResidentMedication, MedError> {
        tracing::info!(
            medication_id = id,
            staff_id = req.staff_id,
            reason = req.reason.as_deref().unwrap_or(""),
            "manual count"
        );
        self.ledger.set_count(id, req.count).await
    }

    async fn get_medication(&self, id: Id) -> Result<ResidentMedication, MedError> {
        self.ledger.get(id).await
    }

    async fn list_medications(
        &self,
        filter: &MedicationFilter,
    ) -> Result<Vec<ResidentMedication>, MedError> {
        Ok(self.store.list_medications(filter).await?)
    }

    async fn log_administration(
        &self,
        req: LogAdministrationRequest,
    ) -> Result<MedicationAdministration, MedError> {
        self.recorder.log(req).await
    }

    async fn list_administrations(
        &self,
        filter: &AdministrationFilter,
    ) -> Result<Vec<MedicationAdministration>, MedError> {
        self.recorder.list(filter).await
    }

    async fn submit_audit(&self, req: SubmitAuditRequest) -> Result<MedicationAudit, MedError> {
        self.reconciler.submit(req).await
    }

    async fn approve_audit(
        &self,
        id: Id,
        staff_id: Id,
        notes: Option<String>,
    ) -> Result<MedicationAudit, MedError> {
        self.approval.approve(id, staff_id, notes).await
    }

    async fn deny_audit(
        &self,
        id: Id,
        staff_id: Id,
        notes: Option<String>,
    ) -> Result<MedicationAudit, MedError> {
        self.approval.deny(id, staff_id, notes).await
    }

    async fn get_audit(&self, id: Id) -> Result<MedicationAudit, MedError> {
        self.approval.get(id).await
    }

    async fn list_audits(&self, filter: &AuditFilter) -> Result<Vec<MedicationAudit>, MedError> {
        Ok(self.store.list_audits(filter).await?)
    }

    async fn raise_alert(&self, req: RaiseAlertRequest) -> Result<MedicationAlert, MedError> {
        self.alerts.raise_manual(req).await
    }

    async fn resolve_alert(&self, id: Id, staff_id: Id) -> Result<MedicationAlert, MedError> {
        self.alerts.resolve(id, staff_id).await
    }

    async fn get_alert(&self, id: Id) -> Result<MedicationAlert, MedError> {
        self.alerts.get(id).await
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<MedicationAlert>, MedError> {
        Ok(self.store.list_alerts(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{attrs, audit_request, line, RecordingNotifier};
    use chrono::NaiveDate;
    use med_store::InMemoryMedStore;

    fn engine(config: EngineConfig) -> (MedicationEngine<InMemoryMedStore>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = MedicationEngine::new(
            Arc::new(InMemoryMedStore::new()),
            notifier.clone(),
            config,
        );
        (engine, notifier)
    }

    fn add(resident_id: Id, count: i64) -> AddMedicationRequest {
        AddMedicationRequest {
            resident_id,
            program_id: 1,
            attrs: attrs(),
            initial_count: count,
            staff_id: 2,
        }
    }

    fn take(quantity: i64) -> DecrementRequest {
        DecrementRequest {
            quantity,
            staff_id: 2,
        }
    }

    #[tokio::test]
    async fn shift_counts_flow_end_to_end() {
        let (engine, notifier) = engine(EngineConfig::default());
        let med = engine.add_medication(add(7, 30)).await.unwrap();
        let med = engine.decrement_medication(med.id, take(2)).await.unwrap();
        assert_eq!(med.current_count, 28);

        let clean = engine
            .submit_audit(audit_request(1, vec![line(7, med.id, 28)]))
            .await
            .unwrap();
        assert!(!clean.has_discrepancies);

        let short = engine
            .submit_audit(audit_request(1, vec![line(7, med.id, 25)]))
            .await
            .unwrap();
        assert!(short.has_discrepancies);
        assert_eq!(short.lines[0].variance, -3);

        let alerts = engine
            .list_alerts(&AlertFilter {
                status: Some(AlertStatus::Active),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Critical);
        assert_eq!(alerts[0].audit_id, Some(short.id));

        let approved = engine
            .review_audit(
                short.id,
                ReviewAuditRequest {
                    status: "APPROVED".to_string(),
                    staff_id: 4,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(approved.status, AuditStatus::Approved);
        assert_eq!(engine.get_medication(med.id).await.unwrap().current_count, 25);
        assert_eq!(
            engine.get_alert(alerts[0].id).await.unwrap().status,
            AlertStatus::Active
        );

        let resolved = engine.resolve_alert(alerts[0].id, 4).await.unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);

        assert_eq!(
            notifier.kinds(),
            vec![
                "audit_submitted",
                "alert_raised",
                "audit_submitted",
                "audit_reviewed",
                "alert_resolved"
            ]
        );
    }

    #[tokio::test]
    async fn review_rejects_unknown_decision() {
        let (engine, _) = engine(EngineConfig::default());
        let med = engine.add_medication(add(7, 30)).await.unwrap();
        let audit = engine
            .submit_audit(audit_request(1, vec![line(7, med.id, 29)]))
            .await
            .unwrap();
        let err = engine
            .review_audit(
                audit.id,
                ReviewAuditRequest {
                    status: "SUBMITTED".to_string(),
                    staff_id: 4,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MedError::Validation(_)));
        assert_eq!(
            engine.get_audit(audit.id).await.unwrap().status,
            AuditStatus::Submitted
        );
    }

    #[tokio::test]
    async fn decrement_to_threshold_raises_one_low_stock_alert() {
        let (engine, notifier) = engine(EngineConfig::default());
        let med = engine.add_medication(add(7, 8)).await.unwrap();

        engine.decrement_medication(med.id, take(2)).await.unwrap();
        assert!(notifier.kinds().is_empty());

        engine.decrement_medication(med.id, take(1)).await.unwrap();
        engine.decrement_medication(med.id, take(1)).await.unwrap();
        let alerts = engine
            .list_alerts(&AlertFilter {
                medication_id: Some(med.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].source, AlertSource::LowStock);
        assert_eq!(alerts[0].alert_type, AlertType::Warning);
        assert_eq!(notifier.kinds().iter().filter(|k| **k == "low_stock").count(), 2);
    }

    #[tokio::test]
    async fn low_stock_can_be_disabled() {
        let (engine, notifier) = engine(EngineConfig {
            low_stock_threshold: None,
        });
        let med = engine.add_medication(add(7, 3)).await.unwrap();
        let med = engine.decrement_medication(med.id, take(3)).await.unwrap();
        assert_eq!(med.current_count, 0);
        assert!(engine.list_alerts(&AlertFilter::default()).await.unwrap().is_empty());
        assert!(notifier.kinds().is_empty());
    }

    #[tokio::test]
    async fn administrations_never_touch_stock() {
        let (engine, _) = engine(EngineConfig::default());
        let med = engine.add_medication(add(7, 30)).await.unwrap();
        for action in ["ADMINISTERED", "REFUSED", "HELD", "MISSED"] {
            engine
                .log_administration(LogAdministrationRequest {
                    resident_id: 7,
                    medication_id: med.id,
                    action: action.to_string(),
                    administered_at: NaiveDate::from_ymd_opt(2026, 3, 2)
                        .unwrap()
                        .and_hms_opt(8, 0, 0)
                        .unwrap(),
                    was_late: false,
                    minutes_late: None,
                    notes: None,
                    staff_id: 3,
                })
                .await
                .unwrap();
        }
        assert_eq!(engine.get_medication(med.id).await.unwrap().current_count, 30);
        let logged = engine
            .list_administrations(&AdministrationFilter {
                medication_id: Some(med.id),
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(logged.len(), 2);
    }

    #[tokio::test]
    async fn discontinued_lines_keep_history_but_refuse_dispensing() {
        let (engine, _) = engine(EngineConfig::default());
        let med = engine.add_medication(add(7, 30)).await.unwrap();
        engine.discontinue_medication(med.id, 2).await.unwrap();

        let err = engine.decrement_medication(med.id, take(1)).await.unwrap_err();
        assert_eq!(err.code(), 409);
        let err = engine
            .update_medication(
                med.id,
                UpdateMedicationRequest {
                    dosage: Some("20mg".to_string()),
                    staff_id: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MedError::InactiveMedication(_)));

        let med = engine
            .set_medication_count(
                med.id,
                SetCountRequest {
                    count: 0,
                    staff_id: 2,
                    reason: Some("returned to pharmacy".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(med.current_count, 0);

        let active = engine
            .list_medications(&MedicationFilter {
                status: Some(MedicationStatus::Active),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(active.is_empty());
    }
}
