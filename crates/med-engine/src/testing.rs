//! Builders shared by the engine's unit tests.

use crate::*;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use med_notify::{MedEvent, NoopNotifier, Notifier, NotifyError};
use med_store::InMemoryMedStore;
use med_types::*;
use std::sync::{Arc, Mutex};

pub fn attrs() -> MedicationAttrs {
    MedicationAttrs {
        medication_name: "Lisinopril".to_string(),
        dosage: "10mg".to_string(),
        frequency: "once daily".to_string(),
        prescribing_physician: Some("Dr. Amari".to_string()),
        special_instructions: None,
        prescription_date: NaiveDate::from_ymd_opt(2026, 2, 1),
    }
}

pub fn store() -> Arc<InMemoryMedStore> {
    Arc::new(InMemoryMedStore::new())
}

pub fn ledger() -> Ledger<InMemoryMedStore> {
    Ledger::new(store())
}

pub fn ledger_on(store: &Arc<InMemoryMedStore>) -> Ledger<InMemoryMedStore> {
    Ledger::new(store.clone())
}

pub fn alert_engine() -> (AlertEngine<InMemoryMedStore>, Arc<InMemoryMedStore>) {
    let store = store();
    (AlertEngine::new(store.clone(), Arc::new(NoopNotifier)), store)
}

pub fn line(resident_id: Id, medication_id: Id, counted: i64) -> AuditLineInput {
    AuditLineInput {
        resident_id,
        medication_id,
        counted,
        notes: None,
    }
}

pub fn audit_request(program_id: Id, lines: Vec<AuditLineInput>) -> SubmitAuditRequest {
    SubmitAuditRequest {
        program_id,
        staff_id: 2,
        audit_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        audit_time: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
        shift: None,
        notes: None,
        lines,
    }
}

/// The component set `MedicationEngine` is assembled from, sharing one store.
pub struct Parts {
    pub store: Arc<InMemoryMedStore>,
    pub ledger: Ledger<InMemoryMedStore>,
    pub alerts: AlertEngine<InMemoryMedStore>,
    pub reconciler: AuditReconciler<InMemoryMedStore>,
    pub approval: ApprovalWorkflow<InMemoryMedStore>,
}

impl Parts {
    pub async fn alerts_for(&self, medication_id: Id) -> Vec<MedicationAlert> {
        self.store
            .list_alerts(&AlertFilter {
                medication_id: Some(medication_id),
                ..Default::default()
            })
            .await
            .unwrap()
    }
}

pub fn engine_parts() -> Parts {
    let store = store();
    let notifier: Arc<dyn Notifier> = Arc::new(NoopNotifier);
    let ledger = Ledger::new(store.clone());
    let alerts = AlertEngine::new(store.clone(), notifier.clone());
    let reconciler =
        AuditReconciler::new(store.clone(), ledger.clone(), alerts.clone(), notifier.clone());
    let approval = ApprovalWorkflow::new(store.clone(), ledger.clone(), notifier);
    Parts {
        store,
        ledger,
        alerts,
        reconciler,
        approval,
    }
}

/// Same wiring as `engine_parts`, over a `FlakyStore` and a recording notifier.
pub struct FlakyParts {
    pub store: Arc<FlakyStore>,
    pub ledger: Ledger<FlakyStore>,
    pub reconciler: AuditReconciler<FlakyStore>,
    pub approval: ApprovalWorkflow<FlakyStore>,
    pub events: Arc<RecordingNotifier>,
}

pub fn flaky_parts() -> FlakyParts {
    let inner = store();
    let store = Arc::new(FlakyStore::new(inner));
    let events = Arc::new(RecordingNotifier::default());
    let notifier: Arc<dyn Notifier> = events.clone();
    let ledger = Ledger::new(store.clone());
    let alerts = AlertEngine::new(store.clone(), notifier.clone());
    let reconciler = AuditReconciler::new(store.clone(), ledger.clone(), alerts, notifier.clone());
    let approval = ApprovalWorkflow::new(store.clone(), ledger.clone(), notifier);
    FlakyParts {
        store,
        ledger,
        reconciler,
        approval,
        events,
    }
}

/// Keeps every published event in memory, synchronously.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<MedEvent>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(MedEvent::kind).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: MedEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Delegates to an in-memory store but can be told to reject writes to one medication line
/// or to refuse new alerts.
pub struct FlakyStore {
    inner: Arc<InMemoryMedStore>,
    failing: Mutex<Option<Id>>,
    dispense_on_failure: Mutex<Option<(Id, i64)>>,
    alerts_down: Mutex<bool>,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryMedStore>) -> Self {
        Self {
            inner,
            failing: Mutex::new(None),
            dispense_on_failure: Mutex::new(None),
            alerts_down: Mutex::new(false),
        }
    }

    pub async fn fail_updates_for(&self, medication_id: Option<Id>) {
        *self.failing.lock().unwrap() = medication_id;
    }

    /// Before the next rejected write, take `quantity` units off `medication_id` as another
    /// caller would.
    pub async fn dispense_on_failure(&self, medication_id: Id, quantity: i64) {
        *self.dispense_on_failure.lock().unwrap() = Some((medication_id, quantity));
    }

    pub async fn fail_alert_inserts(&self, down: bool) {
        *self.alerts_down.lock().unwrap() = down;
    }
}

#[async_trait]
impl MedStore for FlakyStore {
    async fn insert_medication(
        &self,
        med: ResidentMedication,
    ) -> Result<ResidentMedication, StoreError> {
        self.inner.insert_medication(med).await
    }

    async fn get_medication(&self, id: Id) -> Result<Option<ResidentMedication>, StoreError> {
        self.inner.get_medication(id).await
    }

    async fn update_medication(
        &self,
        med: &ResidentMedication,
        expected_version: u64,
    ) -> Result<ResidentMedication, StoreError> {
        let failing = *self.failing.lock().unwrap();
        if failing == Some(med.id) {
            let dispense = self.dispense_on_failure.lock().unwrap().take();
            if let Some((other, quantity)) = dispense {
                let mut line = self.inner.get_medication(other).await?.unwrap();
                let version = line.version;
                line.current_count -= quantity;
                self.inner.update_medication(&line, version).await?;
            }
            return Err(StoreError::VersionConflict {
                entity: "medication",
                id: med.id,
                expected: expected_version,
                found: expected_version + 1,
            });
        }
        self.inner.update_medication(med, expected_version).await
    }

    async fn list_medications(
        &self,
        filter: &MedicationFilter,
    ) -> Result<Vec<ResidentMedication>, StoreError> {
        self.inner.list_medications(filter).await
    }

    async fn insert_administration(
        &self,
        admin: MedicationAdministration,
    ) -> Result<MedicationAdministration, StoreError> {
        self.inner.insert_administration(admin).await
    }

    async fn list_administrations(
        &self,
        filter: &AdministrationFilter,
    ) -> Result<Vec<MedicationAdministration>, StoreError> {
        self.inner.list_administrations(filter).await
    }

    async fn insert_audit(&self, audit: MedicationAudit) -> Result<MedicationAudit, StoreError> {
        self.inner.insert_audit(audit).await
    }

    async fn get_audit(&self, id: Id) -> Result<Option<MedicationAudit>, StoreError> {
        self.inner.get_audit(id).await
    }

    async fn transition_audit(
        &self,
        id: Id,
        from: AuditStatus,
        to: AuditStatus,
        review: Option<AuditReview>,
    ) -> Result<MedicationAudit, StoreError> {
        self.inner.transition_audit(id, from, to, review).await
    }

    async fn list_audits(&self, filter: &AuditFilter) -> Result<Vec<MedicationAudit>, StoreError> {
        self.inner.list_audits(filter).await
    }

    async fn insert_alert(&self, alert: MedicationAlert) -> Result<MedicationAlert, StoreError> {
        if *self.alerts_down.lock().unwrap() {
            return Err(StoreError::Other("alerts table unavailable".to_string()));
        }
        self.inner.insert_alert(alert).await
    }

    async fn get_alert(&self, id: Id) -> Result<Option<MedicationAlert>, StoreError> {
        self.inner.get_alert(id).await
    }

    async fn transition_alert(
        &self,
        id: Id,
        from: AlertStatus,
        to: AlertStatus,
        resolution: Option<AlertResolution>,
    ) -> Result<MedicationAlert, StoreError> {
        self.inner.transition_alert(id, from, to, resolution).await
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<MedicationAlert>, StoreError> {
        self.inner.list_alerts(filter).await
    }
}
