//! In-memory store: one ordered map per entity, each behind its own lock.

use med_types::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Table<T> = Arc<RwLock<BTreeMap<Id, T>>>;

/// In-memory implementation of MedStore (process lifetime only).
/// Compare-and-set writes hold the table's write lock for the whole check-and-replace.
pub struct InMemoryMedStore {
    medications: Table<ResidentMedication>,
    administrations: Table<MedicationAdministration>,
    audits: Table<MedicationAudit>,
    alerts: Table<MedicationAlert>,
}

impl InMemoryMedStore {
    pub fn new() -> Self {
        Self {
            medications: Arc::new(RwLock::new(BTreeMap::new())),
            administrations: Arc::new(RwLock::new(BTreeMap::new())),
            audits: Arc::new(RwLock::new(BTreeMap::new())),
            alerts: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    fn next_id<T>(table: &BTreeMap<Id, T>) -> Id {
        table.keys().next_back().map_or(1, |last| last + 1)
    }
}

impl Default for InMemoryMedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MedStore for InMemoryMedStore {
    async fn insert_medication(
        &self,
        mut med: ResidentMedication,
    ) -> Result<ResidentMedication, StoreError> {
        let mut guard = self.medications.write().await;
        med.id = Self::next_id(&guard);
        guard.insert(med.id, med.clone());
        Ok(med)
    }

    async fn get_medication(&self, id: Id) -> Result<Option<ResidentMedication>, StoreError> {
        Ok(self.medications.read().await.get(&id).cloned())
    }

    async fn update_medication(
        &self,
        med: &ResidentMedication,
        expected_version: u64,
    ) -> Result<ResidentMedication, StoreError> {
        let mut guard = self.medications.write().await;
        let stored = guard
            .get_mut(&med.id)
            .ok_or_else(|| StoreError::NotFound(format!("medication {}", med.id)))?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                entity: "medication",
                id: med.id,
                expected: expected_version,
                found: stored.version,
            });
        }
        let mut next = med.clone();
        next.version = expected_version + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn list_medications(
        &self,
        filter: &MedicationFilter,
    ) -> Result<Vec<ResidentMedication>, StoreError> {
        let guard = self.medications.read().await;
        let out: Vec<ResidentMedication> = guard
            .values()
            .rev()
            .filter(|m| filter.program_id.map_or(true, |p| m.program_id == p))
            .filter(|m| filter.resident_id.map_or(true, |r| m.resident_id == r))
            .filter(|m| filter.status.map_or(true, |s| m.status == s))
            .cloned()
            .collect();
        Ok(filter.page().apply(out))
    }

    async fn insert_administration(
        &self,
        mut admin: MedicationAdministration,
    ) -> Result<MedicationAdministration, StoreError> {
        let mut guard = self.administrations.write().await;
        admin.id = Self::next_id(&guard);
        guard.insert(admin.id, admin.clone());
        Ok(admin)
    }

    async fn list_administrations(
        &self,
        filter: &AdministrationFilter,
    ) -> Result<Vec<MedicationAdministration>, StoreError> {
        let guard = self.administrations.read().await;
        let mut out: Vec<MedicationAdministration> = guard
            .values()
            .filter(|a| filter.program_id.map_or(true, |p| a.program_id == p))
            .filter(|a| filter.resident_id.map_or(true, |r| a.resident_id == r))
            .filter(|a| filter.medication_id.map_or(true, |m| a.medication_id == m))
            .filter(|a| within(a.administration_date, filter.from, filter.to))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            (b.administration_date, b.administration_time, b.id).cmp(&(
                a.administration_date,
                a.administration_time,
                a.id,
            ))
        });
        Ok(filter.page().apply(out))
    }

    async fn insert_audit(&self, mut audit: MedicationAudit) -> Result<MedicationAudit, StoreError> {
        let mut guard = self.audits.write().await;
        audit.id = Self::next_id(&guard);
        guard.insert(audit.id, audit.clone());
        Ok(audit)
    }

    async fn get_audit(&self, id: Id) -> Result<Option<MedicationAudit>, StoreError> {
        Ok(self.audits.read().await.get(&id).cloned())
    }

    async fn transition_audit(
        &self,
        id: Id,
        from: AuditStatus,
        to: AuditStatus,
        review: Option<AuditReview>,
    ) -> Result<MedicationAudit, StoreError> {
        let mut guard = self.audits.write().await;
        let audit = guard
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("audit {}", id)))?;
        if audit.status != from {
            return Err(StoreError::StateConflict {
                entity: "audit",
                id,
                expected: from.to_string(),
                found: audit.status.to_string(),
            });
        }
        audit.status = to;
        audit.review = review;
        Ok(audit.clone())
    }

    async fn list_audits(&self, filter: &AuditFilter) -> Result<Vec<MedicationAudit>, StoreError> {
        let guard = self.audits.read().await;
        let mut out: Vec<MedicationAudit> = guard
            .values()
            .filter(|a| filter.program_id.map_or(true, |p| a.program_id == p))
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .filter(|a| within(a.audit_date, filter.from, filter.to))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            (b.audit_date, b.audit_time, b.id).cmp(&(a.audit_date, a.audit_time, a.id))
        });
        Ok(filter.page().apply(out))
    }

    async fn insert_alert(&self, mut alert: MedicationAlert) -> Result<MedicationAlert, StoreError> {
        let mut guard = self.alerts.write().await;
        alert.id = Self::next_id(&guard);
        guard.insert(alert.id, alert.clone());
        Ok(alert)
    }

    async fn get_alert(&self, id: Id) -> Result<Option<MedicationAlert>, StoreError> {
        Ok(self.alerts.read().await.get(&id).cloned())
    }

    async fn transition_alert(
        &self,
        id: Id,
        from: AlertStatus,
        to: AlertStatus,
        resolution: Option<AlertResolution>,
    ) -> Result<MedicationAlert, StoreError> {
        let mut guard = self.alerts.write().await;
        let alert = guard
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("alert {}", id)))?;
        if alert.status != from {
            return Err(StoreError::StateConflict {
                entity: "alert",
                id,
                expected: from.to_string(),
                found: alert.status.to_string(),
            });
        }
        alert.status = to;
        alert.resolution = resolution;
        Ok(alert.clone())
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<MedicationAlert>, StoreError> {
        let guard = self.alerts.read().await;
        let out: Vec<MedicationAlert> = guard
            .values()
            .rev()
            .filter(|a| filter.program_id.map_or(true, |p| a.program_id == p))
            .filter(|a| filter.resident_id.map_or(true, |r| a.resident_id == r))
            .filter(|a| filter.medication_id.map_or(true, |m| a.medication_id == Some(m)))
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .filter(|a| filter.since.map_or(true, |t| a.raised_at >= t))
            .cloned()
            .collect();
        Ok(filter.page().apply(out))
    }
}
