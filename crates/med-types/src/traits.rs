//! Traits for the medication tracker and its storage backend, plus their error types.

use crate::*;
use async_trait::async_trait;

/// Persistence abstraction. Ids are assigned by the store on insert (the `id` of the
/// record passed in is ignored).
///
/// Contract: writes that carry a precondition (`expected_version`, `from` status) are
/// atomic compare-and-set operations; a failed precondition leaves the record untouched.
#[async_trait]
pub trait MedStore: Send + Sync {
    async fn insert_medication(
        &self,
        med: ResidentMedication,
    ) -> Result<ResidentMedication, StoreError>;

    async fn get_medication(&self, id: Id) -> Result<Option<ResidentMedication>, StoreError>;

    /// Replace a medication line if its stored version still equals `expected_version`.
    /// The stored copy gets `version = expected_version + 1`.
    async fn update_medication(
        &self,
        med: &ResidentMedication,
        expected_version: u64,
    ) -> Result<ResidentMedication, StoreError>;

    async fn list_medications(
        &self,
        filter: &MedicationFilter,
    ) -> Result<Vec<ResidentMedication>, StoreError>;

    async fn insert_administration(
        &self,
        admin: MedicationAdministration,
    ) -> Result<MedicationAdministration, StoreError>;

    async fn list_administrations(
        &self,
        filter: &AdministrationFilter,
    ) -> Result<Vec<MedicationAdministration>, StoreError>;

    async fn insert_audit(&self, audit: MedicationAudit) -> Result<MedicationAudit, StoreError>;

    async fn get_audit(&self, id: Id) -> Result<Option<MedicationAudit>, StoreError>;

    /// Move an audit from `from` to `to`, replacing its review. Fails with
    /// `StateConflict` if the stored status is not `from`.
    async fn transition_audit(
        &self,
        id: Id,
        from: AuditStatus,
        to: AuditStatus,
        review: Option<AuditReview>,
    ) -> Result<MedicationAudit, StoreError>;

    async fn list_audits(&self, filter: &AuditFilter) -> Result<Vec<MedicationAudit>, StoreError>;

    async fn insert_alert(&self, alert: MedicationAlert) -> Result<MedicationAlert, StoreError>;

    async fn get_alert(&self, id: Id) -> Result<Option<MedicationAlert>, StoreError>;

    /// Same compare-and-set rule as `transition_audit`.
    async fn transition_alert(
        &self,
        id: Id,
        from: AlertStatus,
        to: AlertStatus,
        resolution: Option<AlertResolution>,
    ) -> Result<MedicationAlert, StoreError>;

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<MedicationAlert>, StoreError>;
}

/// Caller-facing operations of the medication tracker.
#[async_trait]
pub trait MedTracker: Send + Sync {
    async fn add_medication(&self, req: AddMedicationRequest)
        -> Result<ResidentMedication, MedError>;

    async fn update_medication(
        &self,
        id: Id,
        req: UpdateMedicationRequest,
    ) -> Result<ResidentMedication, MedError>;

    async fn discontinue_medication(
        &self,
        id: Id,
        staff_id: Id,
    ) -> Result<ResidentMedication, MedError>;

    /// Remove dispensed units from stock.
    async fn decrement_medication(
        &self,
        id: Id,
        req: DecrementRequest,
    ) -> Result<ResidentMedication, MedError>;

    /// Overwrite the on-hand count after a manual recount.
    async fn set_medication_count(
        &self,
        id: Id,
        req: SetCountRequest,
    ) -> Result<ResidentMedication, MedError>;

    async fn get_medication(&self, id: Id) -> Result<ResidentMedication, MedError>;

    async fn list_medications(
        &self,
        filter: &MedicationFilter,
    ) -> Result<Vec<ResidentMedication>, MedError>;

    async fn log_administration(
        &self,
        req: LogAdministrationRequest,
    ) -> Result<MedicationAdministration, MedError>;

    async fn list_administrations(
        &self,
        filter: &AdministrationFilter,
    ) -> Result<Vec<MedicationAdministration>, MedError>;

    async fn submit_audit(&self, req: SubmitAuditRequest) -> Result<MedicationAudit, MedError>;

    async fn approve_audit(
        &self,
        id: Id,
        staff_id: Id,
        notes: Option<String>,
    ) -> Result<MedicationAudit, MedError>;

    async fn deny_audit(
        &self,
        id: Id,
        staff_id: Id,
        notes: Option<String>,
    ) -> Result<MedicationAudit, MedError>;

    /// Apply a reviewer decision given as a tag. Anything other than APPROVED or DENIED is
    /// a validation error.
    async fn review_audit(
        &self,
        id: Id,
        req: ReviewAuditRequest,
    ) -> Result<MedicationAudit, MedError> {
        let decision: AuditDecision = req.status.parse()?;
        match decision {
            AuditDecision::Approved => self.approve_audit(id, req.staff_id, req.notes).await,
            AuditDecision::Denied => self.deny_audit(id, req.staff_id, req.notes).await,
        }
    }

    async fn get_audit(&self, id: Id) -> Result<MedicationAudit, MedError>;

    async fn list_audits(&self, filter: &AuditFilter) -> Result<Vec<MedicationAudit>, MedError>;

    async fn raise_alert(&self, req: RaiseAlertRequest) -> Result<MedicationAlert, MedError>;

    async fn resolve_alert(&self, id: Id, staff_id: Id) -> Result<MedicationAlert, MedError>;

    async fn get_alert(&self, id: Id) -> Result<MedicationAlert, MedError>;

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<MedicationAlert>, MedError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("version conflict on {entity} {id}: expected {expected}, found {found}")]
    VersionConflict {
        entity: &'static str,
        id: Id,
        expected: u64,
        found: u64,
    },
    #[error("state conflict on {entity} {id}: expected {expected}, found {found}")]
    StateConflict {
        entity: &'static str,
        id: Id,
        expected: String,
        found: String,
    },
    #[error("store error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MedError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("medication {0} is discontinued")]
    InactiveMedication(Id),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store: {0}")]
    Store(StoreError),
}

impl MedError {
    /// Envelope code reported to callers.
    pub fn code(&self) -> i32 {
        match self {
            MedError::Validation(_) => 400,
            MedError::NotFound(_) => 404,
            MedError::InactiveMedication(_)
            | MedError::InvalidState(_)
            | MedError::ConcurrentModification(_) => 409,
            MedError::InvalidQuantity(_) => 422,
            MedError::Store(_) => 500,
        }
    }
}

impl From<StoreError> for MedError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => MedError::NotFound(msg),
            e @ StoreError::VersionConflict { .. } => MedError::ConcurrentModification(e.to_string()),
            e @ StoreError::StateConflict { .. } => MedError::InvalidState(e.to_string()),
            e @ StoreError::Other(_) => MedError::Store(e),
        }
    }
}

impl From<ParseTagError> for MedError {
    fn from(e: ParseTagError) -> Self {
        MedError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_map_to_domain_errors() {
        let version = MedError::from(StoreError::VersionConflict {
            entity: "medication",
            id: 4,
            expected: 2,
            found: 3,
        });
        assert!(matches!(version, MedError::ConcurrentModification(_)));
        assert_eq!(version.code(), 409);

        let state = MedError::from(StoreError::StateConflict {
            entity: "audit",
            id: 9,
            expected: "SUBMITTED".into(),
            found: "APPROVED".into(),
        });
        assert!(matches!(state, MedError::InvalidState(_)));

        let other = MedError::from(StoreError::Other("disk".into()));
        assert_eq!(other.code(), 500);
    }

    #[test]
    fn bad_tag_is_a_validation_error() {
        let err: MedError = "PENDING".parse::<AuditDecision>().unwrap_err().into();
        assert_eq!(err.code(), 400);
        assert!(err.to_string().contains("PENDING"));
    }
}
