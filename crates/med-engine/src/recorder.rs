//! Administration recorder: appends immutable administration events.
//!
//! Logging never changes stock. Dispensed units are removed by a separate
//! `Ledger::decrement` call with an explicit quantity.

use crate::{derive_shift, Ledger};
use chrono::Utc;
use med_types::*;
use std::sync::Arc;

pub struct AdministrationRecorder<S> {
    store: Arc<S>,
    ledger: Ledger<S>,
}

impl<S: MedStore> AdministrationRecorder<S> {
    pub fn new(store: Arc<S>, ledger: Ledger<S>) -> Self {
        Self { store, ledger }
    }

    pub async fn log(
        &self,
        req: LogAdministrationRequest,
    ) -> Result<MedicationAdministration, MedError> {
        let action: AdministrationAction = req.action.parse()?;
        if req.minutes_late.is_some() && !req.was_late {
            return Err(MedError::Validation(
                "minutes_late requires was_late".to_string(),
            ));
        }
        let med = match self.ledger.get(req.medication_id).await {
            Ok(med) => med,
            Err(MedError::NotFound(msg)) => return Err(MedError::Validation(msg)),
            Err(e) => return Err(e),
        };
        if med.resident_id != req.resident_id {
            return Err(MedError::Validation(format!(
                "medication {} does not belong to resident {}",
                med.id, req.resident_id
            )));
        }
        if !med.is_active() {
            tracing::warn!(medication_id = med.id, %action, "administration logged against discontinued medication");
        }

        let time = req.administered_at.time();
        let admin = self
            .store
            .insert_administration(MedicationAdministration {
                id: 0,
                resident_id: req.resident_id,
                medication_id: med.id,
                program_id: med.program_id,
                administration_date: req.administered_at.date(),
                administration_time: time,
                shift: derive_shift(time),
                action,
                was_late: req.was_late,
                minutes_late: req.minutes_late,
                notes: req.notes,
                administered_by: req.staff_id,
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(
            administration_id = admin.id,
            medication_id = admin.medication_id,
            %action,
            shift = %admin.shift,
            staff_id = admin.administered_by,
            "administration logged"
        );
        Ok(admin)
    }

    pub async fn list(
        &self,
        filter: &AdministrationFilter,
    ) -> Result<Vec<MedicationAdministration>, MedError> {
        Ok(self.store.list_administrations(filter).await?)
    }
}
