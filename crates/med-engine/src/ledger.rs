//! Quantity ledger: the authoritative on-hand count per resident medication.
//!
//! Every count change is a read followed by a version-checked write. A write that loses a
//! race fails with `ConcurrentModification` and the caller decides whether to retry.

use chrono::Utc;
use med_types::*;
use std::sync::Arc;

/// Count left after removing `quantity` units from `current`.
pub fn checked_decrement(current: i64, quantity: i64) -> Result<i64, MedError> {
    if quantity <= 0 {
        return Err(MedError::InvalidQuantity(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    let next = current - quantity;
    if next < 0 {
        return Err(MedError::InvalidQuantity(format!(
            "cannot remove {} units, only {} on hand",
            quantity, current
        )));
    }
    Ok(next)
}

/// Validate an absolute count.
pub fn checked_count(count: i64) -> Result<i64, MedError> {
    if count < 0 {
        return Err(MedError::InvalidQuantity(format!(
            "count must not be negative, got {}",
            count
        )));
    }
    Ok(count)
}

fn required(field: &str, value: &str) -> Result<(), MedError> {
    if value.trim().is_empty() {
        return Err(MedError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_attrs(attrs: &MedicationAttrs) -> Result<(), MedError> {
    required("medication_name", &attrs.medication_name)?;
    required("dosage", &attrs.dosage)?;
    required("frequency", &attrs.frequency)
}

pub struct Ledger<S> {
    store: Arc<S>,
}

impl<S> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: MedStore> Ledger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: Id) -> Result<ResidentMedication, MedError> {
        self.store
            .get_medication(id)
            .await?
            .ok_or_else(|| MedError::NotFound(format!("medication {}", id)))
    }

    /// Open a new line with `current_count = initial_count`.
    pub async fn create_line(
        &self,
        resident_id: Id,
        program_id: Id,
        attrs: MedicationAttrs,
        initial_count: i64,
    ) -> Result<ResidentMedication, MedError> {
        if initial_count < 0 {
            return Err(MedError::Validation(format!(
                "initial_count must not be negative, got {}",
                initial_count
            )));
        }
        validate_attrs(&attrs)?;
        let now = Utc::now();
        let med = self
            .store
            .insert_medication(ResidentMedication {
                id: 0,
                resident_id,
                program_id,
                attrs,
                initial_count,
                current_count: initial_count,
                status: MedicationStatus::Active,
                version: 0,
                created_at: now,
                updated_at: now,
            })
            .await?;
        tracing::info!(
            medication_id = med.id,
            resident_id,
            initial_count,
            "medication line created"
        );
        Ok(med)
    }

    /// Change descriptive attributes. Counts are untouched.
    pub async fn update_attrs(
        &self,
        id: Id,
        req: UpdateMedicationRequest,
    ) -> Result<ResidentMedication, MedError> {
        let current = self.get(id).await?;
        if !current.is_active() {
            return Err(MedError::InactiveMedication(id));
        }
        let mut next = current.clone();
        let attrs = &mut next.attrs;
        if let Some(v) = req.medication_name {
            attrs.medication_name = v;
        }
        if let Some(v) = req.dosage {
            attrs.dosage = v;
        }
        if let Some(v) = req.frequency {
            attrs.frequency = v;
        }
        if let Some(v) = req.prescribing_physician {
            attrs.prescribing_physician = Some(v);
        }
        if let Some(v) = req.special_instructions {
            attrs.special_instructions = Some(v);
        }
        if let Some(v) = req.prescription_date {
            attrs.prescription_date = Some(v);
        }
        validate_attrs(&next.attrs)?;
        self.write(&current, next).await
    }

    /// Remove `quantity` units. All or nothing: an over-draw leaves the count unchanged.
    pub async fn decrement(&self, id: Id, quantity: i64) -> Result<ResidentMedication, MedError> {
        let current = self.get(id).await?;
        if !current.is_active() {
            return Err(MedError::InactiveMedication(id));
        }
        let remaining = match checked_decrement(current.current_count, quantity) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    medication_id = id,
                    quantity,
                    on_hand = current.current_count,
                    "decrement rejected"
                );
                return Err(e);
            }
        };
        let mut next = current.clone();
        next.current_count = remaining;
        let saved = self.write(&current, next).await?;
        tracing::info!(
            medication_id = id,
            quantity,
            current_count = saved.current_count,
            "medication decremented"
        );
        Ok(saved)
    }

    /// Overwrite the on-hand count. Allowed on discontinued lines: a physical count is a fact.
    pub async fn set_count(&self, id: Id, new_count: i64) -> Result<ResidentMedication, MedError> {
        Ok(self.correct(id, new_count).await?.1)
    }

    /// `set_count` that also returns the count it replaced, read in the same versioned write.
    pub async fn correct(
        &self,
        id: Id,
        new_count: i64,
    ) -> Result<(i64, ResidentMedication), MedError> {
        let count = checked_count(new_count)?;
        let current = self.get(id).await?;
        if count > current.initial_count {
            tracing::warn!(
                medication_id = id,
                count,
                initial_count = current.initial_count,
                "count set above initial count"
            );
        }
        let mut next = current.clone();
        next.current_count = count;
        let saved = self.write(&current, next).await?;
        tracing::info!(
            medication_id = id,
            previous_count = current.current_count,
            current_count = saved.current_count,
            "medication count set"
        );
        Ok((current.current_count, saved))
    }

    /// Put `count` back on a line only if it is still exactly as `saved` left it.
    /// Any write since then fails with `ConcurrentModification` and nothing changes.
    pub async fn restore(
        &self,
        saved: &ResidentMedication,
        count: i64,
    ) -> Result<ResidentMedication, MedError> {
        let mut next = saved.clone();
        next.current_count = checked_count(count)?;
        let restored = self.write(saved, next).await?;
        tracing::info!(
            medication_id = saved.id,
            current_count = restored.current_count,
            "medication count restored"
        );
        Ok(restored)
    }

    pub async fn discontinue(&self, id: Id) -> Result<ResidentMedication, MedError> {
        let current = self.get(id).await?;
        if !current.is_active() {
            return Err(MedError::InvalidState(format!(
                "medication {} is already discontinued",
                id
            )));
        }
        let mut next = current.clone();
        next.status = MedicationStatus::Discontinued;
        let saved = self.write(&current, next).await?;
        tracing::info!(
            medication_id = id,
            current_count = saved.current_count,
            "medication discontinued"
        );
        Ok(saved)
    }

    async fn write(
        &self,
        current: &ResidentMedication,
        mut next: ResidentMedication,
    ) -> Result<ResidentMedication, MedError> {
        next.updated_at = Utc::now();
        Ok(self.store.update_medication(&next, current.version).await?)
    }
}
