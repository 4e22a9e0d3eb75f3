//! Alert engine: ACTIVE -> RESOLVED, one way.

use crate::publish;
use chrono::Utc;
use med_notify::{MedEvent, Notifier};
use med_types::*;
use std::sync::Arc;

/// Fields of an alert before it is stored.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub program_id: Id,
    pub resident_id: Id,
    pub medication_id: Option<Id>,
    pub audit_id: Option<Id>,
    pub alert_type: AlertType,
    pub source: AlertSource,
    pub title: String,
    pub description: String,
}

pub struct AlertEngine<S> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
}

impl<S> Clone for AlertEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S: MedStore> AlertEngine<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn get(&self, id: Id) -> Result<MedicationAlert, MedError> {
        self.store
            .get_alert(id)
            .await?
            .ok_or_else(|| MedError::NotFound(format!("alert {}", id)))
    }

    pub async fn raise(&self, new: NewAlert) -> Result<MedicationAlert, MedError> {
        if new.title.trim().is_empty() {
            return Err(MedError::Validation("title is required".to_string()));
        }
        if new.description.trim().is_empty() {
            return Err(MedError::Validation("description is required".to_string()));
        }
        let alert = self
            .store
            .insert_alert(MedicationAlert {
                id: 0,
                program_id: new.program_id,
                resident_id: new.resident_id,
                medication_id: new.medication_id,
                audit_id: new.audit_id,
                alert_type: new.alert_type,
                source: new.source,
                title: new.title,
                description: new.description,
                raised_at: Utc::now(),
                status: AlertStatus::Active,
                resolution: None,
            })
            .await?;
        tracing::info!(
            alert_id = alert.id,
            alert_type = %alert.alert_type,
            source = %alert.source,
            resident_id = alert.resident_id,
            "alert raised"
        );
        publish(
            self.notifier.as_ref(),
            MedEvent::AlertRaised {
                alert_id: alert.id,
                program_id: alert.program_id,
                resident_id: alert.resident_id,
                medication_id: alert.medication_id,
                alert_type: alert.alert_type,
                title: alert.title.clone(),
            },
        )
        .await;
        Ok(alert)
    }

    /// Staff-raised alert. A referenced medication must belong to the resident.
    pub async fn raise_manual(&self, req: RaiseAlertRequest) -> Result<MedicationAlert, MedError> {
        let alert_type: AlertType = req.alert_type.parse()?;
        if let Some(medication_id) = req.medication_id {
            let med = self.store.get_medication(medication_id).await?.ok_or_else(|| {
                MedError::Validation(format!("medication {} does not exist", medication_id))
            })?;
            if med.resident_id != req.resident_id {
                return Err(MedError::Validation(format!(
                    "medication {} does not belong to resident {}",
                    medication_id, req.resident_id
                )));
            }
        }
        tracing::debug!(staff_id = req.staff_id, "manual alert");
        self.raise(NewAlert {
            program_id: req.program_id,
            resident_id: req.resident_id,
            medication_id: req.medication_id,
            audit_id: None,
            alert_type,
            source: AlertSource::Manual,
            title: req.title,
            description: req.description,
        })
        .await
    }

    pub async fn resolve(&self, id: Id, staff_id: Id) -> Result<MedicationAlert, MedError> {
        let alert = self.get(id).await?;
        if alert.status == AlertStatus::Resolved {
            return Err(MedError::InvalidState(format!(
                "alert {} is already resolved",
                id
            )));
        }
        let resolution = AlertResolution {
            resolved_by: staff_id,
            resolved_at: Utc::now(),
        };
        let alert = self
            .store
            .transition_alert(id, AlertStatus::Active, AlertStatus::Resolved, Some(resolution))
            .await?;
        tracing::info!(alert_id = id, staff_id, "alert resolved");
        publish(
            self.notifier.as_ref(),
            MedEvent::AlertResolved {
                alert_id: id,
                program_id: alert.program_id,
                resolved_by: staff_id,
            },
        )
        .await;
        Ok(alert)
    }

    /// Raise a low-stock WARNING for `med` unless one is already ACTIVE for that line.
    /// Returns the new alert, or `None` when an existing one still covers it.
    pub async fn raise_low_stock(
        &self,
        med: &ResidentMedication,
        threshold: i64,
    ) -> Result<Option<MedicationAlert>, MedError> {
        publish(
            self.notifier.as_ref(),
            MedEvent::LowStock {
                medication_id: med.id,
                program_id: med.program_id,
                resident_id: med.resident_id,
                current_count: med.current_count,
                threshold,
            },
        )
        .await;
        let open = self
            .store
            .list_alerts(&AlertFilter {
                medication_id: Some(med.id),
                status: Some(AlertStatus::Active),
                limit: Some(u32::MAX),
                ..Default::default()
            })
            .await?;
        if open.iter().any(|a| a.source == AlertSource::LowStock) {
            return Ok(None);
        }
        let alert = self
            .raise(NewAlert {
                program_id: med.program_id,
                resident_id: med.resident_id,
                medication_id: Some(med.id),
                audit_id: None,
                alert_type: AlertType::Warning,
                source: AlertSource::LowStock,
                title: format!("Low stock: {}", med.attrs.medication_name),
                description: format!(
                    "{} {} has {} units on hand (threshold {})",
                    med.attrs.medication_name, med.attrs.dosage, med.current_count, threshold
                ),
            })
            .await?;
        Ok(Some(alert))
    }
}
