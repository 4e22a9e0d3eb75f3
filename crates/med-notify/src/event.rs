//! Events published by the medication tracker.

use med_types::{AlertType, AuditStatus, Id};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MedEvent {
    AlertRaised {
        alert_id: Id,
        program_id: Id,
        resident_id: Id,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        medication_id: Option<Id>,
        alert_type: AlertType,
        title: String,
    },
    AlertResolved {
        alert_id: Id,
        program_id: Id,
        resolved_by: Id,
    },
    AuditSubmitted {
        audit_id: Id,
        program_id: Id,
        has_discrepancies: bool,
        discrepancy_count: usize,
    },
    AuditReviewed {
        audit_id: Id,
        program_id: Id,
        status: AuditStatus,
        reviewed_by: Id,
    },
    LowStock {
        medication_id: Id,
        program_id: Id,
        resident_id: Id,
        current_count: i64,
        threshold: i64,
    },
}

impl MedEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            MedEvent::AlertRaised { .. } => "alert_raised",
            MedEvent::AlertResolved { .. } => "alert_resolved",
            MedEvent::AuditSubmitted { .. } => "audit_submitted",
            MedEvent::AuditReviewed { .. } => "audit_reviewed",
            MedEvent::LowStock { .. } => "low_stock",
        }
    }

    pub fn program_id(&self) -> Id {
        match self {
            MedEvent::AlertRaised { program_id, .. }
            | MedEvent::AlertResolved { program_id, .. }
            | MedEvent::AuditSubmitted { program_id, .. }
            | MedEvent::AuditReviewed { program_id, .. }
            | MedEvent::LowStock { program_id, .. } => *program_id,
        }
    }
}

/// An event stamped for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub event_id: String,
    pub emitted_at: String,
    #[serde(flatten)]
    pub event: MedEvent,
}

impl Notification {
    pub fn new(event: MedEvent) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            emitted_at: chrono::Utc::now().to_rfc3339(),
            event,
        }
    }
}
