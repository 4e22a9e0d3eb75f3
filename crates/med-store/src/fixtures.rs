//! Record builders shared by the backend tests.

use chrono::{NaiveDate, NaiveTime, Utc};
use med_types::*;

pub fn medication(resident_id: Id, program_id: Id, count: i64) -> ResidentMedication {
    let now = Utc::now();
    ResidentMedication {
        id: 0,
        resident_id,
        program_id,
        attrs: MedicationAttrs {
            medication_name: "Sertraline".to_string(),
            dosage: "50mg".to_string(),
            frequency: "daily".to_string(),
            prescribing_physician: Some("Dr. Osei".to_string()),
            special_instructions: None,
            prescription_date: NaiveDate::from_ymd_opt(2026, 1, 5),
        },
        initial_count: count,
        current_count: count,
        status: MedicationStatus::Active,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn audit(program_id: Id, lines: Vec<AuditCountLine>) -> MedicationAudit {
    MedicationAudit {
        id: 0,
        program_id,
        audit_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        audit_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        shift: Shift::Evening,
        notes: None,
        status: AuditStatus::Submitted,
        has_discrepancies: lines.iter().any(AuditCountLine::is_discrepancy),
        submitted_by: 2,
        submitted_at: Utc::now(),
        review: None,
        lines,
    }
}

pub fn alert(resident_id: Id, medication_id: Option<Id>) -> MedicationAlert {
    MedicationAlert {
        id: 0,
        program_id: 1,
        resident_id,
        medication_id,
        audit_id: None,
        alert_type: AlertType::Warning,
        source: AlertSource::Manual,
        title: "Check stock".to_string(),
        description: "Blister pack torn".to_string(),
        raised_at: Utc::now(),
        status: AlertStatus::Active,
        resolution: None,
    }
}
