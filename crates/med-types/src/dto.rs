//! Request DTOs, list filters, and the response envelope.
//!
//! Tag-valued fields (action, alert type, decision, shift) arrive as plain strings and are
//! parsed by the engine, so an unknown tag surfaces as a validation error.

use crate::{AlertStatus, AuditStatus, Id, MedicationAttrs, MedicationStatus};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Create a ledger line for a newly prescribed medication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMedicationRequest {
    pub resident_id: Id,
    pub program_id: Id,
    #[serde(flatten)]
    pub attrs: MedicationAttrs,
    pub initial_count: i64,
    pub staff_id: Id,
}

/// Partial update of descriptive attributes; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedicationRequest {
    #[serde(default)]
    pub medication_name: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub prescribing_physician: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub prescription_date: Option<NaiveDate>,
    pub staff_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecrementRequest {
    pub quantity: i64,
    pub staff_id: Id,
}

/// Administrative correction of the on-hand count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCountRequest {
    pub count: i64,
    pub staff_id: Id,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffAction {
    pub staff_id: Id,
}

/// Record an administration event. Does not touch stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogAdministrationRequest {
    pub resident_id: Id,
    pub medication_id: Id,
    pub action: String,
    /// Local wall-clock time of the event; the shift is derived from it.
    pub administered_at: NaiveDateTime,
    #[serde(default)]
    pub was_late: bool,
    #[serde(default)]
    pub minutes_late: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    pub staff_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLineInput {
    pub resident_id: Id,
    pub medication_id: Id,
    /// Physically counted units.
    pub counted: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAuditRequest {
    pub program_id: Id,
    pub staff_id: Id,
    pub audit_date: NaiveDate,
    pub audit_time: NaiveTime,
    /// Derived from `audit_time` when absent.
    #[serde(default)]
    pub shift: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<AuditLineInput>,
}

/// Approve or deny a submitted audit. `status` must be APPROVED or DENIED.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAuditRequest {
    pub status: String,
    pub staff_id: Id,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaiseAlertRequest {
    pub program_id: Id,
    pub resident_id: Id,
    #[serde(default)]
    pub medication_id: Option<Id>,
    pub alert_type: String,
    pub title: String,
    pub description: String,
    pub staff_id: Id,
}

/// Offset/limit paging shared by every list query.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 100;

    /// Apply paging to an already filtered and ordered list.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0) as usize;
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT) as usize;
        items.into_iter().skip(offset).take(limit).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicationFilter {
    #[serde(default)]
    pub program_id: Option<Id>,
    #[serde(default)]
    pub resident_id: Option<Id>,
    #[serde(default)]
    pub status: Option<MedicationStatus>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Date bounds are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdministrationFilter {
    #[serde(default)]
    pub program_id: Option<Id>,
    #[serde(default)]
    pub resident_id: Option<Id>,
    #[serde(default)]
    pub medication_id: Option<Id>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    #[serde(default)]
    pub program_id: Option<Id>,
    #[serde(default)]
    pub status: Option<AuditStatus>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertFilter {
    #[serde(default)]
    pub program_id: Option<Id>,
    #[serde(default)]
    pub resident_id: Option<Id>,
    #[serde(default)]
    pub medication_id: Option<Id>,
    #[serde(default)]
    pub status: Option<AlertStatus>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

macro_rules! paged {
    ($($filter:ident),+) => {
        $(
            impl $filter {
                pub fn page(&self) -> Page {
                    Page {
                        offset: self.offset,
                        limit: self.limit,
                    }
                }
            }
        )+
    };
}

paged!(MedicationFilter, AdministrationFilter, AuditFilter, AlertFilter);

/// Inclusive date-range check used by the list filters.
pub fn within(date: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
}

/// Response envelope: `code` carries the outcome, `data` the payload on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    #[serde(default = "default_code")]
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn default_code() -> i32 {
    200
}

impl<T> BaseResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}
