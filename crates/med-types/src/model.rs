//! Domain records: medication lines (the ledger), administrations, audits, and alerts.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric identifier for every stored entity and for staff members.
pub type Id = i64;

/// Unrecognized tag for one of the closed enums below.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseTagError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed enum serialized as its upper-case tag, with `as_str`, `Display`
/// and a case-insensitive `FromStr`.
macro_rules! tag_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $tag)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseTagError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| ParseTagError {
                        kind: $label,
                        value: s.to_string(),
                    })
            }
        }
    };
}

tag_enum! {
    /// Lifecycle of a medication line. Lines are discontinued, never deleted.
    pub enum MedicationStatus ("medication status") {
        Active => "ACTIVE",
        Discontinued => "DISCONTINUED",
    }
}

tag_enum! {
    /// What happened at an administration event.
    pub enum AdministrationAction ("administration action") {
        Administered => "ADMINISTERED",
        Refused => "REFUSED",
        Held => "HELD",
        Late => "LATE",
        Missed => "MISSED",
    }
}

tag_enum! {
    /// Staff shift, derived from a local wall-clock time.
    pub enum Shift ("shift") {
        /// 07:00 inclusive to 15:00 exclusive.
        Morning => "MORNING",
        /// 15:00 inclusive to 23:00 exclusive.
        Evening => "EVENING",
        /// 23:00 inclusive to 07:00 exclusive, wrapping past midnight.
        Night => "NIGHT",
    }
}

tag_enum! {
    pub enum AuditStatus ("audit status") {
        Submitted => "SUBMITTED",
        Approved => "APPROVED",
        Denied => "DENIED",
    }
}

tag_enum! {
    /// Outcome a reviewer may apply to a submitted audit.
    pub enum AuditDecision ("audit decision") {
        Approved => "APPROVED",
        Denied => "DENIED",
    }
}

tag_enum! {
    pub enum AlertType ("alert type") {
        Critical => "CRITICAL",
        Warning => "WARNING",
        Info => "INFO",
    }
}

tag_enum! {
    pub enum AlertStatus ("alert status") {
        Active => "ACTIVE",
        Resolved => "RESOLVED",
    }
}

tag_enum! {
    /// Why an alert exists.
    pub enum AlertSource ("alert source") {
        Manual => "MANUAL",
        AuditDiscrepancy => "AUDIT_DISCREPANCY",
        LowStock => "LOW_STOCK",
    }
}

impl AuditStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AuditStatus::Submitted)
    }
}

impl From<AuditDecision> for AuditStatus {
    fn from(d: AuditDecision) -> Self {
        match d {
            AuditDecision::Approved => AuditStatus::Approved,
            AuditDecision::Denied => AuditStatus::Denied,
        }
    }
}

/// Descriptive attributes of a prescription line. Never carries quantity state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAttrs {
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescribing_physician: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription_date: Option<NaiveDate>,
}

/// Ledger entry: the on-hand count of one medication for one resident.
///
/// `version` is bumped by the store on every write and is the optimistic
/// concurrency token for count changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentMedication {
    pub id: Id,
    pub resident_id: Id,
    pub program_id: Id,
    #[serde(flatten)]
    pub attrs: MedicationAttrs,
    pub initial_count: i64,
    pub current_count: i64,
    pub status: MedicationStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResidentMedication {
    pub fn is_active(&self) -> bool {
        self.status == MedicationStatus::Active
    }
}

/// Immutable administration event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAdministration {
    pub id: Id,
    pub resident_id: Id,
    pub medication_id: Id,
    pub program_id: Id,
    pub administration_date: NaiveDate,
    pub administration_time: NaiveTime,
    pub shift: Shift,
    pub action: AdministrationAction,
    pub was_late: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes_late: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub administered_by: Id,
    pub created_at: DateTime<Utc>,
}

/// One counted medication within an audit. `variance = current_count - previous_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCountLine {
    pub resident_id: Id,
    pub medication_id: Id,
    pub previous_count: i64,
    pub current_count: i64,
    pub variance: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AuditCountLine {
    pub fn new(
        resident_id: Id,
        medication_id: Id,
        previous_count: i64,
        current_count: i64,
        notes: Option<String>,
    ) -> Self {
        Self {
            resident_id,
            medication_id,
            previous_count,
            current_count,
            variance: current_count - previous_count,
            notes,
        }
    }

    pub fn is_discrepancy(&self) -> bool {
        self.variance != 0
    }
}

/// Who closed out an audit, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReview {
    pub reviewed_by: Id,
    pub reviewed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A shift recount batch compared against the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAudit {
    pub id: Id,
    pub program_id: Id,
    pub audit_date: NaiveDate,
    pub audit_time: NaiveTime,
    pub shift: Shift,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: AuditStatus,
    pub has_discrepancies: bool,
    pub submitted_by: Id,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<AuditReview>,
    pub lines: Vec<AuditCountLine>,
}

impl MedicationAudit {
    pub fn discrepancies(&self) -> impl Iterator<Item = &AuditCountLine> {
        self.lines.iter().filter(|l| l.is_discrepancy())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertResolution {
    pub resolved_by: Id,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAlert {
    pub id: Id,
    pub program_id: Id,
    pub resident_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<Id>,
    pub alert_type: AlertType,
    pub source: AlertSource,
    pub title: String,
    pub description: String,
    pub raised_at: DateTime<Utc>,
    pub status: AlertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<AlertResolution>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_case_insensitively() {
        assert_eq!(
            " administered ".parse::<AdministrationAction>().unwrap(),
            AdministrationAction::Administered
        );
        assert_eq!(
            "audit_discrepancy".parse::<AlertSource>().unwrap(),
            AlertSource::AuditDiscrepancy
        );
        assert_eq!("Night".parse::<Shift>().unwrap(), Shift::Night);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "GIVEN".parse::<AdministrationAction>().unwrap_err();
        assert_eq!(err.kind, "administration action");
        assert_eq!(err.value, "GIVEN");
    }

    #[test]
    fn submitted_is_not_a_decision() {
        assert!("SUBMITTED".parse::<AuditDecision>().is_err());
        assert_eq!(
            AuditStatus::from("denied".parse::<AuditDecision>().unwrap()),
            AuditStatus::Denied
        );
    }

    #[test]
    fn tags_serialize_upper_case() {
        let json = serde_json::to_string(&AlertSource::LowStock).unwrap();
        assert_eq!(json, "\"LOW_STOCK\"");
        let back: AlertType = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(back, AlertType::Critical);
    }

    #[test]
    fn variance_is_counted_minus_expected() {
        let line = AuditCountLine::new(1, 2, 28, 25, None);
        assert_eq!(line.variance, -3);
        assert!(line.is_discrepancy());
        assert!(!AuditCountLine::new(1, 2, 28, 28, None).is_discrepancy());
    }
}
