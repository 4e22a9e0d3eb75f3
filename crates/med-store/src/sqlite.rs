//! SQLite-backed store.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use med_types::*;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS medications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resident_id INTEGER NOT NULL,
    program_id INTEGER NOT NULL,
    medication_name TEXT NOT NULL,
    dosage TEXT NOT NULL,
    frequency TEXT NOT NULL,
    prescribing_physician TEXT,
    special_instructions TEXT,
    prescription_date TEXT,
    initial_count INTEGER NOT NULL,
    current_count INTEGER NOT NULL CHECK (current_count >= 0),
    status TEXT NOT NULL,
    version INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS administrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resident_id INTEGER NOT NULL,
    medication_id INTEGER NOT NULL REFERENCES medications(id),
    program_id INTEGER NOT NULL,
    administration_date TEXT NOT NULL,
    administration_time TEXT NOT NULL,
    shift TEXT NOT NULL,
    action TEXT NOT NULL,
    was_late INTEGER NOT NULL,
    minutes_late INTEGER,
    notes TEXT,
    administered_by INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    program_id INTEGER NOT NULL,
    audit_date TEXT NOT NULL,
    audit_time TEXT NOT NULL,
    shift TEXT NOT NULL,
    notes TEXT,
    status TEXT NOT NULL,
    has_discrepancies INTEGER NOT NULL,
    submitted_by INTEGER NOT NULL,
    submitted_at TEXT NOT NULL,
    reviewed_by INTEGER,
    reviewed_at TEXT,
    review_notes TEXT
);

CREATE TABLE IF NOT EXISTS audit_lines (
    audit_id INTEGER NOT NULL REFERENCES audits(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    resident_id INTEGER NOT NULL,
    medication_id INTEGER NOT NULL,
    previous_count INTEGER NOT NULL,
    current_count INTEGER NOT NULL,
    variance INTEGER NOT NULL,
    notes TEXT,
    PRIMARY KEY (audit_id, position)
);

CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    program_id INTEGER NOT NULL,
    resident_id INTEGER NOT NULL,
    medication_id INTEGER,
    audit_id INTEGER,
    alert_type TEXT NOT NULL,
    source TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    raised_at TEXT NOT NULL,
    status TEXT NOT NULL,
    resolved_by INTEGER,
    resolved_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_medications_resident ON medications(resident_id);
CREATE INDEX IF NOT EXISTS idx_administrations_resident ON administrations(resident_id, administration_date);
CREATE INDEX IF NOT EXISTS idx_audits_program ON audits(program_id, audit_date);
CREATE INDEX IF NOT EXISTS idx_alerts_program ON alerts(program_id, status);
"#;

const MEDICATION_COLUMNS: &str = "id, resident_id, program_id, medication_name, dosage, frequency, \
     prescribing_physician, special_instructions, prescription_date, initial_count, current_count, \
     status, version, created_at, updated_at";

const ADMINISTRATION_COLUMNS: &str = "id, resident_id, medication_id, program_id, \
     administration_date, administration_time, shift, action, was_late, minutes_late, notes, \
     administered_by, created_at";

const AUDIT_COLUMNS: &str = "id, program_id, audit_date, audit_time, shift, notes, status, \
     has_discrepancies, submitted_by, submitted_at, reviewed_by, reviewed_at, review_notes";

const ALERT_COLUMNS: &str = "id, program_id, resident_id, medication_id, audit_id, alert_type, \
     source, title, description, raised_at, status, resolved_by, resolved_at";

/// SQLite-backed store for persistence across restarts.
pub struct SqliteMedStore {
    conn: std::sync::Mutex<Connection>,
}

impl SqliteMedStore {
    /// Open (or create) a database at the given path and ensure the schema exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(sql_err)?;
        Self::init(conn)
    }

    /// Private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(sql_err)?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Other(format!("failed to acquire lock: {}", e)))?;
        f(&conn).map_err(sql_err)
    }

    /// Like `with_conn` for operations that can also fail a precondition.
    fn with_conn_checked<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<Result<T, StoreError>, rusqlite::Error>,
    {
        self.with_conn(f)?
    }
}

fn sql_err(e: rusqlite::Error) -> StoreError {
    StoreError::Other(e.to_string())
}

fn parse_col<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_utc(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn opt_utc(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_utc(idx, &s)).transpose()
}

fn medication_from_row(row: &Row) -> rusqlite::Result<ResidentMedication> {
    let prescription_date: Option<String> = row.get(8)?;
    Ok(ResidentMedication {
        id: row.get(0)?,
        resident_id: row.get(1)?,
        program_id: row.get(2)?,
        attrs: MedicationAttrs {
            medication_name: row.get(3)?,
            dosage: row.get(4)?,
            frequency: row.get(5)?,
            prescribing_physician: row.get(6)?,
            special_instructions: row.get(7)?,
            prescription_date: prescription_date
                .map(|d| parse_col::<NaiveDate>(8, &d))
                .transpose()?,
        },
        initial_count: row.get(9)?,
        current_count: row.get(10)?,
        status: parse_col(11, &row.get::<_, String>(11)?)?,
        version: row.get::<_, i64>(12)? as u64,
        created_at: parse_utc(13, &row.get::<_, String>(13)?)?,
        updated_at: parse_utc(14, &row.get::<_, String>(14)?)?,
    })
}

fn administration_from_row(row: &Row) -> rusqlite::Result<MedicationAdministration> {
    Ok(MedicationAdministration {
        id: row.get(0)?,
        resident_id: row.get(1)?,
        medication_id: row.get(2)?,
        program_id: row.get(3)?,
        administration_date: parse_col(4, &row.get::<_, String>(4)?)?,
        administration_time: parse_col::<NaiveTime>(5, &row.get::<_, String>(5)?)?,
        shift: parse_col(6, &row.get::<_, String>(6)?)?,
        action: parse_col(7, &row.get::<_, String>(7)?)?,
        was_late: row.get(8)?,
        minutes_late: row.get(9)?,
        notes: row.get(10)?,
        administered_by: row.get(11)?,
        created_at: parse_utc(12, &row.get::<_, String>(12)?)?,
    })
}

fn audit_from_row(row: &Row) -> rusqlite::Result<MedicationAudit> {
    let reviewed_by: Option<Id> = row.get(10)?;
    let reviewed_at = opt_utc(11, row.get(11)?)?;
    let review = match (reviewed_by, reviewed_at) {
        (Some(reviewed_by), Some(reviewed_at)) => Some(AuditReview {
            reviewed_by,
            reviewed_at,
            notes: row.get(12)?,
        }),
        _ => None,
    };
    Ok(MedicationAudit {
        id: row.get(0)?,
        program_id: row.get(1)?,
        audit_date: parse_col(2, &row.get::<_, String>(2)?)?,
        audit_time: parse_col(3, &row.get::<_, String>(3)?)?,
        shift: parse_col(4, &row.get::<_, String>(4)?)?,
        notes: row.get(5)?,
        status: parse_col(6, &row.get::<_, String>(6)?)?,
        has_discrepancies: row.get(7)?,
        submitted_by: row.get(8)?,
        submitted_at: parse_utc(9, &row.get::<_, String>(9)?)?,
        review,
        lines: Vec::new(),
    })
}

fn alert_from_row(row: &Row) -> rusqlite::Result<MedicationAlert> {
    let resolved_by: Option<Id> = row.get(11)?;
    let resolved_at = opt_utc(12, row.get(12)?)?;
    Ok(MedicationAlert {
        id: row.get(0)?,
        program_id: row.get(1)?,
        resident_id: row.get(2)?,
        medication_id: row.get(3)?,
        audit_id: row.get(4)?,
        alert_type: parse_col(5, &row.get::<_, String>(5)?)?,
        source: parse_col(6, &row.get::<_, String>(6)?)?,
        title: row.get(7)?,
        description: row.get(8)?,
        raised_at: parse_utc(9, &row.get::<_, String>(9)?)?,
        status: parse_col(10, &row.get::<_, String>(10)?)?,
        resolution: match (resolved_by, resolved_at) {
            (Some(resolved_by), Some(resolved_at)) => Some(AlertResolution {
                resolved_by,
                resolved_at,
            }),
            _ => None,
        },
    })
}

fn load_lines(conn: &Connection, audit_id: Id) -> rusqlite::Result<Vec<AuditCountLine>> {
    let mut stmt = conn.prepare(
        "SELECT resident_id, medication_id, previous_count, current_count, variance, notes \
         FROM audit_lines WHERE audit_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map([audit_id], |row| {
        Ok(AuditCountLine {
            resident_id: row.get(0)?,
            medication_id: row.get(1)?,
            previous_count: row.get(2)?,
            current_count: row.get(3)?,
            variance: row.get(4)?,
            notes: row.get(5)?,
        })
    })?;
    let lines: rusqlite::Result<Vec<AuditCountLine>> = rows.collect();
    lines
}

fn load_audit(conn: &Connection, id: Id) -> rusqlite::Result<Option<MedicationAudit>> {
    let sql = format!("SELECT {} FROM audits WHERE id = ?1", AUDIT_COLUMNS);
    let audit = conn.query_row(&sql, [id], audit_from_row).optional()?;
    match audit {
        Some(mut audit) => {
            audit.lines = load_lines(conn, id)?;
            Ok(Some(audit))
        }
        None => Ok(None),
    }
}

/// Accumulates `AND`-joined predicates and their bound values for list queries.
#[derive(Default)]
struct Filter {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Filter {
    fn eq(&mut self, column: &str, value: Option<impl Into<Value>>) -> &mut Self {
        self.push(column, "=", value)
    }

    fn push(&mut self, column: &str, op: &str, value: Option<impl Into<Value>>) -> &mut Self {
        if let Some(v) = value {
            self.values.push(v.into());
            self.clauses
                .push(format!("{} {} ?{}", column, op, self.values.len()));
        }
        self
    }

    fn sql(&self, base: &str, order_by: &str, page: Page) -> String {
        let mut sql = base.to_string();
        if !self.clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.clauses.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY {} LIMIT {} OFFSET {}",
            order_by,
            page.limit.unwrap_or(Page::DEFAULT_LIMIT),
            page.offset.unwrap_or(0)
        ));
        sql
    }
}

fn query_list<T>(
    conn: &Connection,
    sql: &str,
    values: &[Value],
    f: fn(&Row) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), f)?;
    let out: rusqlite::Result<Vec<T>> = rows.collect();
    out
}

#[async_trait::async_trait]
impl MedStore for SqliteMedStore {
    async fn insert_medication(
        &self,
        mut med: ResidentMedication,
    ) -> Result<ResidentMedication, StoreError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO medications (resident_id, program_id, medication_name, dosage, frequency, \
                 prescribing_physician, special_instructions, prescription_date, initial_count, \
                 current_count, status, version, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    med.resident_id,
                    med.program_id,
                    med.attrs.medication_name,
                    med.attrs.dosage,
                    med.attrs.frequency,
                    med.attrs.prescribing_physician,
                    med.attrs.special_instructions,
                    med.attrs.prescription_date.map(|d| d.to_string()),
                    med.initial_count,
                    med.current_count,
                    med.status.as_str(),
                    med.version as i64,
                    med.created_at.to_rfc3339(),
                    med.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        med.id = id;
        Ok(med)
    }

    async fn get_medication(&self, id: Id) -> Result<Option<ResidentMedication>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM medications WHERE id = ?1", MEDICATION_COLUMNS);
            conn.query_row(&sql, [id], medication_from_row).optional()
        })
    }

    async fn update_medication(
        &self,
        med: &ResidentMedication,
        expected_version: u64,
    ) -> Result<ResidentMedication, StoreError> {
        let next_version = expected_version + 1;
        self.with_conn_checked(|conn| {
            let changed = conn.execute(
                "UPDATE medications SET medication_name = ?1, dosage = ?2, frequency = ?3, \
                 prescribing_physician = ?4, special_instructions = ?5, prescription_date = ?6, \
                 current_count = ?7, status = ?8, version = ?9, updated_at = ?10 \
                 WHERE id = ?11 AND version = ?12",
                params![
                    med.attrs.medication_name,
                    med.attrs.dosage,
                    med.attrs.frequency,
                    med.attrs.prescribing_physician,
                    med.attrs.special_instructions,
                    med.attrs.prescription_date.map(|d| d.to_string()),
                    med.current_count,
                    med.status.as_str(),
                    next_version as i64,
                    med.updated_at.to_rfc3339(),
                    med.id,
                    expected_version as i64,
                ],
            )?;
            if changed == 1 {
                let mut next = med.clone();
                next.version = next_version;
                return Ok(Ok(next));
            }
            let found: Option<i64> = conn
                .query_row("SELECT version FROM medications WHERE id = ?1", [med.id], |r| {
                    r.get(0)
                })
                .optional()?;
            Ok(Err(match found {
                Some(found) => StoreError::VersionConflict {
                    entity: "medication",
                    id: med.id,
                    expected: expected_version,
                    found: found as u64,
                },
                None => StoreError::NotFound(format!("medication {}", med.id)),
            }))
        })
    }

    async fn list_medications(
        &self,
        filter: &MedicationFilter,
    ) -> Result<Vec<ResidentMedication>, StoreError> {
        let mut f = Filter::default();
        f.eq("program_id", filter.program_id)
            .eq("resident_id", filter.resident_id)
            .eq("status", filter.status.map(|s| s.as_str().to_string()));
        let sql = f.sql(
            &format!("SELECT {} FROM medications", MEDICATION_COLUMNS),
            "id DESC",
            filter.page(),
        );
        self.with_conn(|conn| query_list(conn, &sql, &f.values, medication_from_row))
    }

    async fn insert_administration(
        &self,
        mut admin: MedicationAdministration,
    ) -> Result<MedicationAdministration, StoreError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO administrations (resident_id, medication_id, program_id, \
                 administration_date, administration_time, shift, action, was_late, minutes_late, \
                 notes, administered_by, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    admin.resident_id,
                    admin.medication_id,
                    admin.program_id,
                    admin.administration_date.to_string(),
                    admin.administration_time.to_string(),
                    admin.shift.as_str(),
                    admin.action.as_str(),
                    admin.was_late,
                    admin.minutes_late,
                    admin.notes,
                    admin.administered_by,
                    admin.created_at.to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        admin.id = id;
        Ok(admin)
    }

    async fn list_administrations(
        &self,
        filter: &AdministrationFilter,
    ) -> Result<Vec<MedicationAdministration>, StoreError> {
        let mut f = Filter::default();
        f.eq("program_id", filter.program_id)
            .eq("resident_id", filter.resident_id)
            .eq("medication_id", filter.medication_id)
            .push("administration_date", ">=", filter.from.map(|d| d.to_string()))
            .push("administration_date", "<=", filter.to.map(|d| d.to_string()));
        let sql = f.sql(
            &format!("SELECT {} FROM administrations", ADMINISTRATION_COLUMNS),
            "administration_date DESC, administration_time DESC, id DESC",
            filter.page(),
        );
        self.with_conn(|conn| query_list(conn, &sql, &f.values, administration_from_row))
    }

    async fn insert_audit(&self, mut audit: MedicationAudit) -> Result<MedicationAudit, StoreError> {
        let id = self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO audits (program_id, audit_date, audit_time, shift, notes, status, \
                 has_discrepancies, submitted_by, submitted_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    audit.program_id,
                    audit.audit_date.to_string(),
                    audit.audit_time.to_string(),
                    audit.shift.as_str(),
                    audit.notes,
                    audit.status.as_str(),
                    audit.has_discrepancies,
                    audit.submitted_by,
                    audit.submitted_at.to_rfc3339(),
                ],
            )?;
            let id = tx.last_insert_rowid();
            for (position, line) in audit.lines.iter().enumerate() {
                tx.execute(
                    "INSERT INTO audit_lines (audit_id, position, resident_id, medication_id, \
                     previous_count, current_count, variance, notes) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        id,
                        position as i64,
                        line.resident_id,
                        line.medication_id,
                        line.previous_count,
                        line.current_count,
                        line.variance,
                        line.notes,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(id)
        })?;
        audit.id = id;
        Ok(audit)
    }

    async fn get_audit(&self, id: Id) -> Result<Option<MedicationAudit>, StoreError> {
        self.with_conn(|conn| load_audit(conn, id))
    }

    async fn transition_audit(
        &self,
        id: Id,
        from: AuditStatus,
        to: AuditStatus,
        review: Option<AuditReview>,
    ) -> Result<MedicationAudit, StoreError> {
        self.with_conn_checked(|conn| {
            let changed = conn.execute(
                "UPDATE audits SET status = ?1, reviewed_by = ?2, reviewed_at = ?3, review_notes = ?4 \
                 WHERE id = ?5 AND status = ?6",
                params![
                    to.as_str(),
                    review.as_ref().map(|r| r.reviewed_by),
                    review.as_ref().map(|r| r.reviewed_at.to_rfc3339()),
                    review.as_ref().and_then(|r| r.notes.clone()),
                    id,
                    from.as_str(),
                ],
            )?;
            let audit = load_audit(conn, id)?;
            Ok(match audit {
                Some(audit) if changed == 1 => Ok(audit),
                Some(audit) => Err(StoreError::StateConflict {
                    entity: "audit",
                    id,
                    expected: from.to_string(),
                    found: audit.status.to_string(),
                }),
                None => Err(StoreError::NotFound(format!("audit {}", id))),
            })
        })
    }

    async fn list_audits(&self, filter: &AuditFilter) -> Result<Vec<MedicationAudit>, StoreError> {
        let mut f = Filter::default();
        f.eq("program_id", filter.program_id)
            .eq("status", filter.status.map(|s| s.as_str().to_string()))
            .push("audit_date", ">=", filter.from.map(|d| d.to_string()))
            .push("audit_date", "<=", filter.to.map(|d| d.to_string()));
        let sql = f.sql(
            &format!("SELECT {} FROM audits", AUDIT_COLUMNS),
            "audit_date DESC, audit_time DESC, id DESC",
            filter.page(),
        );
        self.with_conn(|conn| {
            let mut audits = query_list(conn, &sql, &f.values, audit_from_row)?;
            for audit in &mut audits {
                audit.lines = load_lines(conn, audit.id)?;
            }
            Ok(audits)
        })
    }

    async fn insert_alert(&self, mut alert: MedicationAlert) -> Result<MedicationAlert, StoreError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO alerts (program_id, resident_id, medication_id, audit_id, alert_type, \
                 source, title, description, raised_at, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    alert.program_id,
                    alert.resident_id,
                    alert.medication_id,
                    alert.audit_id,
                    alert.alert_type.as_str(),
                    alert.source.as_str(),
                    alert.title,
                    alert.description,
                    alert.raised_at.to_rfc3339(),
                    alert.status.as_str(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        alert.id = id;
        Ok(alert)
    }

    async fn get_alert(&self, id: Id) -> Result<Option<MedicationAlert>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM alerts WHERE id = ?1", ALERT_COLUMNS);
            conn.query_row(&sql, [id], alert_from_row).optional()
        })
    }

    async fn transition_alert(
        &self,
        id: Id,
        from: AlertStatus,
        to: AlertStatus,
        resolution: Option<AlertResolution>,
    ) -> Result<MedicationAlert, StoreError> {
        self.with_conn_checked(|conn| {
            let changed = conn.execute(
                "UPDATE alerts SET status = ?1, resolved_by = ?2, resolved_at = ?3 \
                 WHERE id = ?4 AND status = ?5",
                params![
                    to.as_str(),
                    resolution.as_ref().map(|r| r.resolved_by),
                    resolution.as_ref().map(|r| r.resolved_at.to_rfc3339()),
                    id,
                    from.as_str(),
                ],
            )?;
            let sql = format!("SELECT {} FROM alerts WHERE id = ?1", ALERT_COLUMNS);
            let alert = conn.query_row(&sql, [id], alert_from_row).optional()?;
            Ok(match alert {
                Some(alert) if changed == 1 => Ok(alert),
                Some(alert) => Err(StoreError::StateConflict {
                    entity: "alert",
                    id,
                    expected: from.to_string(),
                    found: alert.status.to_string(),
                }),
                None => Err(StoreError::NotFound(format!("alert {}", id))),
            })
        })
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<MedicationAlert>, StoreError> {
        let mut f = Filter::default();
        f.eq("program_id", filter.program_id)
            .eq("resident_id", filter.resident_id)
            .eq("medication_id", filter.medication_id)
            .eq("status", filter.status.map(|s| s.as_str().to_string()))
            .push("raised_at", ">=", filter.since.map(|t| t.to_rfc3339()));
        let sql = f.sql(
            &format!("SELECT {} FROM alerts", ALERT_COLUMNS),
            "id DESC",
            filter.page(),
        );
        self.with_conn(|conn| query_list(conn, &sql, &f.values, alert_from_row))
    }
}
