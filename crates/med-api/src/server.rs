//! Axum server and routes.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use med_types::*;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub tracker: Arc<dyn MedTracker>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/medications", post(handle_add_medication).get(handle_list_medications))
        .route("/medications/:id", get(handle_get_medication))
        .route("/medications/:id/update", post(handle_update_medication))
        .route("/medications/:id/discontinue", post(handle_discontinue))
        .route("/medications/:id/decrement", post(handle_decrement))
        .route("/medications/:id/count", post(handle_set_count))
        .route(
            "/administrations",
            post(handle_log_administration).get(handle_list_administrations),
        )
        .route("/audits", post(handle_submit_audit).get(handle_list_audits))
        .route("/audits/:id", get(handle_get_audit))
        .route("/audits/:id/review", post(handle_review_audit))
        .route("/audits/:id/approve", post(handle_approve_audit))
        .route("/audits/:id/deny", post(handle_deny_audit))
        .route("/alerts", post(handle_raise_alert).get(handle_list_alerts))
        .route("/alerts/:id", get(handle_get_alert))
        .route("/alerts/:id/resolve", post(handle_resolve_alert))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type Reply<T> = Json<BaseResponse<T>>;

/// Wrap an engine result in the envelope. Failures keep HTTP 200 and carry the code.
fn reply<T>(res: Result<T, MedError>, message: &str) -> Reply<T> {
    match res {
        Ok(data) => Json(BaseResponse::ok(message, data)),
        Err(e) => {
            let code = e.code();
            if code >= 500 {
                tracing::error!(error = %e, "request failed");
            } else {
                tracing::debug!(code, error = %e, "request rejected");
            }
            Json(BaseResponse::error(code, e.to_string()))
        }
    }
}

/// Body of the approve and deny shortcuts.
#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub staff_id: Id,
    #[serde(default)]
    pub notes: Option<String>,
}

async fn handle_add_medication(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddMedicationRequest>,
) -> Reply<ResidentMedication> {
    reply(state.tracker.add_medication(req).await, "Medication added")
}

async fn handle_list_medications(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MedicationFilter>,
) -> Reply<Vec<ResidentMedication>> {
    reply(state.tracker.list_medications(&filter).await, "Success")
}

async fn handle_get_medication(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
) -> Reply<ResidentMedication> {
    reply(state.tracker.get_medication(id).await, "Success")
}

async fn handle_update_medication(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
    Json(req): Json<UpdateMedicationRequest>,
) -> Reply<ResidentMedication> {
    reply(state.tracker.update_medication(id, req).await, "Medication updated")
}

async fn handle_discontinue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
    Json(req): Json<StaffAction>,
) -> Reply<ResidentMedication> {
    reply(
        state.tracker.discontinue_medication(id, req.staff_id).await,
        "Medication discontinued",
    )
}

async fn handle_decrement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
    Json(req): Json<DecrementRequest>,
) -> Reply<ResidentMedication> {
    reply(state.tracker.decrement_medication(id, req).await, "Count decremented")
}

async fn handle_set_count(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
    Json(req): Json<SetCountRequest>,
) -> Reply<ResidentMedication> {
    reply(state.tracker.set_medication_count(id, req).await, "Count set")
}

async fn handle_log_administration(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogAdministrationRequest>,
) -> Reply<MedicationAdministration> {
    reply(state.tracker.log_administration(req).await, "Administration logged")
}

async fn handle_list_administrations(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AdministrationFilter>,
) -> Reply<Vec<MedicationAdministration>> {
    reply(state.tracker.list_administrations(&filter).await, "Success")
}

async fn handle_submit_audit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitAuditRequest>,
) -> Reply<MedicationAudit> {
    reply(state.tracker.submit_audit(req).await, "Audit submitted")
}

async fn handle_list_audits(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AuditFilter>,
) -> Reply<Vec<MedicationAudit>> {
    reply(state.tracker.list_audits(&filter).await, "Success")
}

async fn handle_get_audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
) -> Reply<MedicationAudit> {
    reply(state.tracker.get_audit(id).await, "Success")
}

async fn handle_review_audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
    Json(req): Json<ReviewAuditRequest>,
) -> Reply<MedicationAudit> {
    reply(state.tracker.review_audit(id, req).await, "Audit reviewed")
}

async fn handle_approve_audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
    Json(req): Json<DecisionBody>,
) -> Reply<MedicationAudit> {
    reply(
        state.tracker.approve_audit(id, req.staff_id, req.notes).await,
        "Audit approved",
    )
}

async fn handle_deny_audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
    Json(req): Json<DecisionBody>,
) -> Reply<MedicationAudit> {
    reply(
        state.tracker.deny_audit(id, req.staff_id, req.notes).await,
        "Audit denied",
    )
}

async fn handle_raise_alert(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RaiseAlertRequest>,
) -> Reply<MedicationAlert> {
    reply(state.tracker.raise_alert(req).await, "Alert raised")
}

async fn handle_list_alerts(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AlertFilter>,
) -> Reply<Vec<MedicationAlert>> {
    reply(state.tracker.list_alerts(&filter).await, "Success")
}

async fn handle_get_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
) -> Reply<MedicationAlert> {
    reply(state.tracker.get_alert(id).await, "Success")
}

async fn handle_resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
    Json(req): Json<StaffAction>,
) -> Reply<MedicationAlert> {
    reply(state.tracker.resolve_alert(id, req.staff_id).await, "Alert resolved")
}

async fn handle_health() -> &'static str {
    "ok"
}
