use crate::infra::{AppState, EngineHandle};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use statekeeper::error::AppError;
use statekeeper::workflows::compliance::{
    AuditDateField, AuditEntryType, AuditLogEntry, AuditQuery, ComplianceItem, ComplianceReport,
    License, NewComplianceItem, NewStateProfile, ScanOutcome, StateProfile,
};
use statekeeper::workflows::gamification::GamificationData;
use statekeeper::workflows::CompletionReport;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompleteRequest {
    #[serde(default)]
    pub(crate) note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReopenRequest {
    pub(crate) reason: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuditParams {
    #[serde(default)]
    pub(crate) state_id: Option<String>,
    #[serde(default, rename = "type")]
    pub(crate) kind: Option<AuditEntryType>,
    #[serde(default)]
    pub(crate) date_field: Option<AuditDateField>,
    #[serde(default)]
    pub(crate) from: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) to: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) q: Option<String>,
}

impl AuditParams {
    fn into_query(self) -> AuditQuery {
        AuditQuery {
            state_id: self.state_id,
            kind: self.kind,
            date_field: self.date_field.unwrap_or_default(),
            from: self.from,
            to: self.to,
            text: self.q,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportParams {
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GamificationView {
    #[serde(flatten)]
    pub(crate) data: GamificationData,
    pub(crate) points_to_next_level: u64,
    pub(crate) unlocked_count: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteResponse {
    pub(crate) removed: Vec<String>,
}

pub(crate) fn compliance_router(engine: EngineHandle) -> Router {
    Router::new()
        .route("/api/v1/states", get(list_states).post(create_state))
        .route("/api/v1/states/:state_id", delete(delete_state))
        .route("/api/v1/states/:state_id/items", post(add_item))
        .route(
            "/api/v1/states/:state_id/items/:item_id/complete",
            post(complete_item),
        )
        .route(
            "/api/v1/states/:state_id/items/:item_id/reopen",
            post(reopen_item),
        )
        .route("/api/v1/audit", get(audit_entries))
        .route("/api/v1/licenses", get(list_licenses).post(add_license))
        .route("/api/v1/licenses/scan", post(scan_licenses))
        .route("/api/v1/gamification", get(gamification))
        .route("/api/v1/report", get(report))
        .with_state(engine)
}

pub(crate) fn with_service_routes(engine: EngineHandle) -> Router {
    compliance_router(engine)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn list_states(State(engine): State<EngineHandle>) -> Json<Vec<StateProfile>> {
    Json(engine.read(|engine| engine.registry().states().to_vec()))
}

pub(crate) async fn create_state(
    State(engine): State<EngineHandle>,
    Json(profile): Json<NewStateProfile>,
) -> Result<(StatusCode, Json<StateProfile>), AppError> {
    let state = engine.mutate(|engine| {
        let state = engine.registry_mut().create_state(profile)?;
        engine.refresh_achievements()?;
        Ok(state)
    })?;
    Ok((StatusCode::CREATED, Json(state)))
}

pub(crate) async fn delete_state(
    State(engine): State<EngineHandle>,
    Path(state_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let removed = engine.mutate(|engine| engine.registry_mut().delete_state(&state_id))?;
    Ok(Json(DeleteResponse { removed }))
}

pub(crate) async fn add_item(
    State(engine): State<EngineHandle>,
    Path(state_id): Path<String>,
    Json(item): Json<NewComplianceItem>,
) -> Result<(StatusCode, Json<ComplianceItem>), AppError> {
    let created =
        engine.mutate(|engine| engine.registry_mut().scheduler().add_item(&state_id, item))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn complete_item(
    State(engine): State<EngineHandle>,
    Path((state_id, item_id)): Path<(String, String)>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<CompletionReport>, AppError> {
    let report =
        engine.mutate(|engine| engine.complete_item(&state_id, &item_id, request.note))?;
    Ok(Json(report))
}

pub(crate) async fn reopen_item(
    State(engine): State<EngineHandle>,
    Path((state_id, item_id)): Path<(String, String)>,
    Json(request): Json<ReopenRequest>,
) -> Result<Json<ComplianceItem>, AppError> {
    let reopened = engine.mutate(|engine| {
        engine
            .registry_mut()
            .scheduler()
            .reopen_item(&state_id, &item_id, &request.reason)
    })?;
    Ok(Json(reopened))
}

pub(crate) async fn audit_entries(
    State(engine): State<EngineHandle>,
    Query(params): Query<AuditParams>,
) -> Json<Vec<AuditLogEntry>> {
    let query = params.into_query();
    Json(engine.read(|engine| engine.registry().audit_query(&query)))
}

pub(crate) async fn list_licenses(State(engine): State<EngineHandle>) -> Json<Vec<License>> {
    Json(engine.read(|engine| engine.licenses().to_vec()))
}

pub(crate) async fn add_license(
    State(engine): State<EngineHandle>,
    Json(license): Json<License>,
) -> Result<(StatusCode, Json<License>), AppError> {
    let added = engine.mutate(|engine| engine.add_license(license))?;
    Ok((StatusCode::CREATED, Json(added)))
}

pub(crate) async fn scan_licenses(
    State(engine): State<EngineHandle>,
) -> Result<Json<ScanOutcome>, AppError> {
    let outcome = engine.mutate(|engine| engine.scan_licenses())?;
    Ok(Json(outcome))
}

pub(crate) async fn gamification(State(engine): State<EngineHandle>) -> Json<GamificationView> {
    Json(engine.read(|engine| {
        let data = engine.gamification().data();
        GamificationView {
            points_to_next_level: data.points_to_next_level(),
            unlocked_count: data.unlocked_count(),
            data: data.clone(),
        }
    }))
}

pub(crate) async fn report(
    State(engine): State<EngineHandle>,
    Query(params): Query<ReportParams>,
) -> Json<ComplianceReport> {
    Json(engine.read(|engine| engine.report(params.today.unwrap_or_else(|| engine.today()))))
}
