use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::models::FlowEntry;
use crate::services::reports::{FleetSummary, FlowWindow, OwnedDocument};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/summary", get(fleet_summary))
        .route("/reports/expiring-documents", get(expiring_documents))
        .route("/reports/documents", get(all_documents))
        .route("/reports/flow-records", get(flow_report))
}

#[utoipa::path(
    get,
    path = "/reports/summary",
    tag = "reports",
    responses((status = 200, description = "Live counts of vehicles, drivers, documents and open inspections", body = FleetSummary)),
    security(("user_id" = []))
)]
pub async fn fleet_summary(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<FleetSummary>, AppError> {
    Ok(Json(state.reports().fleet_summary().await?))
}

#[utoipa::path(
    get,
    path = "/reports/expiring-documents",
    tag = "reports",
    responses((status = 200, description = "Expired and expiring documents, soonest expiry first", body = [OwnedDocument])),
    security(("user_id" = []))
)]
pub async fn expiring_documents(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<OwnedDocument>>, AppError> {
    Ok(Json(state.reports().expiring_documents().await?))
}

#[utoipa::path(
    get,
    path = "/reports/documents",
    tag = "reports",
    responses((status = 200, description = "Every document with its owner label", body = [OwnedDocument])),
    security(("user_id" = []))
)]
pub async fn all_documents(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<OwnedDocument>>, AppError> {
    Ok(Json(state.reports().all_documents().await?))
}

#[utoipa::path(
    get,
    path = "/reports/flow-records",
    tag = "reports",
    params(
        ("start" = Option<String>, Query, description = "RFC 3339 start instant"),
        ("end" = Option<String>, Query, description = "RFC 3339 end instant")
    ),
    responses(
        (status = 200, description = "Flow records inside the optional window", body = [FlowEntry]),
        (status = 400, description = "start is after end")
    ),
    security(("user_id" = []))
)]
pub async fn flow_report(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(window): Query<FlowWindow>,
) -> Result<Json<Vec<FlowEntry>>, AppError> {
    Ok(Json(state.reports().flow_report(window).await?))
}
