use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::dtos::{MarkInspectedRequest, TripTypeQuery};
use crate::error::AppError;
use crate::models::PendingInspection;
use crate::services::inspections::{PendingInput, PendingSummary};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pending-inspections", get(list_pending).post(enqueue))
        .route("/pending-inspections/summary", get(pending_summary))
        .route(
            "/pending-inspections/:id",
            get(get_pending).delete(delete_pending),
        )
        .route("/pending-inspections/:id/inspected", post(mark_inspected))
        .route("/pending-inspections/:id/cancel", post(cancel_pending))
}

#[utoipa::path(
    get,
    path = "/pending-inspections",
    tag = "pending-inspections",
    params(("trip_type" = Option<String>, Query, description = "internal or long_trip")),
    responses((status = 200, description = "Open queue entries, newest arrival first", body = [PendingInspection])),
    security(("user_id" = []))
)]
pub async fn list_pending(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<TripTypeQuery>,
) -> Result<Json<Vec<PendingInspection>>, AppError> {
    Ok(Json(state.inspections().list_pending(query.trip_type).await?))
}

#[utoipa::path(
    post,
    path = "/pending-inspections",
    tag = "pending-inspections",
    request_body = PendingInput,
    responses(
        (status = 200, description = "Vehicle queued", body = PendingInspection),
        (status = 400, description = "Missing field or vehicle already queued"),
        (status = 404, description = "Vehicle or driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn enqueue(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<PendingInput>,
) -> Result<Json<PendingInspection>, AppError> {
    info!(user_id = %current_user.id, "Pending inspection submitted");
    Ok(Json(
        state
            .inspections()
            .enqueue(input, Some(current_user.id))
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/pending-inspections/summary",
    tag = "pending-inspections",
    responses((status = 200, description = "Open entries per trip type", body = PendingSummary)),
    security(("user_id" = []))
)]
pub async fn pending_summary(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<PendingSummary>, AppError> {
    Ok(Json(state.inspections().pending_summary().await?))
}

#[utoipa::path(
    get,
    path = "/pending-inspections/{id}",
    tag = "pending-inspections",
    params(("id" = Uuid, Path, description = "Pending inspection ID")),
    responses(
        (status = 200, description = "Queue entry", body = PendingInspection),
        (status = 404, description = "Entry not found")
    ),
    security(("user_id" = []))
)]
pub async fn get_pending(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PendingInspection>, AppError> {
    Ok(Json(state.inspections().get_pending(id).await?))
}

#[utoipa::path(
    post,
    path = "/pending-inspections/{id}/inspected",
    tag = "pending-inspections",
    params(("id" = Uuid, Path, description = "Pending inspection ID")),
    request_body = MarkInspectedRequest,
    responses(
        (status = 200, description = "Entry resolved", body = PendingInspection),
        (status = 400, description = "Entry is no longer pending"),
        (status = 404, description = "Entry or inspection not found")
    ),
    security(("user_id" = []))
)]
pub async fn mark_inspected(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MarkInspectedRequest>,
) -> Result<Json<PendingInspection>, AppError> {
    Ok(Json(
        state
            .inspections()
            .mark_inspected(id, body.inspection_id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/pending-inspections/{id}/cancel",
    tag = "pending-inspections",
    params(("id" = Uuid, Path, description = "Pending inspection ID")),
    responses(
        (status = 200, description = "Entry cancelled", body = PendingInspection),
        (status = 400, description = "Entry is no longer pending"),
        (status = 404, description = "Entry not found")
    ),
    security(("user_id" = []))
)]
pub async fn cancel_pending(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PendingInspection>, AppError> {
    Ok(Json(state.inspections().cancel(id).await?))
}

#[utoipa::path(
    delete,
    path = "/pending-inspections/{id}",
    tag = "pending-inspections",
    params(("id" = Uuid, Path, description = "Pending inspection ID")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "Entry not found")
    ),
    security(("user_id" = []))
)]
pub async fn delete_pending(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.inspections().delete_pending(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
