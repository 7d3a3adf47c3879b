use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::dtos::{EffectsResponse, OverdueQuery};
use crate::error::AppError;
use crate::models::PostTripInspection;
use crate::services::inspections::{
    InspectionInput, InspectionQuery, InspectionStats, OverdueVehicle,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inspections", get(list_inspections).post(create_inspection))
        .route("/inspections/today", get(todays_inspections))
        .route("/inspections/stats", get(inspection_stats))
        .route("/inspections/overdue", get(overdue_vehicles))
        .route(
            "/inspections/:id",
            get(get_inspection)
                .put(update_inspection)
                .delete(delete_inspection),
        )
}

#[utoipa::path(
    get,
    path = "/inspections",
    tag = "inspections",
    params(
        ("date" = Option<String>, Query, description = "Single day, YYYY-MM-DD"),
        ("start_date" = Option<String>, Query, description = "Range start, YYYY-MM-DD"),
        ("end_date" = Option<String>, Query, description = "Range end, YYYY-MM-DD"),
        ("trip_type" = Option<String>, Query, description = "internal or long_trip")
    ),
    responses(
        (status = 200, description = "Inspections, newest first", body = [PostTripInspection]),
        (status = 400, description = "Incomplete or inverted date range")
    ),
    security(("user_id" = []))
)]
pub async fn list_inspections(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<InspectionQuery>,
) -> Result<Json<Vec<PostTripInspection>>, AppError> {
    Ok(Json(state.inspections().list(query).await?))
}

#[utoipa::path(
    post,
    path = "/inspections",
    tag = "inspections",
    request_body = InspectionInput,
    responses(
        (status = 200, description = "Inspection recorded; resolving the pending entry is reported in side_effects"),
        (status = 400, description = "Missing vehicle, driver, trip type or destination"),
        (status = 404, description = "Vehicle, driver or pending entry not found")
    ),
    security(("user_id" = []))
)]
pub async fn create_inspection(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<InspectionInput>,
) -> Result<Json<EffectsResponse<PostTripInspection>>, AppError> {
    info!(user_id = %current_user.id, "Post-trip inspection submitted");
    let outcome = state
        .inspections()
        .create(input, Some(current_user.id))
        .await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/inspections/today",
    tag = "inspections",
    responses((status = 200, description = "Inspections recorded today", body = [PostTripInspection])),
    security(("user_id" = []))
)]
pub async fn todays_inspections(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<PostTripInspection>>, AppError> {
    Ok(Json(state.inspections().list_today().await?))
}

#[utoipa::path(
    get,
    path = "/inspections/stats",
    tag = "inspections",
    responses((status = 200, description = "Counts over the last 30 days", body = InspectionStats)),
    security(("user_id" = []))
)]
pub async fn inspection_stats(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<InspectionStats>, AppError> {
    Ok(Json(state.inspections().stats().await?))
}

#[utoipa::path(
    get,
    path = "/inspections/overdue",
    tag = "inspections",
    params(("trip_type" = String, Query, description = "internal (7 days) or long_trip (30 days)")),
    responses((status = 200, description = "Active vehicles due for an inspection", body = [OverdueVehicle])),
    security(("user_id" = []))
)]
pub async fn overdue_vehicles(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<OverdueQuery>,
) -> Result<Json<Vec<OverdueVehicle>>, AppError> {
    Ok(Json(state.inspections().overdue(query.trip_type).await?))
}

#[utoipa::path(
    get,
    path = "/inspections/{id}",
    tag = "inspections",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 200, description = "Inspection", body = PostTripInspection),
        (status = 404, description = "Inspection not found")
    ),
    security(("user_id" = []))
)]
pub async fn get_inspection(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PostTripInspection>, AppError> {
    Ok(Json(state.inspections().get(id).await?))
}

#[utoipa::path(
    put,
    path = "/inspections/{id}",
    tag = "inspections",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = InspectionInput,
    responses(
        (status = 200, description = "Inspection updated; completeness derived again", body = PostTripInspection),
        (status = 400, description = "Missing required field"),
        (status = 404, description = "Inspection not found")
    ),
    security(("user_id" = []))
)]
pub async fn update_inspection(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<InspectionInput>,
) -> Result<Json<PostTripInspection>, AppError> {
    Ok(Json(state.inspections().update(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/inspections/{id}",
    tag = "inspections",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 204, description = "Inspection deleted"),
        (status = 404, description = "Inspection not found")
    ),
    security(("user_id" = []))
)]
pub async fn delete_inspection(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.inspections().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
