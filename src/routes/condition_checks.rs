use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::dtos::ConditionCheckQuery;
use crate::error::AppError;
use crate::services::inspections::{ConditionCheckInput, ConditionReport};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/condition-checks", get(list_checks).post(create_check))
        .route(
            "/condition-checks/:id",
            get(get_check).put(update_check).delete(delete_check),
        )
}

#[utoipa::path(
    get,
    path = "/condition-checks",
    tag = "condition-checks",
    params(("vehicle_id" = Option<Uuid>, Query, description = "Only checks of this vehicle")),
    responses(
        (status = 200, description = "Checks with their defects, newest first", body = [ConditionReport]),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn list_checks(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ConditionCheckQuery>,
) -> Result<Json<Vec<ConditionReport>>, AppError> {
    Ok(Json(state.inspections().list_checks(query.vehicle_id).await?))
}

#[utoipa::path(
    post,
    path = "/condition-checks",
    tag = "condition-checks",
    request_body = ConditionCheckInput,
    responses(
        (status = 200, description = "Check recorded; unspecified components count as bom", body = ConditionReport),
        (status = 400, description = "vehicle_id missing"),
        (status = 404, description = "Vehicle or driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn create_check(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ConditionCheckInput>,
) -> Result<Json<ConditionReport>, AppError> {
    Ok(Json(
        state
            .inspections()
            .create_check(input, Some(current_user.id))
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/condition-checks/{id}",
    tag = "condition-checks",
    params(("id" = Uuid, Path, description = "Condition check ID")),
    responses(
        (status = 200, description = "Condition check", body = ConditionReport),
        (status = 404, description = "Check not found")
    ),
    security(("user_id" = []))
)]
pub async fn get_check(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConditionReport>, AppError> {
    Ok(Json(state.inspections().get_check(id).await?))
}

#[utoipa::path(
    put,
    path = "/condition-checks/{id}",
    tag = "condition-checks",
    params(("id" = Uuid, Path, description = "Condition check ID")),
    request_body = ConditionCheckInput,
    responses(
        (status = 200, description = "Check updated", body = ConditionReport),
        (status = 404, description = "Check not found")
    ),
    security(("user_id" = []))
)]
pub async fn update_check(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ConditionCheckInput>,
) -> Result<Json<ConditionReport>, AppError> {
    Ok(Json(state.inspections().update_check(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/condition-checks/{id}",
    tag = "condition-checks",
    params(("id" = Uuid, Path, description = "Condition check ID")),
    responses(
        (status = 204, description = "Check deleted"),
        (status = 404, description = "Check not found")
    ),
    security(("user_id" = []))
)]
pub async fn delete_check(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.inspections().delete_check(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
