use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::dtos::{FlowWindowQuery, ReturnRequest, WithdrawalRequest};
use crate::error::AppError;
use crate::models::{FlowEntry, FlowRecord, FlowRecordChanges};
use crate::services::flow::{FlowRecordInput, OutstandingDocument, VehicleFlows};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flow-records", get(list_flow_records).post(create_flow_record))
        .route("/flow-records/by-vehicle", get(flows_by_vehicle))
        .route("/flow-records/range", get(flows_in_range))
        .route("/flow-records/outstanding", get(outstanding_documents))
        .route("/flow-records/withdrawal", post(record_withdrawal))
        .route("/flow-records/return", post(record_return))
        .route(
            "/flow-records/:id",
            get(get_flow_record)
                .put(update_flow_record)
                .delete(delete_flow_record),
        )
}

#[utoipa::path(
    get,
    path = "/flow-records",
    tag = "flow-records",
    responses((status = 200, description = "Every flow record, newest first", body = [FlowEntry])),
    security(("user_id" = []))
)]
pub async fn list_flow_records(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<FlowEntry>>, AppError> {
    Ok(Json(state.flows().list_all().await?))
}

#[utoipa::path(
    get,
    path = "/flow-records/by-vehicle",
    tag = "flow-records",
    responses((status = 200, description = "Flow records grouped per vehicle; vehicles without records are absent", body = [VehicleFlows])),
    security(("user_id" = []))
)]
pub async fn flows_by_vehicle(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<VehicleFlows>>, AppError> {
    Ok(Json(state.flows().grouped_by_vehicle().await?))
}

#[utoipa::path(
    get,
    path = "/flow-records/range",
    tag = "flow-records",
    params(
        ("start" = String, Query, description = "RFC 3339 start instant, inclusive"),
        ("end" = String, Query, description = "RFC 3339 end instant, inclusive")
    ),
    responses(
        (status = 200, description = "Flow records inside the window", body = [FlowEntry]),
        (status = 400, description = "start is after end")
    ),
    security(("user_id" = []))
)]
pub async fn flows_in_range(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(window): Query<FlowWindowQuery>,
) -> Result<Json<Vec<FlowEntry>>, AppError> {
    Ok(Json(state.flows().list_between(window.start, window.end).await?))
}

#[utoipa::path(
    get,
    path = "/flow-records/outstanding",
    tag = "flow-records",
    responses((status = 200, description = "Documents currently checked out", body = [OutstandingDocument])),
    security(("user_id" = []))
)]
pub async fn outstanding_documents(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<OutstandingDocument>>, AppError> {
    Ok(Json(state.flows().outstanding().await?))
}

#[utoipa::path(
    post,
    path = "/flow-records",
    tag = "flow-records",
    request_body = FlowRecordInput,
    responses(
        (status = 200, description = "Flow record appended", body = FlowRecord),
        (status = 400, description = "Document is not a vehicle document"),
        (status = 404, description = "Document or driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn create_flow_record(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<FlowRecordInput>,
) -> Result<Json<FlowRecord>, AppError> {
    info!(user_id = %current_user.id, document_id = %input.document_id, "Flow record submitted");
    Ok(Json(state.flows().record(input).await?))
}

#[utoipa::path(
    post,
    path = "/flow-records/withdrawal",
    tag = "flow-records",
    request_body = WithdrawalRequest,
    responses(
        (status = 200, description = "Withdrawal logged at the current time", body = FlowRecord),
        (status = 404, description = "Document or driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn record_withdrawal(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<WithdrawalRequest>,
) -> Result<Json<FlowRecord>, AppError> {
    info!(user_id = %current_user.id, document_id = %body.document_id, "Withdrawal submitted");
    let record = state
        .flows()
        .record_withdrawal(
            body.document_id,
            body.driver_id,
            body.expected_return_time,
            body.notes,
        )
        .await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/flow-records/return",
    tag = "flow-records",
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Return logged at the current time", body = FlowRecord),
        (status = 404, description = "Document or driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn record_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<ReturnRequest>,
) -> Result<Json<FlowRecord>, AppError> {
    info!(user_id = %current_user.id, document_id = %body.document_id, "Return submitted");
    let record = state
        .flows()
        .record_return(body.document_id, body.driver_id, body.notes)
        .await?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/flow-records/{id}",
    tag = "flow-records",
    params(("id" = Uuid, Path, description = "Flow record ID")),
    responses(
        (status = 200, description = "Flow record", body = FlowRecord),
        (status = 404, description = "Flow record not found")
    ),
    security(("user_id" = []))
)]
pub async fn get_flow_record(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FlowRecord>, AppError> {
    Ok(Json(state.flows().get(id).await?))
}

#[utoipa::path(
    put,
    path = "/flow-records/{id}",
    tag = "flow-records",
    params(("id" = Uuid, Path, description = "Flow record ID")),
    request_body = FlowRecordChanges,
    responses(
        (status = 200, description = "Flow record updated; the operation type cannot change", body = FlowRecord),
        (status = 404, description = "Flow record or driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn update_flow_record(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(changes): Json<FlowRecordChanges>,
) -> Result<Json<FlowRecord>, AppError> {
    Ok(Json(state.flows().update(id, changes).await?))
}

#[utoipa::path(
    delete,
    path = "/flow-records/{id}",
    tag = "flow-records",
    params(("id" = Uuid, Path, description = "Flow record ID")),
    responses(
        (status = 204, description = "Flow record deleted"),
        (status = 404, description = "Flow record not found")
    ),
    security(("user_id" = []))
)]
pub async fn delete_flow_record(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, AppError> {
    state.flows().delete(id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
