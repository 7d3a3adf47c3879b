use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use super::upload::read_document_form;
use crate::auth::{check_permission, CurrentUser, FleetAction};
use crate::dtos::{AffectedResponse, AssignDriverRequest, EffectsResponse, TransferRequest};
use crate::error::AppError;
use crate::models::{Document, DocumentOwner, FlowEntry, NewVehicle, PostTripInspection, Vehicle};
use crate::services::fleet::VehicleOverview;
use crate::services::inspections::ConditionReport;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vehicles", get(list_vehicles).post(create_vehicle))
        .route(
            "/vehicles/:id",
            get(get_vehicle).put(update_vehicle).delete(delete_vehicle),
        )
        .route("/vehicles/:id/assign", post(assign_driver))
        .route("/vehicles/:id/unassign", post(unassign_driver))
        .route("/vehicles/:id/transfer", post(transfer_vehicle))
        .route(
            "/vehicles/:id/documents",
            get(list_vehicle_documents).post(create_vehicle_document),
        )
        .route(
            "/vehicles/:id/flow-records",
            get(list_vehicle_flows).delete(clear_vehicle_flows),
        )
        .route("/vehicles/:id/inspections", get(list_vehicle_inspections))
        .route("/vehicles/:id/condition-checks/latest", get(latest_condition_check))
}

#[utoipa::path(
    get,
    path = "/vehicles",
    tag = "vehicles",
    responses(
        (status = 200, description = "Vehicles with document health and current driver", body = [VehicleOverview])
    ),
    security(("user_id" = []))
)]
pub async fn list_vehicles(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<VehicleOverview>>, AppError> {
    Ok(Json(state.fleet().list_vehicles().await?))
}

#[utoipa::path(
    post,
    path = "/vehicles",
    tag = "vehicles",
    request_body = NewVehicle,
    responses(
        (status = 200, description = "Vehicle created", body = Vehicle),
        (status = 400, description = "Missing field, duplicate plate or role not allowed")
    ),
    security(("user_id" = []))
)]
pub async fn create_vehicle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(new): Json<NewVehicle>,
) -> Result<Json<Vehicle>, AppError> {
    check_permission(&current_user, FleetAction::ManageFleet)?;
    Ok(Json(state.fleet().create_vehicle(new).await?))
}

#[utoipa::path(
    get,
    path = "/vehicles/{id}",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle", body = Vehicle),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn get_vehicle(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(state.fleet().get_vehicle(vehicle_id).await?))
}

#[utoipa::path(
    put,
    path = "/vehicles/{id}",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = NewVehicle,
    responses(
        (status = 200, description = "Vehicle updated", body = Vehicle),
        (status = 400, description = "Invalid fields or role not allowed"),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn update_vehicle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
    Json(changes): Json<NewVehicle>,
) -> Result<Json<Vehicle>, AppError> {
    check_permission(&current_user, FleetAction::ManageFleet)?;
    Ok(Json(state.fleet().update_vehicle(vehicle_id, changes).await?))
}

#[utoipa::path(
    delete,
    path = "/vehicles/{id}",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle and its records deleted; blob release reported in side_effects"),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn delete_vehicle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<EffectsResponse<()>>, AppError> {
    check_permission(&current_user, FleetAction::ManageFleet)?;
    info!(user_id = %current_user.id, vehicle_id = %vehicle_id, "Vehicle delete requested");
    Ok(Json(state.fleet().delete_vehicle(vehicle_id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/vehicles/{id}/assign",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = AssignDriverRequest,
    responses(
        (status = 200, description = "Driver assigned (idempotent for the same driver)", body = Vehicle),
        (status = 400, description = "Vehicle already has a different driver"),
        (status = 404, description = "Vehicle or driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn assign_driver(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
    Json(body): Json<AssignDriverRequest>,
) -> Result<Json<Vehicle>, AppError> {
    check_permission(&current_user, FleetAction::Assign)?;
    Ok(Json(state.assignments().assign(vehicle_id, body.driver_id).await?))
}

#[utoipa::path(
    post,
    path = "/vehicles/{id}/unassign",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle without a driver", body = Vehicle),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn unassign_driver(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<Vehicle>, AppError> {
    check_permission(&current_user, FleetAction::Assign)?;
    Ok(Json(state.assignments().unassign(vehicle_id).await?))
}

#[utoipa::path(
    post,
    path = "/vehicles/{id}/transfer",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Vehicle handed to the new driver", body = Vehicle),
        (status = 400, description = "Vehicle is not assigned to from_driver_id"),
        (status = 404, description = "Vehicle or driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn transfer_vehicle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
    Json(body): Json<TransferRequest>,
) -> Result<Json<Vehicle>, AppError> {
    check_permission(&current_user, FleetAction::Assign)?;
    let vehicle = state
        .assignments()
        .transfer(vehicle_id, body.from_driver_id, body.to_driver_id)
        .await?;
    Ok(Json(vehicle))
}

#[utoipa::path(
    get,
    path = "/vehicles/{id}/documents",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle documents, soonest expiry first", body = [Document]),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn list_vehicle_documents(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, AppError> {
    let documents = state
        .documents()
        .list_for(DocumentOwner::Vehicle(vehicle_id))
        .await?;
    Ok(Json(documents))
}

#[utoipa::path(
    post,
    path = "/vehicles/{id}/documents",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Document metadata fields and an optional `file` part"),
    responses(
        (status = 200, description = "Document created with a generated code; alert creation reported in side_effects"),
        (status = 400, description = "Invalid metadata"),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn create_vehicle_document(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<EffectsResponse<Document>>, AppError> {
    let (input, file) = read_document_form(multipart).await?;
    info!(
        user_id = %current_user.id,
        vehicle_id = %vehicle_id,
        with_file = file.is_some(),
        "Vehicle document upload received"
    );
    let outcome = state
        .documents()
        .create(DocumentOwner::Vehicle(vehicle_id), input, file)
        .await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/vehicles/{id}/flow-records",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Flow records of the vehicle's documents, newest first", body = [FlowEntry]),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn list_vehicle_flows(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<Vec<FlowEntry>>, AppError> {
    Ok(Json(state.flows().list_by_vehicle(vehicle_id).await?))
}

#[utoipa::path(
    delete,
    path = "/vehicles/{id}/flow-records",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Number of flow records removed", body = AffectedResponse),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn clear_vehicle_flows(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<AffectedResponse>, AppError> {
    check_permission(&current_user, FleetAction::ManageFleet)?;
    let affected = state.flows().delete_all_for_vehicle(vehicle_id).await?;
    Ok(Json(AffectedResponse { affected }))
}

#[utoipa::path(
    get,
    path = "/vehicles/{id}/inspections",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Post-trip inspections, newest first", body = [PostTripInspection]),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn list_vehicle_inspections(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<Vec<PostTripInspection>>, AppError> {
    Ok(Json(state.inspections().list_for_vehicle(vehicle_id).await?))
}

#[utoipa::path(
    get,
    path = "/vehicles/{id}/condition-checks/latest",
    tag = "vehicles",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Latest condition check, or null", body = ConditionReport),
        (status = 404, description = "Vehicle not found")
    ),
    security(("user_id" = []))
)]
pub async fn latest_condition_check(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<Option<ConditionReport>>, AppError> {
    Ok(Json(state.inspections().latest_check(vehicle_id).await?))
}
