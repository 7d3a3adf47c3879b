use axum::extract::{Multipart, Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use super::upload::{file_response, read_document_form, read_file_form};
use crate::auth::{check_permission, CurrentUser, FleetAction};
use crate::dtos::{AffectedResponse, EffectsResponse};
use crate::error::AppError;
use crate::models::{Document, DocumentOwner, Driver, FlowEntry, NewDriver};
use crate::services::reports::DriverProfile;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/drivers", get(list_drivers).post(create_driver))
        .route(
            "/drivers/:id",
            get(get_driver).put(update_driver).delete(delete_driver),
        )
        .route("/drivers/:id/unassign", post(unassign_driver_vehicles))
        .route(
            "/drivers/:id/documents",
            get(list_driver_documents).post(create_driver_document),
        )
        .route("/drivers/:id/flow-records", get(list_driver_flows))
        .route("/drivers/:id/profile", get(driver_profile))
        .route(
            "/drivers/:id/photo",
            get(get_photo).put(upload_photo).delete(delete_photo),
        )
}

#[utoipa::path(
    get,
    path = "/drivers",
    tag = "drivers",
    responses((status = 200, description = "Drivers ordered by name", body = [Driver])),
    security(("user_id" = []))
)]
pub async fn list_drivers(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Driver>>, AppError> {
    Ok(Json(state.fleet().list_drivers().await?))
}

#[utoipa::path(
    post,
    path = "/drivers",
    tag = "drivers",
    request_body = NewDriver,
    responses(
        (status = 200, description = "Driver created", body = Driver),
        (status = 400, description = "Missing field, duplicate staff number or role not allowed")
    ),
    security(("user_id" = []))
)]
pub async fn create_driver(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(new): Json<NewDriver>,
) -> Result<Json<Driver>, AppError> {
    check_permission(&current_user, FleetAction::ManageFleet)?;
    Ok(Json(state.fleet().create_driver(new).await?))
}

#[utoipa::path(
    get,
    path = "/drivers/{id}",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver", body = Driver),
        (status = 404, description = "Driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn get_driver(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(state.fleet().get_driver(driver_id).await?))
}

#[utoipa::path(
    put,
    path = "/drivers/{id}",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    request_body = NewDriver,
    responses(
        (status = 200, description = "Driver updated", body = Driver),
        (status = 400, description = "Invalid fields or role not allowed"),
        (status = 404, description = "Driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn update_driver(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(driver_id): Path<Uuid>,
    Json(changes): Json<NewDriver>,
) -> Result<Json<Driver>, AppError> {
    check_permission(&current_user, FleetAction::ManageFleet)?;
    Ok(Json(state.fleet().update_driver(driver_id, changes).await?))
}

#[utoipa::path(
    delete,
    path = "/drivers/{id}",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver deleted; blob release reported in side_effects"),
        (status = 400, description = "Driver still has an assigned vehicle"),
        (status = 404, description = "Driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn delete_driver(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<EffectsResponse<()>>, AppError> {
    check_permission(&current_user, FleetAction::ManageFleet)?;
    info!(user_id = %current_user.id, driver_id = %driver_id, "Driver delete requested");
    Ok(Json(state.fleet().delete_driver(driver_id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/drivers/{id}/unassign",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Number of vehicles released", body = AffectedResponse)
    ),
    security(("user_id" = []))
)]
pub async fn unassign_driver_vehicles(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<AffectedResponse>, AppError> {
    check_permission(&current_user, FleetAction::Assign)?;
    let affected = state.assignments().unassign_by_driver(driver_id).await?;
    Ok(Json(AffectedResponse { affected }))
}

#[utoipa::path(
    get,
    path = "/drivers/{id}/documents",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver documents, soonest expiry first", body = [Document]),
        (status = 404, description = "Driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn list_driver_documents(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, AppError> {
    let documents = state
        .documents()
        .list_for(DocumentOwner::Driver(driver_id))
        .await?;
    Ok(Json(documents))
}

#[utoipa::path(
    post,
    path = "/drivers/{id}/documents",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Document metadata fields (including `code`) and an optional `file` part"),
    responses(
        (status = 200, description = "Document created; alert creation reported in side_effects"),
        (status = 400, description = "Invalid metadata or duplicate code"),
        (status = 404, description = "Driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn create_driver_document(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(driver_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<EffectsResponse<Document>>, AppError> {
    let (input, file) = read_document_form(multipart).await?;
    info!(
        user_id = %current_user.id,
        driver_id = %driver_id,
        with_file = file.is_some(),
        "Driver document upload received"
    );
    let outcome = state
        .documents()
        .create(DocumentOwner::Driver(driver_id), input, file)
        .await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/drivers/{id}/flow-records",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Hand-offs involving the driver, newest first", body = [FlowEntry]),
        (status = 404, description = "Driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn list_driver_flows(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<Vec<FlowEntry>>, AppError> {
    Ok(Json(state.flows().list_by_driver(driver_id).await?))
}

#[utoipa::path(
    get,
    path = "/drivers/{id}/profile",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Documents, flow records and current vehicle", body = DriverProfile),
        (status = 404, description = "Driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn driver_profile(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<DriverProfile>, AppError> {
    Ok(Json(state.reports().driver_profile(driver_id).await?))
}

#[utoipa::path(
    get,
    path = "/drivers/{id}/photo",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Profile photo", content_type = "application/octet-stream"),
        (status = 404, description = "Driver or photo not found")
    ),
    security(("user_id" = []))
)]
pub async fn get_photo(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(driver_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (file, bytes) = state.fleet().photo(driver_id).await?;
    file_response(&file, bytes)
}

#[utoipa::path(
    put,
    path = "/drivers/{id}/photo",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "`file` part"),
    responses(
        (status = 200, description = "Driver with the new photo; old photo release reported in side_effects"),
        (status = 400, description = "Missing file or role not allowed"),
        (status = 404, description = "Driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn upload_photo(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(driver_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<EffectsResponse<Driver>>, AppError> {
    check_permission(&current_user, FleetAction::ManageFleet)?;
    let upload = read_file_form(multipart).await?;
    Ok(Json(state.fleet().set_photo(driver_id, upload).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/drivers/{id}/photo",
    tag = "drivers",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver without a photo"),
        (status = 404, description = "Driver not found")
    ),
    security(("user_id" = []))
)]
pub async fn delete_photo(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<EffectsResponse<Driver>>, AppError> {
    check_permission(&current_user, FleetAction::ManageFleet)?;
    Ok(Json(state.fleet().remove_photo(driver_id).await?.into()))
}
