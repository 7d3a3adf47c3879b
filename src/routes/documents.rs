use axum::extract::{Multipart, Path, State};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use super::upload::{file_response, read_file_form};
use crate::auth::CurrentUser;
use crate::dtos::{AffectedResponse, EffectsResponse};
use crate::error::AppError;
use crate::models::{Alert, Document, FlowEntry};
use crate::services::documents::DocumentInput;
use crate::services::flow::Custody;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list_documents))
        .route("/documents/refresh-status", post(refresh_statuses))
        .route(
            "/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/documents/:id/file", put(replace_file))
        .route("/documents/:id/content", get(download_document))
        .route("/documents/:id/alerts", get(list_alerts))
        .route("/documents/:id/flow-records", get(list_document_flows))
        .route("/documents/:id/custody", get(document_custody))
}

#[utoipa::path(
    get,
    path = "/documents",
    tag = "documents",
    responses(
        (status = 200, description = "Every document with its live status", body = [Document])
    ),
    security(("user_id" = []))
)]
pub async fn list_documents(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(state.documents().list_all().await?))
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document", body = Document),
        (status = 404, description = "Document not found")
    ),
    security(("user_id" = []))
)]
pub async fn get_document(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(state.documents().get(document_id).await?))
}

#[utoipa::path(
    put,
    path = "/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = DocumentInput,
    responses(
        (status = 200, description = "Updated document; status recomputed", body = Document),
        (status = 400, description = "Invalid metadata"),
        (status = 404, description = "Document not found")
    ),
    security(("user_id" = []))
)]
pub async fn update_document(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(document_id): Path<Uuid>,
    Json(input): Json<DocumentInput>,
) -> Result<Json<Document>, AppError> {
    info!(user_id = %current_user.id, document_id = %document_id, "Document update requested");
    Ok(Json(state.documents().update(document_id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document deleted; blob release reported in side_effects"),
        (status = 404, description = "Document not found")
    ),
    security(("user_id" = []))
)]
pub async fn delete_document(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<EffectsResponse<()>>, AppError> {
    info!(user_id = %current_user.id, document_id = %document_id, "Document delete requested");
    Ok(Json(state.documents().delete(document_id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/documents/{id}/file",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "`file` part"),
    responses(
        (status = 200, description = "Document pointing at the new file; old blob release reported in side_effects"),
        (status = 400, description = "Missing file"),
        (status = 404, description = "Document not found")
    ),
    security(("user_id" = []))
)]
pub async fn replace_file(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(document_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<EffectsResponse<Document>>, AppError> {
    let upload = read_file_form(multipart).await?;
    info!(
        user_id = %current_user.id,
        document_id = %document_id,
        file_name = %upload.file_name,
        file_size = upload.bytes.len(),
        "Document file upload received"
    );
    Ok(Json(state.documents().attach_file(document_id, upload).await?.into()))
}

#[utoipa::path(
    get,
    path = "/documents/{id}/content",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "Document not found or no file attached")
    ),
    security(("user_id" = []))
)]
pub async fn download_document(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(document_id): Path<Uuid>,
) -> Result<Response, AppError> {
    info!(user_id = %current_user.id, document_id = %document_id, "File download request received");
    let (file, bytes) = state.documents().download(document_id).await?;
    file_response(&file, bytes)
}

#[utoipa::path(
    get,
    path = "/documents/{id}/alerts",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Expiry alerts", body = [Alert]),
        (status = 404, description = "Document not found")
    ),
    security(("user_id" = []))
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Vec<Alert>>, AppError> {
    Ok(Json(state.documents().alerts(document_id).await?))
}

#[utoipa::path(
    get,
    path = "/documents/{id}/flow-records",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Flow history, newest first", body = [FlowEntry]),
        (status = 404, description = "Document not found")
    ),
    security(("user_id" = []))
)]
pub async fn list_document_flows(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Vec<FlowEntry>>, AppError> {
    Ok(Json(state.flows().list_by_document(document_id).await?))
}

#[utoipa::path(
    get,
    path = "/documents/{id}/custody",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "`{\"state\": \"in_storage\"}` or `{\"state\": \"checked_out\", ...}`"),
        (status = 404, description = "Document not found")
    ),
    security(("user_id" = []))
)]
pub async fn document_custody(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Custody>, AppError> {
    Ok(Json(state.flows().custody(document_id).await?))
}

#[utoipa::path(
    post,
    path = "/documents/refresh-status",
    tag = "documents",
    responses(
        (status = 200, description = "Number of stored statuses rewritten", body = AffectedResponse)
    ),
    security(("user_id" = []))
)]
pub async fn refresh_statuses(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<AffectedResponse>, AppError> {
    info!(user_id = %current_user.id, "Status refresh requested");
    let affected = state.documents().refresh_statuses().await?;
    Ok(Json(AffectedResponse { affected }))
}
