use axum::body::Body;
use axum::extract::Multipart;
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::blob::Upload;
use crate::error::{AppError, AppResult};
use crate::models::FileRef;
use crate::services::documents::DocumentInput;

/// Multipart form split into its text fields and the optional `file` part.
struct Form {
    fields: Map<String, Value>,
    file: Option<Upload>,
}

async fn read_form(mut multipart: Multipart) -> AppResult<Form> {
    let mut fields = Map::new();
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let mime_type = field.content_type().map(|s| s.to_string());
                let bytes = field.bytes().await?.to_vec();
                // browsers send an empty part when no file was picked
                if file_name.as_deref().map_or(true, str::is_empty) && bytes.is_empty() {
                    continue;
                }
                debug!(file_size = bytes.len(), "Received file part");
                file = Some(Upload {
                    file_name: file_name.unwrap_or_else(|| "upload.bin".to_string()),
                    mime_type,
                    bytes,
                });
            }
            "" => {}
            _ => {
                let text = field.text().await?;
                if !text.trim().is_empty() {
                    fields.insert(name, Value::String(text));
                }
            }
        }
    }

    Ok(Form { fields, file })
}

/// Document metadata fields plus an optional file.
pub async fn read_document_form(multipart: Multipart) -> AppResult<(DocumentInput, Option<Upload>)> {
    let form = read_form(multipart).await?;
    let input: DocumentInput = serde_json::from_value(Value::Object(form.fields)).map_err(|err| {
        warn!(error = %err, "Rejected document form");
        AppError::validation(format!("invalid document form: {err}"))
    })?;
    Ok((input, form.file))
}

/// A form whose only meaningful part is `file`.
pub async fn read_file_form(multipart: Multipart) -> AppResult<Upload> {
    read_form(multipart).await?.file.ok_or_else(|| {
        warn!("Upload request missing file field");
        AppError::validation("Missing file")
    })
}

pub fn file_response(file: &FileRef, bytes: Vec<u8>) -> AppResult<Response> {
    let content_type = file
        .mime_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.file_name.replace('"', "")),
        )
        .body(Body::from(bytes))
        .map_err(|_| AppError::Other(anyhow::anyhow!("failed to build response")))
}
