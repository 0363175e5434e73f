//! File handlers: upload, download, list, rename, delete.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;

use cipherbox_core::error::{AppError, ErrorKind};
use cipherbox_core::types::BlobDescriptor;

use crate::dto::request::{RenameRequest, validated};
use crate::dto::response::{RenameResponse, SuccessResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// POST /files/upload
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<BlobDescriptor>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::validation("Uploaded file has no name"))?;
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;

        let descriptor = state
            .blobs
            .upload(&auth, &filename, &data, content_type.as_deref())
            .await?;
        return Ok(Json(descriptor));
    }

    Err(AppError::validation("No file uploaded").into())
}

/// GET /files/download/{name}
pub async fn download(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let file = state.blobs.download(&auth, &name).await?;
    let disposition = file.content_disposition();

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, file.data.len())
        .body(Body::from(file.data))
        .map_err(|e| {
            AppError::with_source(ErrorKind::Internal, "Response build failed", e)
        })?;
    Ok(response)
}

/// GET /files/files
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<BlobDescriptor>>, ApiError> {
    Ok(Json(state.blobs.list(&auth).await?))
}

/// PATCH /files/rename/{name}
pub async fn rename(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(name): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<RenameResponse>, ApiError> {
    let req = validated(req)?;
    let new_file_name = state.blobs.rename(&auth, &name, &req.new_file_name).await?;
    Ok(Json(RenameResponse {
        success: true,
        new_file_name,
    }))
}

/// DELETE /files/{name}
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(name): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.blobs.delete(&auth, &name).await?;
    Ok(Json(SuccessResponse { success: true }))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::validation(format!("Malformed upload: {}", err.body_text()))
}
