use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;

use crate::AppState;
use crate::constants::{ERR_EMAIL_AND_FILE_REQUIRED, UPLOAD_FIELD_NAME};
use crate::error::{AppError, Result};
use crate::routes::users::MessageResponse;
use crate::routes::validation::{disposition_filename, timestamp_to_rfc3339};

#[derive(Debug, Serialize)]
pub struct UploadFileResponse {
    pub message: String,
    pub file_id: String,
    pub size_bytes: u64,
    pub uploaded_at: String,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub email: String,
    pub file_ids: Vec<String>,
}

/// Upload a file for a user
///
/// POST /user/{email}/file, multipart form with a `file` part.
/// The stored file_id is `email + "_" + filename`; uploading the same filename
/// again replaces the previous file.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(email): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadFileResponse>)> {
    let mut multipart = multipart?;

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some((filename, bytes));
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::InvalidInput(ERR_EMAIL_AND_FILE_REQUIRED.to_string()))?;

    let service = state.service.clone();
    let uploaded =
        tokio::task::spawn_blocking(move || service.upload_file(&email, &filename, &bytes))
            .await??;

    Ok((
        StatusCode::CREATED,
        Json(UploadFileResponse {
            message: "File uploaded successfully".to_string(),
            file_id: uploaded.file_id,
            size_bytes: uploaded.size_bytes,
            uploaded_at: timestamp_to_rfc3339(uploaded.uploaded_at),
        }),
    ))
}

pub async fn list_files(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<FileListResponse>> {
    let service = state.service.clone();
    let target = email.clone();
    let file_ids = tokio::task::spawn_blocking(move || service.list_files(&target)).await??;

    Ok(Json(FileListResponse { email, file_ids }))
}

/// Download a file as raw bytes
///
/// GET /user/{email}/file/{file_id}
pub async fn download_file(
    State(state): State<AppState>,
    Path((email, file_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let service = state.service.clone();
    let download =
        tokio::task::spawn_blocking(move || service.download_file(&email, &file_id)).await??;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        disposition_filename(&download.original_filename)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    ))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path((email, file_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    let service = state.service.clone();
    let target = file_id.clone();
    tokio::task::spawn_blocking(move || service.delete_file(&email, &target)).await??;

    Ok(Json(MessageResponse {
        message: format!("File {file_id} deleted successfully"),
    }))
}
