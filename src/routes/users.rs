use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::models::User;
use crate::routes::validation::json_body;
use crate::service::RegisterOutcome;

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserResponse {
    pub message: String,
    pub files_deleted: usize,
    pub devices_deleted: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteAllUsersResponse {
    pub message: String,
    pub users_deleted: usize,
    pub files_deleted: usize,
}

/// Register a user, optionally with a device
///
/// POST /user `{"name", "email", "device_id"?}`
///
/// Returns 201 for a new user or a new device on an existing user, 409 when
/// the email is taken (no device given) or the device is already known.
pub async fn register_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let payload = json_body(payload)?;
    let name = payload.name.unwrap_or_default();
    let email = payload.email.unwrap_or_default();
    let device_id = payload.device_id;

    let service = state.service.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        service.register_user(&name, &email, device_id.as_deref())
    })
    .await??;

    let message = match outcome {
        RegisterOutcome::UserCreated { .. } => "User added successfully",
        RegisterOutcome::DeviceAdded => "Device added to existing user",
    };

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    ))
}

/// List every user with file and device ids
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    let service = state.service.clone();
    let users = tokio::task::spawn_blocking(move || service.list_users()).await??;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<User>> {
    let service = state.service.clone();
    let user = tokio::task::spawn_blocking(move || service.get_user(&email)).await??;
    Ok(Json(user))
}

/// Delete a user together with all files and devices
///
/// This action is irreversible. Blobs are removed after the records.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<DeleteUserResponse>> {
    let service = state.service.clone();
    let target = email.clone();
    let report = tokio::task::spawn_blocking(move || service.delete_user(&target)).await??;

    Ok(Json(DeleteUserResponse {
        message: format!("User with email {email} and associated files deleted successfully"),
        files_deleted: report.files_deleted,
        devices_deleted: report.devices_deleted,
    }))
}

pub async fn delete_all_users(
    State(state): State<AppState>,
) -> Result<Json<DeleteAllUsersResponse>> {
    let service = state.service.clone();
    let report = tokio::task::spawn_blocking(move || service.delete_all_users()).await??;

    Ok(Json(DeleteAllUsersResponse {
        message: "All users and associated files deleted successfully".to_string(),
        users_deleted: report.users_deleted,
        files_deleted: report.files_deleted,
    }))
}
