use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::AppState;
use crate::error::Result;

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub email: String,
    pub device_ids: Vec<String>,
}

/// GET /user/{email}/device
pub async fn list_devices(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<DeviceListResponse>> {
    let service = state.service.clone();
    let target = email.clone();
    let device_ids = tokio::task::spawn_blocking(move || service.list_devices(&target)).await??;

    Ok(Json(DeviceListResponse { email, device_ids }))
}
