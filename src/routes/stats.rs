use axum::{Json, extract::State};
use serde::Serialize;
use std::fs;

use crate::{AppState, error::Result};

/// Storage statistics response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub user_count: u64,
    pub file_count: u64,
    pub device_count: u64,
    pub database_size_bytes: u64,
    pub database_size_human: String,
    pub uploads_size_bytes: u64,
    pub uploads_size_human: String,
}

/// Format bytes into human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Stats endpoint
///
/// Record counts and on-disk sizes for monitoring.
///
/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let database_size_bytes = fs::metadata(&state.config.database_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let service = state.service.clone();
    let stats = tokio::task::spawn_blocking(move || service.stats()).await??;

    tracing::info!(
        "Stats requested: {} users, {} files, {} devices, {} database",
        stats.user_count,
        stats.file_count,
        stats.device_count,
        format_bytes(database_size_bytes)
    );

    Ok(Json(StatsResponse {
        user_count: stats.user_count,
        file_count: stats.file_count,
        device_count: stats.device_count,
        database_size_bytes,
        database_size_human: format_bytes(database_size_bytes),
        uploads_size_bytes: stats.blob_size_bytes,
        uploads_size_human: format_bytes(stats.blob_size_bytes),
    }))
}
