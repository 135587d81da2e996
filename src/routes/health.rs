use axum::{Json, extract::State};
use redb::ReadableDatabase;
use serde_json::{Value, json};

use crate::AppState;

/// Health check endpoint
///
/// Returns the health status of the server, the database and the upload
/// directory. Used by load balancers and monitoring systems.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    // Check database connectivity by attempting a read transaction
    let db = state.service.db().clone();
    let db_status = tokio::task::spawn_blocking(move || match db.begin_read() {
        Ok(_) => "connected",
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            "disconnected"
        }
    })
    .await
    .unwrap_or("error");

    let uploads_status = if state.service.blobs().root().is_dir() {
        "available"
    } else {
        tracing::error!("Upload directory missing: {:?}", state.service.blobs().root());
        "missing"
    };

    let healthy = db_status == "connected" && uploads_status == "available";

    Json(json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "database": db_status,
        "uploads": uploads_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
