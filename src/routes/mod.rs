pub mod devices;
pub mod files;
pub mod health;
pub mod stats;
pub mod users;
pub mod validation;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};

use crate::AppState;
use crate::constants::MULTIPART_OVERHEAD_BYTES;

pub use devices::list_devices;
pub use files::{delete_file, download_file, list_files, upload_file};
pub use health::health_check;
pub use stats::stats;
pub use users::{delete_all_users, delete_user, get_user, list_users, register_user};
pub use validation::timestamp_to_rfc3339;

/// Build the application router
///
/// CORS and request tracing are layered on by the binary.
pub fn router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .route(
            "/user",
            get(list_users).post(register_user).delete(delete_all_users),
        )
        .route("/user/{email}", get(get_user).delete(delete_user))
        .route("/user/{email}/file", get(list_files).post(upload_file))
        .route(
            "/user/{email}/file/{file_id}",
            get(download_file).delete(delete_file),
        )
        .route("/user/{email}/device", get(list_devices))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
