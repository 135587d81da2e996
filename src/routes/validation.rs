use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
};
use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Convert Unix timestamp to RFC3339 string, defaulting to now if invalid
pub fn timestamp_to_rfc3339(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

/// Unwrap a JSON body, reporting malformed bodies as invalid input
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::warn!("Rejected JSON body: {}", rejection.body_text());
        AppError::InvalidInput(rejection.body_text())
    })
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::InvalidInput(err.body_text())
        }
    }
}

/// Make an uploaded filename safe to echo in a Content-Disposition header
pub fn disposition_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
