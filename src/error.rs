use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::blob::BlobError;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::error::EncodeError),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bincode::error::DecodeError),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("File exceeds maximum allowed size")]
    PayloadTooLarge,

    #[error("User not found")]
    UserNotFound,

    #[error("File not found")]
    FileNotFound,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Device already registered for this user")]
    DuplicateDevice,

    #[error("File id {0} belongs to another user")]
    FileIdConflict(String),
}

/// Failure classes exposed to callers of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    PayloadTooLarge,
    StorageFailure,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidInput(_) | AppError::Blob(BlobError::InvalidKey(_)) => {
                ErrorKind::InvalidInput
            }
            AppError::UserNotFound
            | AppError::FileNotFound
            | AppError::Blob(BlobError::NotFound(_)) => ErrorKind::NotFound,
            AppError::UserAlreadyExists
            | AppError::DuplicateDevice
            | AppError::FileIdConflict(_) => ErrorKind::Conflict,
            AppError::PayloadTooLarge => ErrorKind::PayloadTooLarge,
            AppError::Database(_)
            | AppError::Transaction(_)
            | AppError::Table(_)
            | AppError::Storage(_)
            | AppError::Commit(_)
            | AppError::Serialization(_)
            | AppError::Deserialization(_)
            | AppError::TaskJoin(_)
            | AppError::Blob(BlobError::Io(_)) => ErrorKind::StorageFailure,
        }
    }
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let error_message = match kind {
            ErrorKind::StorageFailure => {
                tracing::error!("Storage failure: {:?}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (kind.status(), body).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
