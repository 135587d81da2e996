//! User File Server Library
//!
//! Users identified by email, the files they upload and the devices they
//! register. This module exports the core types and functions for testing and
//! reuse.

pub mod blob;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod registry;
pub mod routes;
pub mod service;

pub use blob::{BlobError, BlobStore};
pub use config::Config;
pub use db::{Db, open_database};
pub use error::{AppError, ErrorKind, Result};
pub use service::AssociationService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: AssociationService,
    pub config: Config,
}

impl AppState {
    /// Create a new AppState from opened storage handles and configuration
    pub fn new(db: Db, blobs: BlobStore, config: Config) -> Self {
        let service = AssociationService::new(db, blobs, config.max_upload_bytes);
        Self { service, config }
    }
}
