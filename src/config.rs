use std::env;
use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_MAX_UPLOAD_BYTES;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub environment: String,
    pub log_requests: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()));

        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_database_path(&data_dir));

        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_upload_dir(&data_dir));

        let allowed_origins = parse_origins(
            &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string()),
        );

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .map_err(|_| "Invalid MAX_UPLOAD_BYTES")?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let log_requests = env::var("LOG_REQUESTS")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .map_err(|_| "Invalid LOG_REQUESTS (expected true or false)")?;

        Ok(Config {
            server_host,
            server_port,
            data_dir,
            database_path,
            upload_dir,
            allowed_origins,
            max_upload_bytes,
            environment,
            log_requests,
        })
    }

    /// Configuration rooted at `data_dir` with every other setting defaulted
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            database_path: default_database_path(&data_dir),
            upload_dir: default_upload_dir(&data_dir),
            data_dir,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            environment: "development".to_string(),
            log_requests: false,
        }
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn default_database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("instance").join("data.db")
}

fn default_upload_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("uploads")
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
