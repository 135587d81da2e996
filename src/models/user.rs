use serde::{Deserialize, Serialize};

/// User record stored in redb, keyed by email
/// Uses Unix timestamp for compact storage with bincode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Opaque identifier (UUID v4)
    pub id: String,
    pub name: String,
    /// Position in the registration order table
    pub sequence: u64,
    /// When the user was created (Unix timestamp)
    pub created_at: i64,
}

/// User model for API responses, enriched with owned files and devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub file_ids: Vec<String>,
    pub device_ids: Vec<String>,
}

impl User {
    /// Check that a required field is present and not blank
    pub fn is_present(value: &str) -> bool {
        !value.trim().is_empty()
    }
}
