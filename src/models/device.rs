use serde::{Deserialize, Serialize};

/// Device registered to a user; stored in a per-user list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Opaque identifier (UUID v4)
    pub id: String,
    pub device_id: String,
    /// Unix timestamp
    pub registered_at: i64,
}
