use redb::TableDefinition;

/// Users table: email -> UserRecord (serialized)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Registration order: sequence number -> email
/// Iterated to list users in creation order
pub const USER_ORDER: TableDefinition<u64, &str> = TableDefinition::new("user_order");

/// Files table: file_id -> FileRecord (serialized)
pub const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// User files index: email -> Vec<file_id>
/// Used for listing and cascade delete when a user is removed
pub const USER_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("user_files");

/// User devices: email -> Vec<DeviceRecord>
pub const USER_DEVICES: TableDefinition<&str, &[u8]> = TableDefinition::new("user_devices");
