/// Default maximum upload size in bytes (10MB)
/// Overridable with MAX_UPLOAD_BYTES
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10_485_760;

/// Log uploads above this size for monitoring (1MB)
pub const WARN_UPLOAD_SIZE_BYTES: usize = 1_048_576;

/// Longest file_id the blob directory accepts (common filesystem name limit)
pub const MAX_FILE_ID_LEN: usize = 255;

/// Separator between email and original filename in a derived file_id
pub const FILE_ID_SEPARATOR: char = '_';

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD_NAME: &str = "file";

/// Slack added to the request body limit for multipart framing around the file
pub const MULTIPART_OVERHEAD_BYTES: usize = 65_536;

/// Prefix of staged blob files inside the upload directory
pub const STAGED_BLOB_PREFIX: &str = ".staged-";

// =============================================================================
// Error Messages
// =============================================================================

/// Registration without a name or email
pub const ERR_NAME_AND_EMAIL_REQUIRED: &str = "Name and email are required";

/// Upload without an email or file part
pub const ERR_EMAIL_AND_FILE_REQUIRED: &str = "Email and file are required";

/// Email path segment was blank
pub const ERR_EMAIL_REQUIRED: &str = "Email is required";

/// Derived file_id exceeds MAX_FILE_ID_LEN
pub const ERR_FILE_ID_TOO_LONG: &str = "File name is too long";
