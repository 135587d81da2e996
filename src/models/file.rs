use serde::{Deserialize, Serialize};

use crate::constants::FILE_ID_SEPARATOR;

/// Association between a user and one uploaded blob, keyed by file_id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Opaque identifier (UUID v4)
    pub id: String,
    /// Owning user
    pub email: String,
    /// Blob key, `email + "_" + original_filename`
    pub file_id: String,
    pub original_filename: String,
    pub size_bytes: u64,
    /// When the blob was last written (Unix timestamp)
    pub uploaded_at: i64,
}

impl FileRecord {
    /// Derive the blob key for a user's upload
    ///
    /// Unique per (email, filename); uploading the same filename twice maps to
    /// the same key.
    pub fn derive_file_id(email: &str, original_filename: &str) -> String {
        format!("{email}{FILE_ID_SEPARATOR}{original_filename}")
    }
}

/// Upload result returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub file_id: String,
    pub size_bytes: u64,
    pub uploaded_at: i64,
    /// True when an earlier upload with the same filename was replaced
    pub replaced: bool,
}

/// Downloaded blob together with the name it was uploaded under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDownload {
    pub original_filename: String,
    pub bytes: Vec<u8>,
}
