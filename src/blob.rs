//! Flat-directory blob storage
//!
//! Uploaded file bytes live in a single directory, one file per key. The store
//! knows nothing about users or file ids; key derivation belongs to the
//! association service.
//!
//! Writes go through a staging step: the bytes are written and synced to a
//! hidden temporary file inside the same directory, then renamed onto the key.
//! A failed write therefore never clobbers an existing blob, and readers only
//! ever see complete files.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::constants::{MAX_FILE_ID_LEN, STAGED_BLOB_PREFIX};

/// Errors raised by the blob store
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Key cannot be used as a file name in the blob directory
    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    /// No blob stored under the key
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the blob directory
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

/// Bytes written to a temporary file, not yet visible under any key
///
/// Dropping a staged blob without persisting it removes the temporary file.
#[derive(Debug)]
pub struct StagedBlob {
    file: NamedTempFile,
    root: PathBuf,
    size: u64,
}

impl BlobStore {
    /// Open the blob directory, creating it if needed
    pub fn open(root: impl AsRef<Path>) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        tracing::info!("Opening blob store at: {:?}", root);

        fs::create_dir_all(&root).map_err(|e| {
            tracing::error!("Failed to create upload directory: {}", e);
            BlobError::Io(e)
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that a key maps to exactly one plain file inside the directory
    ///
    /// Rejects empty keys, keys longer than the filesystem name limit, path
    /// separators, NUL, and a leading dot (reserved for staged files, and
    /// rules out `.` and `..`).
    pub fn validate_key(key: &str) -> Result<(), BlobError> {
        if key.is_empty() {
            return Err(BlobError::InvalidKey("key is empty".to_string()));
        }
        if key.len() > MAX_FILE_ID_LEN {
            return Err(BlobError::InvalidKey(format!(
                "key exceeds {} bytes",
                MAX_FILE_ID_LEN
            )));
        }
        if key.starts_with('.') {
            return Err(BlobError::InvalidKey(format!("{key} starts with '.'")));
        }
        if key.contains(['/', '\\', '\0']) {
            return Err(BlobError::InvalidKey(format!(
                "{key} contains a path separator"
            )));
        }
        Ok(())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        Self::validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Write bytes to a temporary file in the blob directory
    pub fn stage(&self, bytes: &[u8]) -> Result<StagedBlob, BlobError> {
        let mut file = tempfile::Builder::new()
            .prefix(STAGED_BLOB_PREFIX)
            .tempfile_in(&self.root)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;

        Ok(StagedBlob {
            file,
            root: self.root.clone(),
            size: bytes.len() as u64,
        })
    }

    /// Store bytes under a key, replacing any previous blob
    pub fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        Self::validate_key(key)?;
        self.stage(bytes)?.persist(key)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BlobError::NotFound(key.to_string()),
            _ => BlobError::Io(e),
        })
    }

    /// Remove a blob
    ///
    /// Returns `false` when nothing was stored under the key; callers treat
    /// both outcomes as success.
    pub fn delete(&self, key: &str) -> Result<bool, BlobError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Deleted blob {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    /// All stored keys, sorted. Staged files are skipped.
    pub fn keys(&self) -> Result<Vec<String>, BlobError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && !name.starts_with('.')
            {
                keys.push(name.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Total size of stored blobs in bytes
    pub fn total_size(&self) -> Result<u64, BlobError> {
        let mut total = 0;
        for key in self.keys()? {
            total += fs::metadata(self.root.join(key))?.len();
        }
        Ok(total)
    }
}

impl StagedBlob {
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Atomically rename the staged file onto `key`
    pub fn persist(self, key: &str) -> Result<(), BlobError> {
        BlobStore::validate_key(key)?;
        let target = self.root.join(key);
        self.file.persist(&target).map_err(|e| BlobError::Io(e.error))?;
        tracing::debug!("Persisted blob {} ({} bytes)", key, self.size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, BlobStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::open(temp_dir.path().join("uploads")).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_open_creates_directory() {
        let (temp_dir, store) = test_store();
        assert!(temp_dir.path().join("uploads").is_dir());
        assert_eq!(store.root(), temp_dir.path().join("uploads"));
    }

    #[test]
    fn test_put_get_and_overwrite() {
        let (_temp_dir, store) = test_store();

        store.put("ann@x.com_a.txt", b"first").unwrap();
        assert!(store.exists("ann@x.com_a.txt"));
        assert_eq!(store.get("ann@x.com_a.txt").unwrap(), b"first");

        store.put("ann@x.com_a.txt", b"second").unwrap();
        assert_eq!(store.get("ann@x.com_a.txt").unwrap(), b"second");
        assert_eq!(store.keys().unwrap(), vec!["ann@x.com_a.txt".to_string()]);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (_temp_dir, store) = test_store();
        assert!(!store.exists("nobody_x.bin"));
        assert!(matches!(
            store.get("nobody_x.bin"),
            Err(BlobError::NotFound(key)) if key == "nobody_x.bin"
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_temp_dir, store) = test_store();
        store.put("k", b"v").unwrap();

        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
        assert!(!store.exists("k"));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let (_temp_dir, store) = test_store();

        for key in ["", ".", "..", ".hidden", "a/b", "a\\b", "a\0b"] {
            assert!(
                matches!(store.put(key, b"x"), Err(BlobError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
        let long_key = "a".repeat(MAX_FILE_ID_LEN + 1);
        assert!(matches!(
            BlobStore::validate_key(&long_key),
            Err(BlobError::InvalidKey(_))
        ));
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_dropped_stage_leaves_nothing_behind() {
        let (_temp_dir, store) = test_store();

        let staged = store.stage(b"abandoned").unwrap();
        assert_eq!(staged.size(), 9);
        drop(staged);

        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn test_staged_files_hidden_from_keys() {
        let (_temp_dir, store) = test_store();
        store.put("visible", b"1234").unwrap();
        let _staged = store.stage(b"pending").unwrap();

        assert_eq!(store.keys().unwrap(), vec!["visible".to_string()]);
        assert_eq!(store.total_size().unwrap(), 4);
    }
}
