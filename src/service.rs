//! Association service
//!
//! Request-facing operations over users, their files and their devices. Every
//! operation that touches more than one row runs inside a single redb write
//! transaction, so readers see either all of a change or none of it.
//!
//! Blob writes cannot join that transaction. Uploads persist the blob before
//! committing and remove it again if the commit fails; deletions remove blobs
//! only after the commit, and only best-effort.

use chrono::Utc;
use redb::ReadableDatabase;
use serde::Serialize;

use crate::blob::{BlobError, BlobStore};
use crate::constants::{
    ERR_EMAIL_AND_FILE_REQUIRED, ERR_EMAIL_REQUIRED, ERR_FILE_ID_TOO_LONG,
    ERR_NAME_AND_EMAIL_REQUIRED, MAX_FILE_ID_LEN, WARN_UPLOAD_SIZE_BYTES,
};
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{FileDownload, FileRecord, UploadedFile, User, UserRecord};
use crate::registry::{
    DeviceReader, DeviceRegistration, DeviceWriter, FileReader, FileWriter, IdentityReader,
    IdentityWriter, Recorded, Registration,
};

/// Result of a successful [`AssociationService::register_user`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    UserCreated { device_registered: bool },
    /// Existing user, new device
    DeviceAdded,
}

/// Rows removed by a cascade delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub users_deleted: usize,
    pub files_deleted: usize,
    pub devices_deleted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub user_count: u64,
    pub file_count: u64,
    pub device_count: u64,
    pub blob_size_bytes: u64,
}

/// Orchestrates the registries and the blob store
#[derive(Clone)]
pub struct AssociationService {
    db: Db,
    blobs: BlobStore,
    max_upload_bytes: usize,
}

fn require_email(email: &str) -> Result<()> {
    if User::is_present(email) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(ERR_EMAIL_REQUIRED.to_string()))
    }
}

impl AssociationService {
    pub fn new(db: Db, blobs: BlobStore, max_upload_bytes: usize) -> Self {
        Self {
            db,
            blobs,
            max_upload_bytes,
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Register a user, or add a device to an existing one
    ///
    /// A blank `device_id` counts as no device. An existing email without a
    /// device is a conflict; with a known device it is a duplicate.
    pub fn register_user(
        &self,
        name: &str,
        email: &str,
        device_id: Option<&str>,
    ) -> Result<RegisterOutcome> {
        if !User::is_present(name) || !User::is_present(email) {
            return Err(AppError::InvalidInput(
                ERR_NAME_AND_EMAIL_REQUIRED.to_string(),
            ));
        }
        let device_id = device_id.filter(|device_id| User::is_present(device_id));
        let now = Utc::now().timestamp();

        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut identities = IdentityWriter::open(&write_txn)?;
            let mut devices = DeviceWriter::open(&write_txn)?;

            match identities.register(name, email, now)? {
                Registration::Created(_) => {
                    let device_registered = match device_id {
                        Some(device_id) => matches!(
                            devices.register_device(email, device_id, now)?,
                            DeviceRegistration::Created(_)
                        ),
                        None => false,
                    };
                    RegisterOutcome::UserCreated { device_registered }
                }
                Registration::AlreadyExists(_) => {
                    let Some(device_id) = device_id else {
                        tracing::info!("User {} already exists", email);
                        return Err(AppError::UserAlreadyExists);
                    };
                    match devices.register_device(email, device_id, now)? {
                        DeviceRegistration::Created(_) => RegisterOutcome::DeviceAdded,
                        DeviceRegistration::Duplicate => {
                            tracing::info!(
                                "Device {} already registered for {}",
                                device_id,
                                email
                            );
                            return Err(AppError::DuplicateDevice);
                        }
                    }
                }
            }
        };
        write_txn.commit()?;

        match outcome {
            RegisterOutcome::UserCreated { device_registered } => tracing::info!(
                "New user registered: {} (device registered: {})",
                email,
                device_registered
            ),
            RegisterOutcome::DeviceAdded => {
                tracing::info!("Device added to existing user {}", email)
            }
        }
        Ok(outcome)
    }

    /// Store an uploaded file for an existing user
    ///
    /// The blob key is `email + "_" + filename`. Uploading the same filename
    /// again replaces both the blob and its association record.
    pub fn upload_file(&self, email: &str, filename: &str, bytes: &[u8]) -> Result<UploadedFile> {
        if !User::is_present(email) || !User::is_present(filename) {
            return Err(AppError::InvalidInput(
                ERR_EMAIL_AND_FILE_REQUIRED.to_string(),
            ));
        }

        let file_id = FileRecord::derive_file_id(email, filename);
        let uploaded_at = Utc::now().timestamp();

        let write_txn = self.db.begin_write()?;
        let recorded = {
            let identities = IdentityWriter::open(&write_txn)?;
            if identities.find(email)?.is_none() {
                tracing::warn!("Upload attempt for non-existent user: {}", email);
                return Err(AppError::UserNotFound);
            }

            if bytes.len() > self.max_upload_bytes {
                tracing::warn!(
                    "Upload too large from {}: {} bytes (max: {})",
                    email,
                    bytes.len(),
                    self.max_upload_bytes
                );
                return Err(AppError::PayloadTooLarge);
            }
            if bytes.len() > WARN_UPLOAD_SIZE_BYTES {
                tracing::info!("Large upload from {}: {} bytes", email, bytes.len());
            }

            if file_id.len() > MAX_FILE_ID_LEN {
                return Err(AppError::InvalidInput(ERR_FILE_ID_TOO_LONG.to_string()));
            }
            BlobStore::validate_key(&file_id)?;

            let record = FileRecord {
                id: uuid::Uuid::new_v4().to_string(),
                email: email.to_string(),
                file_id: file_id.clone(),
                original_filename: filename.to_string(),
                size_bytes: bytes.len() as u64,
                uploaded_at,
            };

            let mut files = FileWriter::open(&write_txn)?;
            let recorded = files.record_upload(record)?;

            self.blobs.stage(bytes)?.persist(&file_id)?;
            recorded
        };

        if let Err(e) = write_txn.commit() {
            tracing::error!("Commit failed after writing blob {}: {}", file_id, e);
            // A replaced blob's previous record is still live; only a brand
            // new key is safe to remove.
            if recorded == Recorded::Created {
                self.discard_blobs(std::slice::from_ref(&file_id));
            }
            return Err(e.into());
        }

        tracing::info!(
            "File {} stored for {}: {} bytes",
            file_id,
            email,
            bytes.len()
        );

        Ok(UploadedFile {
            file_id,
            size_bytes: bytes.len() as u64,
            uploaded_at,
            replaced: recorded == Recorded::Replaced,
        })
    }

    fn enrich(
        email: String,
        record: UserRecord,
        files: &FileReader,
        devices: &DeviceReader,
    ) -> Result<User> {
        Ok(User {
            name: record.name,
            file_ids: files.list_for_user(&email)?,
            device_ids: devices.list_devices(&email)?,
            email,
        })
    }

    pub fn get_user(&self, email: &str) -> Result<User> {
        let read_txn = self.db.begin_read()?;
        let identities = IdentityReader::open_read(&read_txn)?;
        let files = FileReader::open_read(&read_txn)?;
        let devices = DeviceReader::open_read(&read_txn)?;

        let record = identities.find(email)?.ok_or(AppError::UserNotFound)?;
        Self::enrich(email.to_string(), record, &files, &devices)
    }

    /// Every user with its files and devices, in registration order
    pub fn list_users(&self) -> Result<Vec<User>> {
        let read_txn = self.db.begin_read()?;
        let identities = IdentityReader::open_read(&read_txn)?;
        let files = FileReader::open_read(&read_txn)?;
        let devices = DeviceReader::open_read(&read_txn)?;

        identities
            .list()?
            .into_iter()
            .map(|(email, record)| Self::enrich(email, record, &files, &devices))
            .collect()
    }

    pub fn list_files(&self, email: &str) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let identities = IdentityReader::open_read(&read_txn)?;
        if identities.find(email)?.is_none() {
            return Err(AppError::UserNotFound);
        }
        FileReader::open_read(&read_txn)?.list_for_user(email)
    }

    pub fn list_devices(&self, email: &str) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let identities = IdentityReader::open_read(&read_txn)?;
        if identities.find(email)?.is_none() {
            return Err(AppError::UserNotFound);
        }
        DeviceReader::open_read(&read_txn)?.list_devices(email)
    }

    /// Read a user's file
    ///
    /// A record whose blob has gone missing reads as `FileNotFound`.
    pub fn download_file(&self, email: &str, file_id: &str) -> Result<FileDownload> {
        let record = {
            let read_txn = self.db.begin_read()?;
            let identities = IdentityReader::open_read(&read_txn)?;
            if identities.find(email)?.is_none() {
                return Err(AppError::UserNotFound);
            }
            FileReader::open_read(&read_txn)?
                .find(email, file_id)?
                .ok_or(AppError::FileNotFound)?
        };

        match self.blobs.get(&record.file_id) {
            Ok(bytes) => Ok(FileDownload {
                original_filename: record.original_filename,
                bytes,
            }),
            Err(BlobError::NotFound(_)) => {
                tracing::warn!("Association {} has no blob on disk", record.file_id);
                Err(AppError::FileNotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove one file association and then its blob
    pub fn delete_file(&self, email: &str, file_id: &str) -> Result<()> {
        require_email(email)?;

        let write_txn = self.db.begin_write()?;
        {
            let identities = IdentityWriter::open(&write_txn)?;
            if identities.find(email)?.is_none() {
                return Err(AppError::UserNotFound);
            }
            let mut files = FileWriter::open(&write_txn)?;
            if !files.remove(email, file_id)? {
                return Err(AppError::FileNotFound);
            }
        }
        write_txn.commit()?;

        tracing::info!("File {} deleted for {}", file_id, email);
        self.discard_blobs(&[file_id.to_string()]);
        Ok(())
    }

    /// Delete a user with all files and devices in one transaction
    pub fn delete_user(&self, email: &str) -> Result<CascadeReport> {
        require_email(email)?;

        let write_txn = self.db.begin_write()?;
        let (report, file_ids) = {
            let mut identities = IdentityWriter::open(&write_txn)?;
            let mut files = FileWriter::open(&write_txn)?;
            let mut devices = DeviceWriter::open(&write_txn)?;

            if !identities.delete(email)? {
                tracing::warn!("Delete attempt for non-existent user: {}", email);
                return Err(AppError::UserNotFound);
            }
            let file_ids = files.delete_all_for_user(email)?;
            let report = CascadeReport {
                users_deleted: 1,
                files_deleted: file_ids.len(),
                devices_deleted: devices.delete_all_for_user(email)?,
            };
            (report, file_ids)
        };
        write_txn.commit()?;

        tracing::info!(
            "User {} deleted with {} files and {} devices",
            email,
            report.files_deleted,
            report.devices_deleted
        );
        self.discard_blobs(&file_ids);
        Ok(report)
    }

    /// Apply the user cascade to every user in one transaction
    pub fn delete_all_users(&self) -> Result<CascadeReport> {
        let write_txn = self.db.begin_write()?;
        let (report, file_ids) = {
            let mut identities = IdentityWriter::open(&write_txn)?;
            let mut files = FileWriter::open(&write_txn)?;
            let mut devices = DeviceWriter::open(&write_txn)?;

            let mut report = CascadeReport::default();
            let mut file_ids = Vec::new();
            for email in identities.emails()? {
                identities.delete(&email)?;
                file_ids.extend(files.delete_all_for_user(&email)?);
                report.devices_deleted += devices.delete_all_for_user(&email)?;
                report.users_deleted += 1;
            }
            report.files_deleted = file_ids.len();
            (report, file_ids)
        };
        write_txn.commit()?;

        tracing::info!(
            "All users deleted: {} users, {} files, {} devices",
            report.users_deleted,
            report.files_deleted,
            report.devices_deleted
        );
        self.discard_blobs(&file_ids);
        Ok(report)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let read_txn = self.db.begin_read()?;
        Ok(StoreStats {
            user_count: IdentityReader::open_read(&read_txn)?.count()?,
            file_count: FileReader::open_read(&read_txn)?.count()?,
            device_count: DeviceReader::open_read(&read_txn)?.count()?,
            blob_size_bytes: self.blobs.total_size()?,
        })
    }

    /// Best-effort blob removal after the owning records are gone
    fn discard_blobs(&self, file_ids: &[String]) {
        for file_id in file_ids {
            match self.blobs.delete(file_id) {
                Ok(true) => {}
                Ok(false) => tracing::warn!("Blob {} was already missing", file_id),
                Err(e) => tracing::warn!("Failed to delete blob {}: {}", file_id, e),
            }
        }
    }
}
