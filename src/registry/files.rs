//! File association registry
//!
//! Records which user owns which blob. `files` holds one record per file_id,
//! `user_files` lists a user's file_ids in first-upload order.

use redb::{ReadOnlyTable, ReadTransaction, ReadableTable, Table, WriteTransaction};

use crate::db::{decode, encode, tables};
use crate::error::{AppError, Result};
use crate::models::FileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Created,
    /// Same user uploaded the same filename before; the record was replaced
    Replaced,
}

pub struct FileRegistry<F, I> {
    files: F,
    index: I,
}

pub type FileReader = FileRegistry<
    ReadOnlyTable<&'static str, &'static [u8]>,
    ReadOnlyTable<&'static str, &'static [u8]>,
>;

pub type FileWriter<'txn> = FileRegistry<
    Table<'txn, &'static str, &'static [u8]>,
    Table<'txn, &'static str, &'static [u8]>,
>;

impl FileReader {
    pub fn open_read(txn: &ReadTransaction) -> Result<Self> {
        Ok(Self {
            files: txn.open_table(tables::FILES)?,
            index: txn.open_table(tables::USER_FILES)?,
        })
    }
}

impl<F, I> FileRegistry<F, I>
where
    F: ReadableTable<&'static str, &'static [u8]>,
    I: ReadableTable<&'static str, &'static [u8]>,
{
    /// File ids owned by a user, in first-upload order
    pub fn list_for_user(&self, email: &str) -> Result<Vec<String>> {
        Ok(self
            .index
            .get(email)?
            .map(|bytes| decode(bytes.value()))
            .transpose()?
            .unwrap_or_default())
    }

    pub fn find_by_id(&self, file_id: &str) -> Result<Option<FileRecord>> {
        self.files
            .get(file_id)?
            .map(|bytes| decode(bytes.value()))
            .transpose()
    }

    /// Look up a file, only if it belongs to `email`
    pub fn find(&self, email: &str, file_id: &str) -> Result<Option<FileRecord>> {
        Ok(self
            .find_by_id(file_id)?
            .filter(|record| record.email == email))
    }

    pub fn count(&self) -> Result<u64> {
        Ok(self.files.len()?)
    }
}

impl<'txn> FileWriter<'txn> {
    pub fn open(txn: &'txn WriteTransaction) -> Result<Self> {
        Ok(Self {
            files: txn.open_table(tables::FILES)?,
            index: txn.open_table(tables::USER_FILES)?,
        })
    }

    fn store_index(&mut self, email: &str, file_ids: &[String]) -> Result<()> {
        if file_ids.is_empty() {
            self.index.remove(email)?;
        } else {
            self.index.insert(email, encode(&file_ids)?.as_slice())?;
        }
        Ok(())
    }

    /// Record an upload for a user whose existence the caller has checked
    ///
    /// Re-uploading the same file_id for the same user replaces the record
    /// and keeps its identifier. A file_id owned by another user is rejected.
    pub fn record_upload(&mut self, record: FileRecord) -> Result<Recorded> {
        let (record, outcome) = match self.find_by_id(&record.file_id)? {
            Some(existing) if existing.email != record.email => {
                tracing::warn!(
                    "Upload of {} by {} collides with a file owned by another user",
                    record.file_id,
                    record.email
                );
                return Err(AppError::FileIdConflict(record.file_id));
            }
            Some(existing) => (
                FileRecord {
                    id: existing.id,
                    ..record
                },
                Recorded::Replaced,
            ),
            None => (record, Recorded::Created),
        };

        self.files
            .insert(record.file_id.as_str(), encode(&record)?.as_slice())?;

        if outcome == Recorded::Created {
            let mut file_ids = self.list_for_user(&record.email)?;
            file_ids.push(record.file_id.clone());
            self.store_index(&record.email, &file_ids)?;
        }

        Ok(outcome)
    }

    /// Remove one association; false when the user does not own `file_id`
    pub fn remove(&mut self, email: &str, file_id: &str) -> Result<bool> {
        if self.find(email, file_id)?.is_none() {
            return Ok(false);
        }
        self.files.remove(file_id)?;

        let mut file_ids = self.list_for_user(email)?;
        file_ids.retain(|id| id != file_id);
        self.store_index(email, &file_ids)?;

        Ok(true)
    }

    /// Remove every association of a user, returning the removed file_ids
    /// so the caller can clean up blobs
    pub fn delete_all_for_user(&mut self, email: &str) -> Result<Vec<String>> {
        let file_ids = self.list_for_user(email)?;
        for file_id in &file_ids {
            self.files.remove(file_id.as_str())?;
        }
        self.index.remove(email)?;
        Ok(file_ids)
    }
}
