//! Identity registry: users keyed by email

use redb::{ReadOnlyTable, ReadTransaction, ReadableTable, Table, WriteTransaction};
use uuid::Uuid;

use crate::db::{decode, encode, tables};
use crate::error::Result;
use crate::models::UserRecord;

/// Outcome of [`IdentityRegistry::register`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created(UserRecord),
    /// Email already registered; nothing was written
    AlreadyExists(UserRecord),
}

/// Users table plus the registration order index
pub struct IdentityRegistry<U, O> {
    users: U,
    order: O,
}

pub type IdentityReader = IdentityRegistry<
    ReadOnlyTable<&'static str, &'static [u8]>,
    ReadOnlyTable<u64, &'static str>,
>;

pub type IdentityWriter<'txn> = IdentityRegistry<
    Table<'txn, &'static str, &'static [u8]>,
    Table<'txn, u64, &'static str>,
>;

impl IdentityReader {
    pub fn open_read(txn: &ReadTransaction) -> Result<Self> {
        Ok(Self {
            users: txn.open_table(tables::USERS)?,
            order: txn.open_table(tables::USER_ORDER)?,
        })
    }
}

impl<U, O> IdentityRegistry<U, O>
where
    U: ReadableTable<&'static str, &'static [u8]>,
    O: ReadableTable<u64, &'static str>,
{
    /// Look up a user by exact email
    pub fn find(&self, email: &str) -> Result<Option<UserRecord>> {
        self.users
            .get(email)?
            .map(|bytes| decode(bytes.value()))
            .transpose()
    }

    /// Registered emails in creation order
    pub fn emails(&self) -> Result<Vec<String>> {
        let mut emails = Vec::new();
        for entry in self.order.iter()? {
            let (_, email) = entry?;
            emails.push(email.value().to_string());
        }
        Ok(emails)
    }

    /// All users in creation order
    pub fn list(&self) -> Result<Vec<(String, UserRecord)>> {
        let mut users = Vec::new();
        for email in self.emails()? {
            match self.find(&email)? {
                Some(record) => users.push((email, record)),
                None => tracing::warn!("Order index references missing user {}", email),
            }
        }
        Ok(users)
    }

    pub fn count(&self) -> Result<u64> {
        Ok(self.users.len()?)
    }
}

impl<'txn> IdentityWriter<'txn> {
    pub fn open(txn: &'txn WriteTransaction) -> Result<Self> {
        Ok(Self {
            users: txn.open_table(tables::USERS)?,
            order: txn.open_table(tables::USER_ORDER)?,
        })
    }

    /// Create a user unless the email is taken
    ///
    /// Presence of name and email is checked by the caller.
    pub fn register(&mut self, name: &str, email: &str, now: i64) -> Result<Registration> {
        if let Some(existing) = self.find(email)? {
            return Ok(Registration::AlreadyExists(existing));
        }

        let sequence = self
            .order
            .last()?
            .map(|(sequence, _)| sequence.value() + 1)
            .unwrap_or(1);

        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            sequence,
            created_at: now,
        };
        self.users.insert(email, encode(&record)?.as_slice())?;
        self.order.insert(sequence, email)?;

        Ok(Registration::Created(record))
    }

    /// Remove a user row. Owned files and devices are left to the caller.
    pub fn delete(&mut self, email: &str) -> Result<bool> {
        let removed: Option<UserRecord> = self
            .users
            .remove(email)?
            .map(|bytes| decode(bytes.value()))
            .transpose()?;

        match removed {
            Some(record) => {
                self.order.remove(record.sequence)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
