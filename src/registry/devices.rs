//! Device registry: per-user device lists

use redb::{ReadOnlyTable, ReadTransaction, ReadableTable, Table, WriteTransaction};
use uuid::Uuid;

use crate::db::{decode, encode, tables};
use crate::error::Result;
use crate::models::DeviceRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRegistration {
    Created(DeviceRecord),
    /// (email, device_id) already present; nothing was written
    Duplicate,
}

pub struct DeviceRegistry<T> {
    devices: T,
}

pub type DeviceReader = DeviceRegistry<ReadOnlyTable<&'static str, &'static [u8]>>;
pub type DeviceWriter<'txn> = DeviceRegistry<Table<'txn, &'static str, &'static [u8]>>;

impl DeviceReader {
    pub fn open_read(txn: &ReadTransaction) -> Result<Self> {
        Ok(Self {
            devices: txn.open_table(tables::USER_DEVICES)?,
        })
    }
}

impl<T> DeviceRegistry<T>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    fn records(&self, email: &str) -> Result<Vec<DeviceRecord>> {
        Ok(self
            .devices
            .get(email)?
            .map(|bytes| decode(bytes.value()))
            .transpose()?
            .unwrap_or_default())
    }

    /// Device ids registered for a user, in registration order
    pub fn list_devices(&self, email: &str) -> Result<Vec<String>> {
        Ok(self
            .records(email)?
            .into_iter()
            .map(|record| record.device_id)
            .collect())
    }

    /// Total number of devices across all users
    pub fn count(&self) -> Result<u64> {
        let mut total = 0;
        for entry in self.devices.iter()? {
            let (_, bytes) = entry?;
            total += decode::<Vec<DeviceRecord>>(bytes.value())?.len() as u64;
        }
        Ok(total)
    }
}

impl<'txn> DeviceWriter<'txn> {
    pub fn open(txn: &'txn WriteTransaction) -> Result<Self> {
        Ok(Self {
            devices: txn.open_table(tables::USER_DEVICES)?,
        })
    }

    /// Add a device to a user
    ///
    /// The caller has already checked that the user exists.
    pub fn register_device(
        &mut self,
        email: &str,
        device_id: &str,
        now: i64,
    ) -> Result<DeviceRegistration> {
        let mut records = self.records(email)?;
        if records.iter().any(|record| record.device_id == device_id) {
            return Ok(DeviceRegistration::Duplicate);
        }

        let record = DeviceRecord {
            id: Uuid::new_v4().to_string(),
            device_id: device_id.to_string(),
            registered_at: now,
        };
        records.push(record.clone());
        self.devices.insert(email, encode(&records)?.as_slice())?;

        Ok(DeviceRegistration::Created(record))
    }

    /// Drop every device of a user, returning how many were removed
    pub fn delete_all_for_user(&mut self, email: &str) -> Result<usize> {
        let removed: Option<Vec<DeviceRecord>> = self
            .devices
            .remove(email)?
            .map(|bytes| decode(bytes.value()))
            .transpose()?;
        Ok(removed.map(|records| records.len()).unwrap_or(0))
    }
}
