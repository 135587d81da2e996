pub mod device;
pub mod file;
pub mod user;

pub use device::DeviceRecord;
pub use file::{FileDownload, FileRecord, UploadedFile};
pub use user::{User, UserRecord};
