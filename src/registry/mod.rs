//! Registries over the redb tables
//!
//! Each registry wraps the tables it owns. Readers are opened on a read
//! transaction; writers borrow a write transaction so the association service
//! can compose several registries into one atomic change.

pub mod devices;
pub mod files;
pub mod identity;

pub use devices::{DeviceReader, DeviceRegistration, DeviceWriter};
pub use files::{FileReader, FileWriter, Recorded};
pub use identity::{IdentityReader, IdentityWriter, Registration};
