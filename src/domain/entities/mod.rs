pub mod care_record;
pub mod device;
pub mod pending;
pub mod profile;

pub use care_record::{record_owner, EmergencyContact, Memory, Reminder};
pub use device::DeviceIdentity;
pub use pending::PendingSyncEntry;
pub use profile::{HomeLocation, MedicalInfo, UserProfile};
