pub mod data_domain;
pub mod email;
pub mod sync_outcome;

pub use data_domain::DataDomain;
pub use email::AccountEmail;
pub use sync_outcome::{SyncOutcome, SyncSource};
