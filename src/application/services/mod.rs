pub mod change_notifier;
pub mod propagation_service;
pub mod sync_service;

pub use change_notifier::ChangeNotifier;
pub use propagation_service::{CaregiverSyncCheck, PropagationService};
pub use sync_service::{DrainOutcome, SyncService};
