use std::sync::Arc;
use tracing::debug;

use crate::application::ports::{ProfileStore, ServerGateway};
use crate::domain::value_objects::AccountEmail;

/// Best-effort signal to other devices that a change occurred.
///
/// Tries the gateway's notification variants; if none succeed, records a
/// local last-change timestamp that a future polling pass can use instead.
/// Never blocks or fails the caller's write.
pub struct ChangeNotifier {
    gateway: Arc<dyn ServerGateway>,
    store: Arc<dyn ProfileStore>,
    device_id: String,
}

impl ChangeNotifier {
    pub fn new(
        gateway: Arc<dyn ServerGateway>,
        store: Arc<dyn ProfileStore>,
        device_id: String,
    ) -> Self {
        Self {
            gateway,
            store,
            device_id,
        }
    }

    pub async fn notify(&self, email: &AccountEmail) {
        match self.gateway.notify_change(email, &self.device_id).await {
            Ok(()) => {
                debug!(account = %email, "change notification delivered");
            }
            Err(err) => {
                debug!(account = %email, error = %err, "change notification failed, recording local timestamp");
                if let Err(err) = self.store.stamp_last_change(email).await {
                    debug!(account = %email, error = %err, "could not record local change timestamp");
                }
            }
        }
    }
}
