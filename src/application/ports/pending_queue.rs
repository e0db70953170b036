use async_trait::async_trait;

use crate::domain::entities::PendingSyncEntry;
use crate::domain::value_objects::AccountEmail;
use crate::shared::error::AppError;

/// Durable queue of writes that could not reach the server.
///
/// The system's only durability mechanism for offline writes. One entry per
/// account email: enqueueing replaces any existing entry for that email.
/// Entries are removed only after a confirmed server acknowledgment.
#[async_trait]
pub trait PendingQueue: Send + Sync {
    async fn enqueue(&self, entry: PendingSyncEntry) -> Result<(), AppError>;
    async fn list(&self) -> Result<Vec<PendingSyncEntry>, AppError>;
    async fn remove(&self, email: &AccountEmail) -> Result<(), AppError>;
    async fn len(&self) -> Result<u64, AppError>;
}
