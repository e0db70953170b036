use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::UserProfile;
use crate::domain::value_objects::AccountEmail;
use crate::shared::error::AppError;

/// Remote server operations, behind endpoint failover.
///
/// The server's API surface is not stable: each operation has several
/// historical path variants and several recognized response shapes, and
/// implementors try them in order until one succeeds. A returned error means
/// every variant failed. `AppError::Auth` is the one failure that short
/// circuits failover: an expired token fails the same way on every path.
#[async_trait]
pub trait ServerGateway: Send + Sync {
    /// Short connectivity probe. False means "work from cache".
    async fn probe(&self) -> bool;

    async fn fetch_profile(
        &self,
        email: &AccountEmail,
        token: Option<&str>,
    ) -> Result<Option<UserProfile>, AppError>;

    async fn push_profile(&self, profile: &UserProfile) -> Result<(), AppError>;

    async fn login(&self, email: &AccountEmail, password: &str)
        -> Result<UserProfile, AppError>;

    /// Whether the server has seen writes for this account since `since`.
    async fn check_updates_since(
        &self,
        email: &AccountEmail,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Best-effort hint that other devices should refresh.
    async fn notify_change(&self, email: &AccountEmail, device_id: &str)
        -> Result<(), AppError>;
}
