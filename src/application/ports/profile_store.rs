use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::entities::{HomeLocation, UserProfile};
use crate::domain::value_objects::{AccountEmail, DataDomain};
use crate::shared::error::AppError;

/// Durable per-account cache of profile and caregiver-authored data.
///
/// Writes are immediately durable. A read of a corrupt record is reported as
/// absent, never as an error: the safe posture is a full re-fetch. Implementors
/// must tolerate concurrent re-read-then-write access from the sync
/// coordinator, the propagation engine, and direct edits.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, email: &AccountEmail) -> Result<Option<UserProfile>, AppError>;
    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError>;
    async fn delete_profile(&self, email: &AccountEmail) -> Result<(), AppError>;

    /// Full record collection for one domain, stored as a JSON array.
    async fn get_records(
        &self,
        domain: DataDomain,
        email: &AccountEmail,
    ) -> Result<Vec<Value>, AppError>;
    async fn put_records(
        &self,
        domain: DataDomain,
        email: &AccountEmail,
        records: &[Value],
    ) -> Result<(), AppError>;

    async fn get_home_location(
        &self,
        email: &AccountEmail,
    ) -> Result<Option<HomeLocation>, AppError>;
    async fn put_home_location(
        &self,
        email: &AccountEmail,
        location: &HomeLocation,
    ) -> Result<(), AppError>;

    /// Redundant image side channel (`profileImage_<email>`): image payloads
    /// are large and historically prone to being dropped during merges.
    async fn get_profile_image(&self, email: &AccountEmail) -> Result<Option<String>, AppError>;
    async fn put_profile_image(
        &self,
        email: &AccountEmail,
        image: &str,
    ) -> Result<(), AppError>;

    async fn last_caregiver_sync(
        &self,
        email: &AccountEmail,
    ) -> Result<Option<DateTime<Utc>>, AppError>;
    async fn stamp_caregiver_sync(&self, email: &AccountEmail) -> Result<(), AppError>;

    /// Fallback signal written when change notification cannot reach the
    /// server; a future polling pass picks it up.
    async fn last_change(&self, email: &AccountEmail) -> Result<Option<DateTime<Utc>>, AppError>;
    async fn stamp_last_change(&self, email: &AccountEmail) -> Result<(), AppError>;
}
