use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::Row;
use tracing::warn;

use crate::application::ports::ProfileStore;
use crate::domain::entities::{HomeLocation, UserProfile};
use crate::domain::value_objects::{AccountEmail, DataDomain};
use crate::infrastructure::database::DbPool;
use crate::shared::error::AppError;

pub(crate) fn profile_key(email: &AccountEmail) -> String {
    format!("userData_{email}")
}

pub(crate) fn image_key(email: &AccountEmail) -> String {
    format!("profileImage_{email}")
}

fn caregiver_sync_key(email: &AccountEmail) -> String {
    format!("lastCaregiverSync_{email}")
}

fn last_change_key(email: &AccountEmail) -> String {
    format!("lastChange_{email}")
}

/// Durable key-value store over the `local_store` table.
///
/// Every value is a JSON document keyed by domain prefix plus normalized
/// email. Writes are single upserts, durable as soon as they return.
pub struct SqliteProfileStore {
    pool: DbPool,
}

impl SqliteProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM local_store WHERE store_key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn put_raw(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO local_store (store_key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(store_key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_raw(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM local_store WHERE store_key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Corrupt records read as absent. The safe posture is a full re-fetch,
    /// never a hard failure surfaced to the caller.
    async fn get_parsed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let raw = match self.get_raw(key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(store_key = key, error = %err, "corrupt stored record, treating as absent");
                Ok(None)
            }
        }
    }

    async fn put_serialized<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)?;
        self.put_raw(key, &raw).await
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get_profile(&self, email: &AccountEmail) -> Result<Option<UserProfile>, AppError> {
        self.get_parsed(&profile_key(email)).await
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.put_serialized(&profile_key(&profile.email), profile)
            .await
    }

    async fn delete_profile(&self, email: &AccountEmail) -> Result<(), AppError> {
        self.delete_raw(&profile_key(email)).await
    }

    async fn get_records(
        &self,
        domain: DataDomain,
        email: &AccountEmail,
    ) -> Result<Vec<Value>, AppError> {
        Ok(self
            .get_parsed::<Vec<Value>>(&domain.storage_key(email))
            .await?
            .unwrap_or_default())
    }

    async fn put_records(
        &self,
        domain: DataDomain,
        email: &AccountEmail,
        records: &[Value],
    ) -> Result<(), AppError> {
        self.put_serialized(&domain.storage_key(email), &records)
            .await
    }

    async fn get_home_location(
        &self,
        email: &AccountEmail,
    ) -> Result<Option<HomeLocation>, AppError> {
        self.get_parsed(&DataDomain::HomeLocation.storage_key(email))
            .await
    }

    async fn put_home_location(
        &self,
        email: &AccountEmail,
        location: &HomeLocation,
    ) -> Result<(), AppError> {
        self.put_serialized(&DataDomain::HomeLocation.storage_key(email), location)
            .await
    }

    async fn get_profile_image(&self, email: &AccountEmail) -> Result<Option<String>, AppError> {
        self.get_raw(&image_key(email)).await
    }

    async fn put_profile_image(&self, email: &AccountEmail, image: &str) -> Result<(), AppError> {
        self.put_raw(&image_key(email), image).await
    }

    async fn last_caregiver_sync(
        &self,
        email: &AccountEmail,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        self.get_parsed(&caregiver_sync_key(email)).await
    }

    async fn stamp_caregiver_sync(&self, email: &AccountEmail) -> Result<(), AppError> {
        self.put_serialized(&caregiver_sync_key(email), &Utc::now())
            .await
    }

    async fn last_change(&self, email: &AccountEmail) -> Result<Option<DateTime<Utc>>, AppError> {
        self.get_parsed(&last_change_key(email)).await
    }

    async fn stamp_last_change(&self, email: &AccountEmail) -> Result<(), AppError> {
        self.put_serialized(&last_change_key(email), &Utc::now())
            .await
    }
}
