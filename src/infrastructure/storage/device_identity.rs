use chrono::Utc;
use sqlx::Row;
use tracing::{info, warn};

use crate::domain::entities::DeviceIdentity;
use crate::infrastructure::database::DbPool;
use crate::shared::error::AppError;

const DEVICE_IDENTITY_KEY: &str = "deviceIdentity";

/// Loads the per-install identity, generating and persisting one on first
/// run. A corrupt stored identity is replaced rather than surfaced: the id
/// is attribution metadata, losing it costs nothing but a new uuid.
pub async fn ensure_device_identity(pool: &DbPool) -> Result<DeviceIdentity, AppError> {
    let row = sqlx::query("SELECT value FROM local_store WHERE store_key = ?1")
        .bind(DEVICE_IDENTITY_KEY)
        .fetch_optional(pool)
        .await?;

    if let Some(row) = row {
        let raw: String = row.get("value");
        match serde_json::from_str::<DeviceIdentity>(&raw) {
            Ok(identity) => return Ok(identity),
            Err(err) => {
                warn!(error = %err, "corrupt device identity, regenerating");
            }
        }
    }

    let identity = DeviceIdentity::generate();
    let raw = serde_json::to_string(&identity)?;

    sqlx::query(
        r#"
        INSERT INTO local_store (store_key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(store_key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(DEVICE_IDENTITY_KEY)
    .bind(&raw)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;

    info!(device_id = %identity.id, platform = %identity.platform, "device identity generated");
    Ok(identity)
}
