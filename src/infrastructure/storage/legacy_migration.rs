use chrono::Utc;
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::domain::entities::UserProfile;
use crate::domain::resolver;
use crate::domain::value_objects::AccountEmail;
use crate::infrastructure::database::DbPool;
use crate::shared::error::AppError;

use super::sqlite_profile_store::profile_key;

const SCHEMA_VERSION_KEY: &str = "storeSchemaVersion";
const CURRENT_SCHEMA_VERSION: i64 = 2;

/// Historical storage locations for the user profile, oldest first. Earlier
/// app versions wrote to these; reads used to fan out across all of them on
/// every access.
const LEGACY_PROFILE_PREFIXES: [&str; 3] = ["user_", "profile_", "userProfile_"];

/// One-shot startup pass that consolidates legacy profile key variants into
/// the canonical `userData_<email>` location and deletes them, so steady
/// state reads touch exactly one key. Candidates are merged through the
/// best-data resolver with the canonical copy first, preserving every field
/// any variant still held.
pub async fn run(pool: &DbPool) -> Result<(), AppError> {
    if schema_version(pool).await? >= CURRENT_SCHEMA_VERSION {
        debug!("local store already at current schema version");
        return Ok(());
    }

    let mut migrated = 0u32;
    for prefix in LEGACY_PROFILE_PREFIXES {
        migrated += migrate_prefix(pool, prefix).await?;
    }

    set_schema_version(pool, CURRENT_SCHEMA_VERSION).await?;
    if migrated > 0 {
        info!(migrated, "legacy profile keys consolidated");
    }
    Ok(())
}

async fn migrate_prefix(pool: &DbPool, prefix: &str) -> Result<u32, AppError> {
    // Underscores in key prefixes are literal, not LIKE wildcards.
    let pattern = format!("{}%", prefix.replace('_', "\\_"));
    let rows = sqlx::query(
        "SELECT store_key, value FROM local_store WHERE store_key LIKE ?1 ESCAPE '\\'",
    )
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    let mut migrated = 0u32;
    for row in rows {
        let key: String = row.get("store_key");
        let raw: String = row.get("value");

        let email = match AccountEmail::new(&key[prefix.len()..]) {
            Ok(email) => email,
            Err(err) => {
                warn!(store_key = %key, error = %err, "legacy key has no usable email, deleting");
                delete_key(pool, &key).await?;
                continue;
            }
        };

        let mut candidates: Vec<UserProfile> = Vec::new();
        if let Some(canonical) = read_profile(pool, &profile_key(&email)).await? {
            candidates.push(canonical);
        }
        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(legacy) => candidates.push(legacy),
            Err(err) => {
                warn!(store_key = %key, error = %err, "corrupt legacy record, deleting");
                delete_key(pool, &key).await?;
                continue;
            }
        }

        let merged = resolver::resolve(&candidates, &email);
        write_profile(pool, &profile_key(&email), &merged).await?;
        delete_key(pool, &key).await?;
        migrated += 1;
    }

    Ok(migrated)
}

async fn schema_version(pool: &DbPool) -> Result<i64, AppError> {
    let row = sqlx::query("SELECT value FROM local_store WHERE store_key = ?1")
        .bind(SCHEMA_VERSION_KEY)
        .fetch_optional(pool)
        .await?;

    Ok(row
        .map(|r| r.get::<String, _>("value"))
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(1))
}

async fn set_schema_version(pool: &DbPool, version: i64) -> Result<(), AppError> {
    upsert(pool, SCHEMA_VERSION_KEY, &version.to_string()).await
}

async fn read_profile(pool: &DbPool, key: &str) -> Result<Option<UserProfile>, AppError> {
    let row = sqlx::query("SELECT value FROM local_store WHERE store_key = ?1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row
        .map(|r| r.get::<String, _>("value"))
        .and_then(|raw| serde_json::from_str(&raw).ok()))
}

async fn write_profile(pool: &DbPool, key: &str, profile: &UserProfile) -> Result<(), AppError> {
    let raw = serde_json::to_string(profile)?;
    upsert(pool, key, &raw).await
}

async fn upsert(pool: &DbPool, key: &str, value: &str) -> Result<(), AppError> {
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
    .execute(pool)
    .await?;
    Ok(())
}

async fn delete_key(pool: &DbPool, key: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM local_store WHERE store_key = ?1")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}
