use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::warn;

use crate::application::ports::PendingQueue;
use crate::domain::entities::PendingSyncEntry;
use crate::domain::value_objects::AccountEmail;
use crate::infrastructure::database::DbPool;
use crate::shared::error::AppError;

/// Pending-write queue over the `pending_sync` table.
///
/// Keyed by account email: enqueueing replaces in place, so the queue holds
/// the latest unacknowledged write per account, by arrival order.
pub struct SqlitePendingQueue {
    pool: DbPool,
    soft_cap: u64,
}

impl SqlitePendingQueue {
    pub fn new(pool: DbPool, soft_cap: u64) -> Self {
        Self { pool, soft_cap }
    }
}

#[async_trait]
impl PendingQueue for SqlitePendingQueue {
    async fn enqueue(&self, entry: PendingSyncEntry) -> Result<(), AppError> {
        let payload = serde_json::to_string(&entry.payload)?;

        sqlx::query(
            r#"
            INSERT INTO pending_sync (email, data_type, payload, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(email) DO UPDATE SET
                data_type = excluded.data_type,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(entry.email.as_str())
        .bind(&entry.data_type)
        .bind(&payload)
        .bind(entry.updated_at.timestamp())
        .execute(&self.pool)
        .await?;

        let size = self.len().await?;
        if size > self.soft_cap {
            warn!(
                size,
                soft_cap = self.soft_cap,
                "pending queue exceeds soft cap; server has been unreachable for a long time"
            );
        }

        Ok(())
    }

    async fn list(&self) -> Result<Vec<PendingSyncEntry>, AppError> {
        let rows = sqlx::query(
            "SELECT email, data_type, payload, updated_at FROM pending_sync ORDER BY updated_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let email_raw: String = row.get("email");
            let email = match AccountEmail::new(&email_raw) {
                Ok(email) => email,
                Err(err) => {
                    warn!(email = %email_raw, error = %err, "skipping pending entry with invalid email");
                    continue;
                }
            };
            let payload_raw: String = row.get("payload");
            let payload = match serde_json::from_str(&payload_raw) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(email = %email_raw, error = %err, "skipping pending entry with corrupt payload");
                    continue;
                }
            };
            let updated_at: i64 = row.get("updated_at");

            entries.push(PendingSyncEntry {
                email,
                data_type: row.get("data_type"),
                payload,
                updated_at: DateTime::<Utc>::from_timestamp(updated_at, 0)
                    .unwrap_or_else(Utc::now),
            });
        }

        Ok(entries)
    }

    async fn remove(&self, email: &AccountEmail) -> Result<(), AppError> {
        sqlx::query("DELETE FROM pending_sync WHERE email = ?1")
            .bind(email.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn len(&self) -> Result<u64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM pending_sync")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_queue() -> SqlitePendingQueue {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:?cache=shared")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqlitePendingQueue::new(pool, 500)
    }

    fn entry(raw_email: &str, marker: &str) -> PendingSyncEntry {
        PendingSyncEntry::profile(
            AccountEmail::new(raw_email).unwrap(),
            json!({"marker": marker}),
        )
    }

    #[tokio::test]
    async fn test_enqueue_replaces_entry_for_same_email() {
        let queue = setup_queue().await;

        queue.enqueue(entry("a@x.com", "first")).await.unwrap();
        queue.enqueue(entry("a@x.com", "second")).await.unwrap();

        assert_eq!(queue.len().await.unwrap(), 1);
        let entries = queue.list().await.unwrap();
        assert_eq!(entries[0].payload["marker"], "second");
    }

    #[tokio::test]
    async fn test_distinct_emails_keep_distinct_entries() {
        let queue = setup_queue().await;

        queue.enqueue(entry("a@x.com", "a")).await.unwrap();
        queue.enqueue(entry("b@x.com", "b")).await.unwrap();

        assert_eq!(queue.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_remove_only_deletes_requested_email() {
        let queue = setup_queue().await;

        queue.enqueue(entry("a@x.com", "a")).await.unwrap();
        queue.enqueue(entry("b@x.com", "b")).await.unwrap();
        queue
            .remove(&AccountEmail::new("a@x.com").unwrap())
            .await
            .unwrap();

        let entries = queue.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].email.as_str(), "b@x.com");
    }
}
