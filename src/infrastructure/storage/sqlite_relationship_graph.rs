use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tracing::info;

use crate::application::ports::RelationshipGraph;
use crate::domain::value_objects::AccountEmail;
use crate::infrastructure::database::DbPool;
use crate::shared::error::AppError;

/// Relationship graph over the `caregiver_links` table.
///
/// One row per patient gives the one-caregiver-per-patient invariant for
/// free, and a single upsert updates the forward and inverse views
/// atomically. The inverse direction is an indexed query, not a second map
/// to keep consistent.
pub struct SqliteRelationshipGraph {
    pool: DbPool,
}

impl SqliteRelationshipGraph {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelationshipGraph for SqliteRelationshipGraph {
    async fn link(
        &self,
        patient: &AccountEmail,
        caregiver: &AccountEmail,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO caregiver_links (patient_email, caregiver_email, linked_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(patient_email) DO UPDATE SET
                caregiver_email = excluded.caregiver_email,
                linked_at = excluded.linked_at
            "#,
        )
        .bind(patient.as_str())
        .bind(caregiver.as_str())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        info!(patient = %patient, caregiver = %caregiver, "caregiver linked");
        Ok(())
    }

    async fn caregiver_of(
        &self,
        patient: &AccountEmail,
    ) -> Result<Option<AccountEmail>, AppError> {
        let row = sqlx::query(
            "SELECT caregiver_email FROM caregiver_links WHERE patient_email = ?1",
        )
        .bind(patient.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("caregiver_email");
                Ok(Some(AccountEmail::new(&raw).map_err(AppError::Storage)?))
            }
            None => Ok(None),
        }
    }

    async fn patients_of(
        &self,
        caregiver: &AccountEmail,
    ) -> Result<Vec<AccountEmail>, AppError> {
        let rows = sqlx::query(
            "SELECT patient_email FROM caregiver_links WHERE caregiver_email = ?1 ORDER BY patient_email",
        )
        .bind(caregiver.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut patients = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.get("patient_email");
            patients.push(AccountEmail::new(&raw).map_err(AppError::Storage)?);
        }
        Ok(patients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_graph() -> SqliteRelationshipGraph {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:?cache=shared")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteRelationshipGraph::new(pool)
    }

    fn email(raw: &str) -> AccountEmail {
        AccountEmail::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_link_is_idempotent() {
        let graph = setup_graph().await;
        let patient = email("p@x.com");
        let caregiver = email("c@x.com");

        graph.link(&patient, &caregiver).await.unwrap();
        graph.link(&patient, &caregiver).await.unwrap();

        assert_eq!(
            graph.caregiver_of(&patient).await.unwrap(),
            Some(caregiver.clone())
        );
        assert_eq!(graph.patients_of(&caregiver).await.unwrap(), vec![patient]);
    }

    #[tokio::test]
    async fn test_relink_overwrites_previous_caregiver() {
        let graph = setup_graph().await;
        let patient = email("p@x.com");
        let first = email("c1@x.com");
        let second = email("c2@x.com");

        graph.link(&patient, &first).await.unwrap();
        graph.link(&patient, &second).await.unwrap();

        assert_eq!(graph.caregiver_of(&patient).await.unwrap(), Some(second.clone()));
        assert!(graph.patients_of(&first).await.unwrap().is_empty());
        assert_eq!(graph.patients_of(&second).await.unwrap(), vec![patient]);
    }

    #[tokio::test]
    async fn test_caregiver_may_have_many_patients() {
        let graph = setup_graph().await;
        let caregiver = email("c@x.com");

        graph.link(&email("p1@x.com"), &caregiver).await.unwrap();
        graph.link(&email("p2@x.com"), &caregiver).await.unwrap();

        let patients = graph.patients_of(&caregiver).await.unwrap();
        assert_eq!(patients, vec![email("p1@x.com"), email("p2@x.com")]);
    }

    #[tokio::test]
    async fn test_unlinked_patient_has_no_caregiver() {
        let graph = setup_graph().await;
        assert!(graph
            .caregiver_of(&email("nobody@x.com"))
            .await
            .unwrap()
            .is_none());
    }
}
