use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use tracing::info;

pub type DbPool = Pool<Sqlite>;

pub struct Database;

impl Database {
    pub async fn initialize(database_url: &str) -> Result<DbPool> {
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let file = path.split('?').next().unwrap_or(path);
            if let Some(parent) = Path::new(file).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        info!("Database connected: {}", database_url);

        Self::run_migrations(&pool).await?;

        Ok(pool)
    }

    pub async fn run_migrations(pool: &DbPool) -> Result<()> {
        info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(pool).await?;

        info!("Database migrations completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_initialize_creates_file_and_schema() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_init.db");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let pool = Database::initialize(&db_url).await.unwrap();
        assert!(db_path.exists());

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();

        assert!(names.contains(&"local_store"));
        assert!(names.contains(&"pending_sync"));
        assert!(names.contains(&"caregiver_links"));

        pool.close().await;
    }
}
