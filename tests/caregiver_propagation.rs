use std::sync::Arc;

use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

use memora::application::ports::{ProfileStore, RelationshipGraph};
use memora::application::services::PropagationService;
use memora::domain::value_objects::{AccountEmail, DataDomain};
use memora::infrastructure::database::DbPool;
use memora::infrastructure::storage::{SqliteProfileStore, SqliteRelationshipGraph};
use memora::shared::config::AppConfig;

async fn setup_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:?cache=shared")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

fn email(raw: &str) -> AccountEmail {
    AccountEmail::new(raw).unwrap()
}

// End to end over real SQLite: a caregiver authors reminders for two
// different patients, and only the linked patient's own records land in
// that patient's namespace after propagation.
#[tokio::test]
async fn caregiver_records_reach_only_the_owning_patient() {
    let pool = setup_pool().await;
    let store = Arc::new(SqliteProfileStore::new(pool.clone()));
    let graph = Arc::new(SqliteRelationshipGraph::new(pool.clone()));
    let service = PropagationService::new(
        store.clone(),
        graph.clone(),
        AppConfig::default().sync,
    );

    let patient = email("p@x.com");
    let caregiver = email("c@x.com");
    graph.link(&patient, &caregiver).await.unwrap();

    // Owner emails arrive in whatever shape the authoring device produced.
    let reminders = vec![
        json!({"id": "r1", "title": "morning meds", "forPatient": " P@X.COM "}),
        json!({"id": "r2", "title": "someone else", "forPatient": "other@x.com"}),
    ];
    store
        .put_records(DataDomain::Reminders, &caregiver, &reminders)
        .await
        .unwrap();

    let synced = service
        .sync_from_caregiver(&patient, &caregiver)
        .await
        .unwrap();
    assert!(synced);

    let mine = store
        .get_records(DataDomain::Reminders, &patient)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["id"], "r1");

    // The sync stamp makes the patient fresh for the staleness window.
    let check = service.needs_sync(&patient).await.unwrap();
    assert!(!check.needs_sync);
}

#[tokio::test]
async fn unlinked_caregiver_cannot_write_into_a_patient_namespace() {
    let pool = setup_pool().await;
    let store = Arc::new(SqliteProfileStore::new(pool.clone()));
    let graph = Arc::new(SqliteRelationshipGraph::new(pool.clone()));
    let service = PropagationService::new(
        store.clone(),
        graph.clone(),
        AppConfig::default().sync,
    );

    let patient = email("p@x.com");
    graph.link(&patient, &email("real@x.com")).await.unwrap();

    let intruder = email("intruder@x.com");
    store
        .put_records(
            DataDomain::Reminders,
            &intruder,
            &[json!({"id": "r1", "forPatient": "p@x.com"})],
        )
        .await
        .unwrap();

    let synced = service.sync_from_caregiver(&patient, &intruder).await.unwrap();
    assert!(!synced);
    assert!(store
        .get_records(DataDomain::Reminders, &patient)
        .await
        .unwrap()
        .is_empty());
}
