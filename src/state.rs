use std::sync::Arc;

use tracing::info;

use crate::application::services::{ChangeNotifier, PropagationService, SyncService};
use crate::domain::entities::DeviceIdentity;
use crate::infrastructure::database::{Database, DbPool};
use crate::infrastructure::server::HttpServerGateway;
use crate::infrastructure::storage::{
    ensure_device_identity, legacy_migration, SqlitePendingQueue, SqliteProfileStore,
    SqliteRelationshipGraph,
};
use crate::shared::config::AppConfig;
use crate::shared::error::{AppError, Result};

/// Fully wired engine: one database, one gateway, and the services that
/// every embedding surface (CLI, mobile shell, tests) calls into.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: Arc<DbPool>,
    pub device: DeviceIdentity,
    pub sync: Arc<SyncService>,
    pub propagation: Arc<PropagationService>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        config
            .validate()
            .map_err(AppError::ConfigurationError)?;

        std::fs::create_dir_all(&config.storage.data_dir)
            .map_err(|err| AppError::Storage(err.to_string()))?;

        let pool = Database::initialize(&config.database.url).await?;

        // One-shot: consolidates pre-canonical key layouts, then marks the
        // schema version so later startups skip it.
        legacy_migration::run(&pool).await?;

        let device = ensure_device_identity(&pool).await?;
        info!(device_id = %device.id, "engine starting");

        let store = Arc::new(SqliteProfileStore::new(pool.clone()));
        let queue = Arc::new(SqlitePendingQueue::new(
            pool.clone(),
            config.sync.pending_soft_cap,
        ));
        let graph = Arc::new(SqliteRelationshipGraph::new(pool.clone()));
        let gateway = Arc::new(HttpServerGateway::new(&config.server)?);

        let notifier = Arc::new(ChangeNotifier::new(
            gateway.clone(),
            store.clone(),
            device.id.clone(),
        ));
        let sync = Arc::new(SyncService::new(
            store.clone(),
            queue,
            gateway,
            notifier,
            config.sync.clone(),
        ));
        let propagation = Arc::new(PropagationService::new(
            store,
            graph,
            config.sync.clone(),
        ));

        Ok(Self {
            config,
            db_pool: Arc::new(pool),
            device,
            sync,
            propagation,
        })
    }
}
