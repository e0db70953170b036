pub mod device_identity;
pub mod legacy_migration;
pub mod sqlite_pending_queue;
pub mod sqlite_profile_store;
pub mod sqlite_relationship_graph;

pub use device_identity::ensure_device_identity;
pub use sqlite_pending_queue::SqlitePendingQueue;
pub use sqlite_profile_store::SqliteProfileStore;
pub use sqlite_relationship_graph::SqliteRelationshipGraph;
