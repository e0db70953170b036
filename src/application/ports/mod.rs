pub mod pending_queue;
pub mod profile_store;
pub mod relationship_graph;
pub mod server_gateway;

pub use pending_queue::PendingQueue;
pub use profile_store::ProfileStore;
pub use relationship_graph::RelationshipGraph;
pub use server_gateway::ServerGateway;
