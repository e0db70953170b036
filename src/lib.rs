pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use domain::value_objects::{AccountEmail, DataDomain, SyncOutcome, SyncSource};
pub use shared::config::AppConfig;
pub use shared::error::{AppError, Result};
pub use state::AppState;

/// Install the global tracing subscriber. Call once at process start;
/// embedding shells that bring their own subscriber skip this.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memora=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
