pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::services::{
    FieldActionService, StatusReporter, StatusSnapshot, StorageMode, SyncCoordinator, SyncEvent,
    WakeHandler,
};
pub use shared::{AppConfig, AppError, Result};
pub use state::{EngineOptions, SyncEngine};

/// Installs the global subscriber. `RUST_LOG` overrides the default filter; set
/// `FIELDSYNC_LOG_JSON=1` for JSON lines.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fieldsync=debug,sync=debug,info".into());
    let json = std::env::var("FIELDSYNC_LOG_JSON")
        .map(|value| matches!(value.trim(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    if result.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
