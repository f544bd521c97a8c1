use fieldsync_lib::infrastructure::remote::HttpRemoteApi;
use fieldsync_lib::{AppConfig, EngineOptions, SyncEngine, init_logging};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    let remote = Arc::new(HttpRemoteApi::new(
        &config.remote,
        config.sync.request_timeout(),
    )?);
    let engine = SyncEngine::initialize(config, remote, EngineOptions::default()).await?;
    engine.start().await?;

    let snapshot = engine.status().snapshot().await?;
    info!(
        target: "sync::engine",
        pending = snapshot.pending_count,
        dropped = snapshot.dropped_count,
        storage = ?snapshot.storage,
        "fieldsync running; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    engine.stop().await?;
    Ok(())
}
