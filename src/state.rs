use crate::application::ports::offline_store::{OfflinePersistence, SyncQueue};
use crate::application::ports::platform::{Clock, ConnectivityProbe, DrainRequester, WakeTrigger};
use crate::application::ports::remote_api::RemoteApi;
use crate::application::services::{
    ConnectivityMonitor, DrainRequests, DrainScheduler, FieldActionService, RetryPolicy,
    StatusReporter, StorageMode, SyncCoordinator, SyncEvent, WakeHandler,
};
use crate::domain::entities::{DrainReport, DrainTrigger};
use crate::infrastructure::SystemClock;
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::{MemoryOfflinePersistence, SqliteOfflinePersistence};
use crate::shared::config::{AppConfig, DatabaseConfig};
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Host-provided collaborators that have sensible defaults.
pub struct EngineOptions {
    pub initially_online: bool,
    pub clock: Arc<dyn Clock>,
    pub probe: Option<Arc<dyn ConnectivityProbe>>,
    pub wake_trigger: Option<Arc<dyn WakeTrigger>>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            initially_online: true,
            clock: Arc::new(SystemClock),
            probe: None,
            wake_trigger: None,
        }
    }
}

struct EngineRuntime {
    cancel: CancellationToken,
    drain_loop: JoinHandle<DrainRequests>,
}

/// Owns the sync components and their lifecycle.
pub struct SyncEngine {
    config: AppConfig,
    store: Arc<dyn OfflinePersistence>,
    storage_mode: StorageMode,
    scheduler: Arc<DrainScheduler>,
    monitor: Arc<ConnectivityMonitor>,
    coordinator: Arc<SyncCoordinator>,
    actions: Arc<FieldActionService>,
    status: Arc<StatusReporter>,
    wake_handler: Arc<WakeHandler>,
    wake_trigger: Option<Arc<dyn WakeTrigger>>,
    requests: Mutex<Option<DrainRequests>>,
    runtime: Mutex<Option<EngineRuntime>>,
}

impl SyncEngine {
    /// Opens the configured database, falling back to memory when it is unusable.
    pub async fn initialize(
        config: AppConfig,
        remote: Arc<dyn RemoteApi>,
        options: EngineOptions,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::Configuration)?;
        let (store, storage_mode) = open_store(&config.database).await;
        Ok(Self::assemble(config, store, storage_mode, remote, options))
    }

    pub fn assemble(
        config: AppConfig,
        store: Arc<dyn OfflinePersistence>,
        storage_mode: StorageMode,
        remote: Arc<dyn RemoteApi>,
        options: EngineOptions,
    ) -> Self {
        let (scheduler, requests) = DrainScheduler::channel();
        let scheduler = Arc::new(scheduler);

        let mut monitor = ConnectivityMonitor::new(
            options.initially_online,
            scheduler.clone(),
            config.sync.poll_interval(),
        );
        if let Some(probe) = options.probe {
            monitor = monitor.with_probe(probe);
        }
        let monitor = Arc::new(monitor);

        let coordinator = Arc::new(
            SyncCoordinator::new(store.clone(), remote, monitor.clone(), options.clock.clone())
                .with_retry_policy(RetryPolicy::from_config(&config.sync))
                .with_request_timeout(config.sync.request_timeout()),
        );
        let actions = Arc::new(
            FieldActionService::new(store.clone(), monitor.clone(), options.clock)
                .with_requester(scheduler.clone())
                .with_max_attempts(config.sync.max_attempts),
        );
        let status = Arc::new(StatusReporter::new(
            store.clone(),
            monitor.clone(),
            coordinator.clone(),
            storage_mode.clone(),
        ));
        let wake_handler = Arc::new(WakeHandler::new(coordinator.clone()));

        Self {
            config,
            store,
            storage_mode,
            scheduler,
            monitor,
            coordinator,
            actions,
            status,
            wake_handler,
            wake_trigger: options.wake_trigger,
            requests: Mutex::new(Some(requests)),
            runtime: Mutex::new(None),
        }
    }

    /// Restores the queue, starts the drain loop and connectivity timer, registers the
    /// background wake and requests a startup drain.
    pub async fn start(&self) -> Result<(), AppError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.is_some() {
            return Ok(());
        }

        let restored = self.store.load().await?;
        info!(
            target: "sync::engine",
            pending = restored.len(),
            storage = ?self.storage_mode,
            auto_sync = self.config.sync.auto_sync,
            "sync engine starting"
        );

        if self.config.sync.auto_sync {
            let Some(requests) = self.requests.lock().await.take() else {
                return Err(AppError::Internal("drain requests already consumed".into()));
            };
            let cancel = CancellationToken::new();
            let drain_loop = requests.spawn(self.coordinator.clone(), cancel.clone());
            *runtime = Some(EngineRuntime { cancel, drain_loop });
            self.monitor.start();
        }

        if let Some(trigger) = &self.wake_trigger
            && let Err(err) = trigger.register(self.wake_handler.clone()).await
        {
            warn!(target: "sync::wake", error = %err, "background wake registration failed");
        }

        self.scheduler.request_drain(DrainTrigger::Startup);
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), AppError> {
        self.monitor.stop().await;

        if let Some(runtime) = self.runtime.lock().await.take() {
            runtime.cancel.cancel();
            match runtime.drain_loop.await {
                Ok(requests) => *self.requests.lock().await = Some(requests),
                Err(err) => {
                    return Err(AppError::Internal(format!("drain loop panicked: {err}")));
                }
            }
        }

        if let Some(trigger) = &self.wake_trigger
            && let Err(err) = trigger.unregister().await
        {
            warn!(target: "sync::wake", error = %err, "background wake unregistration failed");
        }
        info!(target: "sync::engine", "sync engine stopped");
        Ok(())
    }

    /// Platform connectivity signal.
    pub fn set_online(&self, online: bool) {
        self.monitor.set_online(online);
    }

    /// Drains now and waits for the result.
    pub async fn sync_now(&self) -> Result<DrainReport, AppError> {
        self.coordinator.drain(DrainTrigger::Manual).await
    }

    pub async fn reauthenticated(&self, bearer_token: String) -> Result<(), AppError> {
        self.coordinator.reauthenticated(bearer_token).await;
        self.scheduler.request_drain(DrainTrigger::Reauthenticated);
        Ok(())
    }

    /// Wipes every collection, the queue, the dropped log and the last sync time.
    pub async fn reset_local_data(&self) -> Result<(), AppError> {
        let pending = self.store.pending_count().await?;
        self.store.reset().await?;
        warn!(target: "sync::engine", discarded_tasks = pending, "local data reset");
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.coordinator.subscribe()
    }

    pub fn actions(&self) -> Arc<FieldActionService> {
        self.actions.clone()
    }

    pub fn status(&self) -> Arc<StatusReporter> {
        self.status.clone()
    }

    pub fn coordinator(&self) -> Arc<SyncCoordinator> {
        self.coordinator.clone()
    }

    pub fn monitor(&self) -> Arc<ConnectivityMonitor> {
        self.monitor.clone()
    }

    pub fn store(&self) -> Arc<dyn OfflinePersistence> {
        self.store.clone()
    }

    pub fn wake_handler(&self) -> Arc<WakeHandler> {
        self.wake_handler.clone()
    }

    pub fn storage_mode(&self) -> &StorageMode {
        &self.storage_mode
    }
}

/// SQLite when possible, otherwise a process-local store flagged as degraded.
pub async fn open_store(config: &DatabaseConfig) -> (Arc<dyn OfflinePersistence>, StorageMode) {
    match open_sqlite(config).await {
        Ok(store) => (Arc::new(store), StorageMode::Durable),
        Err(err) => {
            warn!(
                target: "sync::store",
                error = %err,
                "durable storage unavailable; using in-memory store"
            );
            (
                Arc::new(MemoryOfflinePersistence::new()),
                StorageMode::Degraded(err.to_string()),
            )
        }
    }
}

async fn open_sqlite(config: &DatabaseConfig) -> Result<SqliteOfflinePersistence, AppError> {
    let pool = ConnectionPool::new(&config.url, config.max_connections).await?;
    pool.migrate()
        .await
        .map_err(|err| AppError::StorageUnavailable(err.to_string()))?;
    Ok(SqliteOfflinePersistence::new(pool))
}
