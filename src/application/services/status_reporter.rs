use super::sync_coordinator::SyncCoordinator;
use crate::application::ports::offline_store::{OfflinePersistence, SyncLedger, SyncQueue};
use crate::application::ports::platform::OnlineState;
use crate::domain::entities::DroppedTask;
use crate::infrastructure::offline::SyncMetricsSnapshot;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "reason")]
pub enum StorageMode {
    Durable,
    /// Durable storage could not be opened; data lives only as long as the process.
    Degraded(String),
}

impl StorageMode {
    pub fn is_degraded(&self) -> bool {
        matches!(self, StorageMode::Degraded(_))
    }
}

/// Point-in-time view for the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_online: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub pending_count: usize,
    pub dropped_count: usize,
    pub is_syncing: bool,
    pub auth_required: bool,
    pub storage: StorageMode,
    pub metrics: SyncMetricsSnapshot,
}

pub struct StatusReporter {
    store: Arc<dyn OfflinePersistence>,
    online: Arc<dyn OnlineState>,
    coordinator: Arc<SyncCoordinator>,
    storage: StorageMode,
}

impl StatusReporter {
    pub fn new(
        store: Arc<dyn OfflinePersistence>,
        online: Arc<dyn OnlineState>,
        coordinator: Arc<SyncCoordinator>,
        storage: StorageMode,
    ) -> Self {
        Self {
            store,
            online,
            coordinator,
            storage,
        }
    }

    pub async fn snapshot(&self) -> Result<StatusSnapshot, AppError> {
        Ok(StatusSnapshot {
            is_online: self.online.is_online(),
            last_sync_time: self.store.last_sync_time().await?,
            pending_count: self.store.pending_count().await?,
            dropped_count: self.store.dropped_count().await?,
            is_syncing: self.coordinator.is_draining(),
            auth_required: self.coordinator.auth_required(),
            storage: self.storage.clone(),
            metrics: self.coordinator.metrics(),
        })
    }

    pub async fn dropped_tasks(&self) -> Result<Vec<DroppedTask>, AppError> {
        self.store.dropped_tasks().await
    }

    /// Clears the dropped log once the user has seen it.
    pub async fn acknowledge_dropped(&self) -> Result<usize, AppError> {
        let cleared = self.store.clear_dropped().await?;
        info!(target: "sync::engine", cleared, "dropped tasks acknowledged");
        Ok(cleared)
    }
}
