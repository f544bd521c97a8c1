use crate::domain::entities::{DroppedTask, NewSyncTask, Record, RecordFilter, SyncTask};
use crate::domain::value_objects::{Collection, RecordId, SyncTaskId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Keyed record storage per collection.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Idempotent upsert by `(collection, record.id)`. A record that still has a queued
    /// task is never stored as synced, whatever the caller passes.
    async fn put(&self, collection: Collection, record: Record) -> Result<RecordId, AppError>;
    async fn get(&self, collection: Collection, id: &RecordId) -> Result<Option<Record>, AppError>;
    async fn get_all(
        &self,
        collection: Collection,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Record>, AppError>;
    async fn clear(&self, collection: Collection) -> Result<(), AppError>;
}

/// Durable FIFO of pending mutations.
#[async_trait]
pub trait SyncQueue: Send + Sync {
    async fn enqueue(&self, task: NewSyncTask) -> Result<SyncTaskId, AppError>;
    /// Tasks in enqueue order.
    async fn peek_all(&self) -> Result<Vec<SyncTask>, AppError>;
    async fn remove(&self, id: SyncTaskId) -> Result<(), AppError>;
    /// Restores queue state at startup.
    async fn load(&self) -> Result<Vec<SyncTask>, AppError>;
    async fn pending_count(&self) -> Result<usize, AppError>;
    async fn record_failure(
        &self,
        id: SyncTaskId,
        attempts: u32,
        next_attempt_at: Option<DateTime<Utc>>,
        error: &str,
    ) -> Result<(), AppError>;
}

/// Sync bookkeeping that outlives individual tasks.
#[async_trait]
pub trait SyncLedger: Send + Sync {
    async fn last_sync_time(&self) -> Result<Option<DateTime<Utc>>, AppError>;
    async fn set_last_sync_time(&self, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn dropped_tasks(&self) -> Result<Vec<DroppedTask>, AppError>;
    async fn dropped_count(&self) -> Result<usize, AppError>;
    async fn clear_dropped(&self) -> Result<usize, AppError>;
}

/// The full offline persistence surface, including the operations that must span
/// records and queue atomically.
#[async_trait]
pub trait OfflinePersistence: LocalStore + SyncQueue + SyncLedger {
    /// Writes the record and appends its task in one unit. The task is linked to the record.
    async fn put_and_enqueue(
        &self,
        record: Record,
        task: NewSyncTask,
    ) -> Result<(RecordId, SyncTaskId), AppError>;

    /// Removes a successfully applied task and flips its record to synced when no other
    /// queued task still references it. Returns whether the record was flipped.
    async fn complete_task(&self, task: &SyncTask) -> Result<bool, AppError>;

    /// Removes the task from the queue and appends it to the dropped log.
    async fn drop_task(&self, dropped: &DroppedTask) -> Result<(), AppError>;

    /// Explicit data reset: every collection, the queue, the dropped log and the last sync time.
    async fn reset(&self) -> Result<(), AppError>;

    /// False for the in-memory fallback.
    fn is_durable(&self) -> bool;
}
