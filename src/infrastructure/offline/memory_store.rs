use crate::application::ports::offline_store::{
    LocalStore, OfflinePersistence, SyncLedger, SyncQueue,
};
use crate::domain::entities::{DroppedTask, NewSyncTask, Record, RecordFilter, SyncTask};
use crate::domain::value_objects::{Collection, RecordId, SyncTaskId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    records: HashMap<Collection, HashMap<RecordId, Record>>,
    queue: BTreeMap<i64, SyncTask>,
    next_task_id: i64,
    dropped: Vec<DroppedTask>,
    last_sync_time: Option<DateTime<Utc>>,
}

impl MemoryState {
    fn has_pending_task(&self, collection: Collection, id: &RecordId) -> bool {
        self.queue.values().any(|task| {
            task.record
                .as_ref()
                .is_some_and(|record| record.collection == collection && &record.id == id)
        })
    }

    fn upsert(&mut self, mut record: Record) -> RecordId {
        if record.synced && self.has_pending_task(record.collection, &record.id) {
            record.synced = false;
        }
        let collection = self.records.entry(record.collection).or_default();
        if let Some(existing) = collection.get(&record.id) {
            record.created_offline = existing.created_offline;
        }
        let id = record.id.clone();
        collection.insert(id.clone(), record);
        id
    }

    fn push_task(&mut self, task: NewSyncTask, enqueued_at: DateTime<Utc>) -> Result<SyncTaskId, AppError> {
        self.next_task_id += 1;
        let id = SyncTaskId::new(self.next_task_id).map_err(AppError::Internal)?;
        self.queue.insert(
            id.value(),
            SyncTask {
                id,
                action_kind: task.action_kind,
                payload: task.payload,
                record: task.record,
                enqueued_at,
                attempts: 0,
                max_attempts: task.max_attempts,
                next_attempt_at: None,
                last_error: None,
            },
        );
        Ok(id)
    }
}

/// Process-local fallback used when durable storage cannot be opened. Same contract as the
/// SQLite store, but nothing survives a restart.
#[derive(Default)]
pub struct MemoryOfflinePersistence {
    state: RwLock<MemoryState>,
}

impl MemoryOfflinePersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryOfflinePersistence {
    async fn put(&self, collection: Collection, mut record: Record) -> Result<RecordId, AppError> {
        record.collection = collection;
        Ok(self.state.write().await.upsert(record))
    }

    async fn get(&self, collection: Collection, id: &RecordId) -> Result<Option<Record>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .get(&collection)
            .and_then(|records| records.get(id))
            .cloned())
    }

    async fn get_all(
        &self,
        collection: Collection,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Record>, AppError> {
        let state = self.state.read().await;
        let mut records: Vec<Record> = state
            .records
            .get(&collection)
            .map(|records| {
                records
                    .values()
                    .filter(|record| filter.is_none_or(|f| f.matches(record)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(records)
    }

    async fn clear(&self, collection: Collection) -> Result<(), AppError> {
        self.state.write().await.records.remove(&collection);
        Ok(())
    }
}

#[async_trait]
impl SyncQueue for MemoryOfflinePersistence {
    async fn enqueue(&self, task: NewSyncTask) -> Result<SyncTaskId, AppError> {
        self.state.write().await.push_task(task, Utc::now())
    }

    async fn peek_all(&self) -> Result<Vec<SyncTask>, AppError> {
        Ok(self.state.read().await.queue.values().cloned().collect())
    }

    async fn remove(&self, id: SyncTaskId) -> Result<(), AppError> {
        self.state.write().await.queue.remove(&id.value());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<SyncTask>, AppError> {
        self.peek_all().await
    }

    async fn pending_count(&self) -> Result<usize, AppError> {
        Ok(self.state.read().await.queue.len())
    }

    async fn record_failure(
        &self,
        id: SyncTaskId,
        attempts: u32,
        next_attempt_at: Option<DateTime<Utc>>,
        error: &str,
    ) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let task = state
            .queue
            .get_mut(&id.value())
            .ok_or_else(|| AppError::NotFound(format!("Sync task {id} not found")))?;
        task.attempts = attempts;
        task.next_attempt_at = next_attempt_at;
        task.last_error = Some(error.to_string());
        Ok(())
    }
}

#[async_trait]
impl SyncLedger for MemoryOfflinePersistence {
    async fn last_sync_time(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self.state.read().await.last_sync_time)
    }

    async fn set_last_sync_time(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.state.write().await.last_sync_time = Some(at);
        Ok(())
    }

    async fn dropped_tasks(&self) -> Result<Vec<DroppedTask>, AppError> {
        Ok(self.state.read().await.dropped.clone())
    }

    async fn dropped_count(&self) -> Result<usize, AppError> {
        Ok(self.state.read().await.dropped.len())
    }

    async fn clear_dropped(&self) -> Result<usize, AppError> {
        let mut state = self.state.write().await;
        let removed = state.dropped.len();
        state.dropped.clear();
        Ok(removed)
    }
}

#[async_trait]
impl OfflinePersistence for MemoryOfflinePersistence {
    async fn put_and_enqueue(
        &self,
        record: Record,
        task: NewSyncTask,
    ) -> Result<(RecordId, SyncTaskId), AppError> {
        let task = task.for_record(record.reference());
        let mut state = self.state.write().await;
        let task_id = state.push_task(task, record.timestamp)?;
        let record_id = state.upsert(record);
        Ok((record_id, task_id))
    }

    async fn complete_task(&self, task: &SyncTask) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        state.queue.remove(&task.id.value());
        let Some(reference) = &task.record else {
            return Ok(false);
        };
        if state.has_pending_task(reference.collection, &reference.id) {
            return Ok(false);
        }
        let record = state
            .records
            .get_mut(&reference.collection)
            .and_then(|records| records.get_mut(&reference.id));
        match record {
            Some(record) => {
                record.synced = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn drop_task(&self, dropped: &DroppedTask) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state.queue.remove(&dropped.task_id.value());
        state.dropped.retain(|existing| existing.task_id != dropped.task_id);
        state.dropped.push(dropped.clone());
        Ok(())
    }

    async fn reset(&self) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state.records.clear();
        state.queue.clear();
        state.dropped.clear();
        state.last_sync_time = None;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}
