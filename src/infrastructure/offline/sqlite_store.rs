use super::mappers::{dropped_task_from_row, record_from_row, sync_task_from_row, timestamp_from_millis};
use super::queries::*;
use super::rows::{DroppedTaskRow, RecordRow, SyncTaskRow};
use crate::application::ports::offline_store::{
    LocalStore, OfflinePersistence, SyncLedger, SyncQueue,
};
use crate::domain::entities::{DroppedTask, NewSyncTask, Record, RecordFilter, SyncTask};
use crate::domain::value_objects::{Collection, RecordId, SyncTaskId};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

/// Durable offline persistence on SQLite. Composite operations run in one transaction.
pub struct SqliteOfflinePersistence {
    pool: ConnectionPool,
}

impl SqliteOfflinePersistence {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    async fn upsert_record(conn: &mut SqliteConnection, record: &Record) -> Result<(), AppError> {
        let payload = serde_json::to_string(record.payload.as_json())?;
        sqlx::query(UPSERT_RECORD)
            .bind(record.collection.as_str())
            .bind(record.id.as_str())
            .bind(payload)
            .bind(record.payload.job_id())
            .bind(record.payload.technician_id())
            .bind(record.payload.status())
            .bind(record.synced)
            .bind(record.created_offline)
            .bind(record.timestamp.timestamp_millis())
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn insert_task(
        conn: &mut SqliteConnection,
        task: &NewSyncTask,
        enqueued_at: DateTime<Utc>,
    ) -> Result<SyncTaskId, AppError> {
        let payload = serde_json::to_string(task.payload.as_json())?;
        let (record_collection, record_id) = match &task.record {
            Some(record) => (
                Some(record.collection.as_str()),
                Some(record.id.as_str().to_string()),
            ),
            None => (None, None),
        };
        let result = sqlx::query(INSERT_SYNC_TASK)
            .bind(task.action_kind.as_str())
            .bind(payload)
            .bind(record_collection)
            .bind(record_id)
            .bind(enqueued_at.timestamp_millis())
            .bind(i64::from(task.max_attempts))
            .execute(conn)
            .await?;
        SyncTaskId::new(result.last_insert_rowid()).map_err(AppError::Database)
    }
}

#[async_trait]
impl LocalStore for SqliteOfflinePersistence {
    async fn put(&self, collection: Collection, mut record: Record) -> Result<RecordId, AppError> {
        record.collection = collection;
        let mut conn = self.pool.get_pool().acquire().await?;
        Self::upsert_record(&mut conn, &record).await?;
        Ok(record.id)
    }

    async fn get(&self, collection: Collection, id: &RecordId) -> Result<Option<Record>, AppError> {
        let row = sqlx::query_as::<_, RecordRow>(SELECT_RECORD)
            .bind(collection.as_str())
            .bind(id.as_str())
            .fetch_optional(self.pool.get_pool())
            .await?;
        row.map(record_from_row).transpose()
    }

    async fn get_all(
        &self,
        collection: Collection,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Record>, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_RECORDS_BY_COLLECTION);
        builder.push_bind(collection.as_str());
        if let Some(filter) = filter {
            if let Some(job_id) = &filter.job_id {
                builder.push(" AND job_id = ").push_bind(job_id.clone());
            }
            if let Some(technician_id) = &filter.technician_id {
                builder
                    .push(" AND technician_id = ")
                    .push_bind(technician_id.clone());
            }
            if let Some(status) = &filter.status {
                builder.push(" AND status = ").push_bind(status.clone());
            }
            if let Some(synced) = filter.synced {
                builder.push(" AND synced = ").push_bind(synced);
            }
        }
        builder.push(" ORDER BY updated_at ASC, id ASC");

        let rows = builder
            .build_query_as::<RecordRow>()
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(record_from_row).collect()
    }

    async fn clear(&self, collection: Collection) -> Result<(), AppError> {
        let result = sqlx::query(DELETE_RECORDS_BY_COLLECTION)
            .bind(collection.as_str())
            .execute(self.pool.get_pool())
            .await?;
        debug!(
            target: "sync::store",
            collection = %collection,
            removed = result.rows_affected(),
            "cleared collection"
        );
        Ok(())
    }
}

#[async_trait]
impl SyncQueue for SqliteOfflinePersistence {
    async fn enqueue(&self, task: NewSyncTask) -> Result<SyncTaskId, AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        Self::insert_task(&mut conn, &task, Utc::now()).await
    }

    async fn peek_all(&self) -> Result<Vec<SyncTask>, AppError> {
        let rows = sqlx::query_as::<_, SyncTaskRow>(SELECT_SYNC_TASKS)
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(sync_task_from_row).collect()
    }

    async fn remove(&self, id: SyncTaskId) -> Result<(), AppError> {
        sqlx::query(DELETE_SYNC_TASK)
            .bind(id.value())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<SyncTask>, AppError> {
        let tasks = self.peek_all().await?;
        debug!(target: "sync::store", pending = tasks.len(), "restored sync queue");
        Ok(tasks)
    }

    async fn pending_count(&self) -> Result<usize, AppError> {
        let count: i64 = sqlx::query_scalar(COUNT_SYNC_TASKS)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn record_failure(
        &self,
        id: SyncTaskId,
        attempts: u32,
        next_attempt_at: Option<DateTime<Utc>>,
        error: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(UPDATE_SYNC_TASK_FAILURE)
            .bind(id.value())
            .bind(i64::from(attempts))
            .bind(next_attempt_at.map(|at| at.timestamp_millis()))
            .bind(error)
            .execute(self.pool.get_pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Sync task {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl SyncLedger for SqliteOfflinePersistence {
    async fn last_sync_time(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        let value: Option<String> = sqlx::query_scalar(SELECT_METADATA)
            .bind(LAST_SYNC_TIME_KEY)
            .fetch_optional(self.pool.get_pool())
            .await?;
        value
            .map(|raw| {
                let millis = raw.parse::<i64>().map_err(|_| {
                    AppError::Database(format!("Invalid last sync time: {raw}"))
                })?;
                timestamp_from_millis(millis, "sync_metadata.last_sync_time")
            })
            .transpose()
    }

    async fn set_last_sync_time(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(UPSERT_METADATA)
            .bind(LAST_SYNC_TIME_KEY)
            .bind(at.timestamp_millis().to_string())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn dropped_tasks(&self) -> Result<Vec<DroppedTask>, AppError> {
        let rows = sqlx::query_as::<_, DroppedTaskRow>(SELECT_DROPPED_TASKS)
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(dropped_task_from_row).collect()
    }

    async fn dropped_count(&self) -> Result<usize, AppError> {
        let count: i64 = sqlx::query_scalar(COUNT_DROPPED_TASKS)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn clear_dropped(&self) -> Result<usize, AppError> {
        let result = sqlx::query(DELETE_DROPPED_TASKS)
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl OfflinePersistence for SqliteOfflinePersistence {
    async fn put_and_enqueue(
        &self,
        record: Record,
        task: NewSyncTask,
    ) -> Result<(RecordId, SyncTaskId), AppError> {
        let task = task.for_record(record.reference());
        let mut tx = self.pool.get_pool().begin().await?;
        // Queue first so the upsert sees the pending task and keeps the record unsynced.
        let task_id = Self::insert_task(&mut tx, &task, record.timestamp).await?;
        Self::upsert_record(&mut tx, &record).await?;
        tx.commit().await?;

        debug!(
            target: "sync::store",
            collection = %record.collection,
            record_id = %record.id,
            task_id = %task_id,
            action = %task.action_kind,
            "stored record and queued task"
        );
        Ok((record.id, task_id))
    }

    async fn complete_task(&self, task: &SyncTask) -> Result<bool, AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        sqlx::query(DELETE_SYNC_TASK)
            .bind(task.id.value())
            .execute(&mut *tx)
            .await?;

        let mut flipped = false;
        if let Some(record) = &task.record {
            let result = sqlx::query(MARK_RECORD_SYNCED_IF_IDLE)
                .bind(record.collection.as_str())
                .bind(record.id.as_str())
                .execute(&mut *tx)
                .await?;
            flipped = result.rows_affected() > 0;
        }
        tx.commit().await?;
        Ok(flipped)
    }

    async fn drop_task(&self, dropped: &DroppedTask) -> Result<(), AppError> {
        let payload = serde_json::to_string(dropped.payload.as_json())?;
        let (record_collection, record_id) = match &dropped.record {
            Some(record) => (
                Some(record.collection.as_str()),
                Some(record.id.as_str().to_string()),
            ),
            None => (None, None),
        };

        let mut tx = self.pool.get_pool().begin().await?;
        sqlx::query(DELETE_SYNC_TASK)
            .bind(dropped.task_id.value())
            .execute(&mut *tx)
            .await?;
        sqlx::query(INSERT_DROPPED_TASK)
            .bind(dropped.task_id.value())
            .bind(dropped.action_kind.as_str())
            .bind(payload)
            .bind(record_collection)
            .bind(record_id)
            .bind(i64::from(dropped.attempts))
            .bind(dropped.failure.as_str())
            .bind(dropped.http_status.map(i64::from))
            .bind(&dropped.reason)
            .bind(dropped.enqueued_at.timestamp_millis())
            .bind(dropped.dropped_at.timestamp_millis())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        for statement in [
            DELETE_ALL_RECORDS,
            DELETE_ALL_SYNC_TASKS,
            DELETE_DROPPED_TASKS,
            DELETE_ALL_METADATA,
        ] {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }
}
