use super::rows::{DroppedTaskRow, RecordRow, SyncTaskRow};
use crate::domain::entities::{DroppedTask, FailureKind, Record, RecordRef, SyncTask};
use crate::domain::value_objects::{ActionKind, Collection, RecordId, SyncPayload, SyncTaskId};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};

pub fn timestamp_from_millis(value: i64, column: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(value)
        .ok_or_else(|| AppError::Database(format!("Invalid timestamp in {column}: {value}")))
}

fn count_from_i64(value: i64, column: &str) -> Result<u32, AppError> {
    u32::try_from(value)
        .map_err(|_| AppError::Database(format!("Invalid count in {column}: {value}")))
}

fn record_ref_from_columns(
    collection: Option<String>,
    id: Option<String>,
) -> Result<Option<RecordRef>, AppError> {
    match (collection, id) {
        (Some(collection), Some(id)) => {
            let collection = Collection::try_from(collection.as_str()).map_err(AppError::Database)?;
            let id = RecordId::new(id).map_err(AppError::Database)?;
            Ok(Some(RecordRef::new(collection, id)))
        }
        _ => Ok(None),
    }
}

pub fn record_from_row(row: RecordRow) -> Result<Record, AppError> {
    Ok(Record {
        collection: Collection::try_from(row.collection.as_str()).map_err(AppError::Database)?,
        id: RecordId::new(row.id).map_err(AppError::Database)?,
        payload: SyncPayload::from_json_str(&row.payload).map_err(AppError::Serialization)?,
        synced: row.synced,
        created_offline: row.created_offline,
        timestamp: timestamp_from_millis(row.updated_at, "records.updated_at")?,
    })
}

pub fn sync_task_from_row(row: SyncTaskRow) -> Result<SyncTask, AppError> {
    Ok(SyncTask {
        id: SyncTaskId::new(row.id).map_err(AppError::Database)?,
        action_kind: ActionKind::try_from(row.action_kind.as_str()).map_err(AppError::Database)?,
        payload: SyncPayload::from_json_str(&row.payload).map_err(AppError::Serialization)?,
        record: record_ref_from_columns(row.record_collection, row.record_id)?,
        enqueued_at: timestamp_from_millis(row.enqueued_at, "sync_queue.enqueued_at")?,
        attempts: count_from_i64(row.attempts, "sync_queue.attempts")?,
        max_attempts: count_from_i64(row.max_attempts, "sync_queue.max_attempts")?,
        next_attempt_at: row
            .next_attempt_at
            .map(|value| timestamp_from_millis(value, "sync_queue.next_attempt_at"))
            .transpose()?,
        last_error: row.last_error,
    })
}

pub fn dropped_task_from_row(row: DroppedTaskRow) -> Result<DroppedTask, AppError> {
    let http_status = row
        .http_status
        .map(|status| {
            u16::try_from(status)
                .map_err(|_| AppError::Database(format!("Invalid http status: {status}")))
        })
        .transpose()?;

    Ok(DroppedTask {
        task_id: SyncTaskId::new(row.task_id).map_err(AppError::Database)?,
        action_kind: ActionKind::try_from(row.action_kind.as_str()).map_err(AppError::Database)?,
        payload: SyncPayload::from_json_str(&row.payload).map_err(AppError::Serialization)?,
        record: record_ref_from_columns(row.record_collection, row.record_id)?,
        attempts: count_from_i64(row.attempts, "dropped_tasks.attempts")?,
        failure: FailureKind::try_from(row.failure_kind.as_str()).map_err(AppError::Database)?,
        http_status,
        reason: row.reason,
        enqueued_at: timestamp_from_millis(row.enqueued_at, "dropped_tasks.enqueued_at")?,
        dropped_at: timestamp_from_millis(row.dropped_at, "dropped_tasks.dropped_at")?,
    })
}
