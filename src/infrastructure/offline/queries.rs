pub(super) const UPSERT_RECORD: &str = r#"
    INSERT INTO records (
        collection,
        id,
        payload,
        job_id,
        technician_id,
        status,
        synced,
        created_offline,
        updated_at
    ) VALUES (
        ?1, ?2, ?3, ?4, ?5, ?6,
        CASE
            WHEN EXISTS (
                SELECT 1 FROM sync_queue
                WHERE record_collection = ?1 AND record_id = ?2
            ) THEN 0
            ELSE ?7
        END,
        ?8, ?9
    )
    ON CONFLICT(collection, id) DO UPDATE SET
        payload = excluded.payload,
        job_id = excluded.job_id,
        technician_id = excluded.technician_id,
        status = excluded.status,
        synced = excluded.synced,
        created_offline = records.created_offline,
        updated_at = excluded.updated_at
"#;

pub(super) const SELECT_RECORD: &str = r#"
    SELECT collection, id, payload, synced, created_offline, updated_at
    FROM records
    WHERE collection = ?1 AND id = ?2
"#;

/// Prefix for filtered reads; conditions are appended with a query builder.
pub(super) const SELECT_RECORDS_BY_COLLECTION: &str = r#"
    SELECT collection, id, payload, synced, created_offline, updated_at
    FROM records
    WHERE collection = "#;

pub(super) const DELETE_RECORDS_BY_COLLECTION: &str = r#"
    DELETE FROM records
    WHERE collection = ?1
"#;

pub(super) const MARK_RECORD_SYNCED_IF_IDLE: &str = r#"
    UPDATE records
    SET synced = 1
    WHERE collection = ?1
      AND id = ?2
      AND NOT EXISTS (
          SELECT 1 FROM sync_queue
          WHERE record_collection = ?1 AND record_id = ?2
      )
"#;

pub(super) const INSERT_SYNC_TASK: &str = r#"
    INSERT INTO sync_queue (
        action_kind,
        payload,
        record_collection,
        record_id,
        enqueued_at,
        attempts,
        max_attempts
    ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
"#;

pub(super) const SELECT_SYNC_TASKS: &str = r#"
    SELECT id,
           action_kind,
           payload,
           record_collection,
           record_id,
           enqueued_at,
           attempts,
           max_attempts,
           next_attempt_at,
           last_error
    FROM sync_queue
    ORDER BY id ASC
"#;

pub(super) const COUNT_SYNC_TASKS: &str = r#"
    SELECT COUNT(*) FROM sync_queue
"#;

pub(super) const DELETE_SYNC_TASK: &str = r#"
    DELETE FROM sync_queue
    WHERE id = ?1
"#;

pub(super) const UPDATE_SYNC_TASK_FAILURE: &str = r#"
    UPDATE sync_queue
    SET attempts = ?2,
        next_attempt_at = ?3,
        last_error = ?4
    WHERE id = ?1
"#;

pub(super) const INSERT_DROPPED_TASK: &str = r#"
    INSERT INTO dropped_tasks (
        task_id,
        action_kind,
        payload,
        record_collection,
        record_id,
        attempts,
        failure_kind,
        http_status,
        reason,
        enqueued_at,
        dropped_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT(task_id) DO UPDATE SET
        attempts = excluded.attempts,
        failure_kind = excluded.failure_kind,
        http_status = excluded.http_status,
        reason = excluded.reason,
        dropped_at = excluded.dropped_at
"#;

pub(super) const SELECT_DROPPED_TASKS: &str = r#"
    SELECT task_id,
           action_kind,
           payload,
           record_collection,
           record_id,
           attempts,
           failure_kind,
           http_status,
           reason,
           enqueued_at,
           dropped_at
    FROM dropped_tasks
    ORDER BY dropped_at ASC, task_id ASC
"#;

pub(super) const COUNT_DROPPED_TASKS: &str = r#"
    SELECT COUNT(*) FROM dropped_tasks
"#;

pub(super) const DELETE_DROPPED_TASKS: &str = r#"
    DELETE FROM dropped_tasks
"#;

pub(super) const SELECT_METADATA: &str = r#"
    SELECT value FROM sync_metadata
    WHERE key = ?1
"#;

pub(super) const UPSERT_METADATA: &str = r#"
    INSERT INTO sync_metadata (key, value)
    VALUES (?1, ?2)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#;

pub(super) const DELETE_ALL_RECORDS: &str = "DELETE FROM records";
pub(super) const DELETE_ALL_SYNC_TASKS: &str = "DELETE FROM sync_queue";
pub(super) const DELETE_ALL_METADATA: &str = "DELETE FROM sync_metadata";

pub(super) const LAST_SYNC_TIME_KEY: &str = "last_sync_time";
