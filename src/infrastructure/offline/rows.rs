use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct RecordRow {
    pub collection: String,
    pub id: String,
    pub payload: String,
    pub synced: bool,
    pub created_offline: bool,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SyncTaskRow {
    pub id: i64,
    pub action_kind: String,
    pub payload: String,
    pub record_collection: Option<String>,
    pub record_id: Option<String>,
    pub enqueued_at: i64,
    pub attempts: i64,
    pub max_attempts: i64,
    pub next_attempt_at: Option<i64>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DroppedTaskRow {
    pub task_id: i64,
    pub action_kind: String,
    pub payload: String,
    pub record_collection: Option<String>,
    pub record_id: Option<String>,
    pub attempts: i64,
    pub failure_kind: String,
    pub http_status: Option<i64>,
    pub reason: String,
    pub enqueued_at: i64,
    pub dropped_at: i64,
}
