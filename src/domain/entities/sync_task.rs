use super::RecordRef;
use crate::domain::value_objects::{ActionKind, SyncPayload, SyncTaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncTask {
    pub id: SyncTaskId,
    pub action_kind: ActionKind,
    pub payload: SyncPayload,
    pub record: Option<RecordRef>,
    pub enqueued_at: DateTime<Utc>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SyncTask {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.is_none_or(|at| at <= now)
    }

    /// Tasks sharing a key touch the same entity and must reach the server in enqueue order.
    pub fn ordering_key(&self) -> String {
        if let Some(job_id) = self.payload.job_id() {
            return format!("job:{job_id}");
        }
        if let Some(customer_id) = self.payload.customer_id() {
            return format!("customer:{customer_id}");
        }
        match &self.record {
            Some(record) => format!("{}:{}", record.collection, record.id),
            None => format!("task:{}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSyncTask {
    pub action_kind: ActionKind,
    pub payload: SyncPayload,
    pub record: Option<RecordRef>,
    pub max_attempts: u32,
}

impl NewSyncTask {
    pub fn new(action_kind: ActionKind, payload: SyncPayload) -> Self {
        Self {
            action_kind,
            payload,
            record: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn for_record(mut self, record: RecordRef) -> Self {
        self.record = Some(record);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}
