use super::{RecordRef, SyncTask};
use crate::domain::value_objects::{ActionKind, SyncPayload, SyncTaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The server refused the payload (4xx other than 401); retrying cannot help.
    Rejected,
    /// Network errors or 5xx responses on every allowed attempt.
    RetriesExhausted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Rejected => "rejected",
            FailureKind::RetriesExhausted => "retries_exhausted",
        }
    }
}

impl TryFrom<&str> for FailureKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "rejected" => Ok(FailureKind::Rejected),
            "retries_exhausted" => Ok(FailureKind::RetriesExhausted),
            other => Err(format!("Unknown failure kind: {other}")),
        }
    }
}

/// A task removed from the queue without being applied. Kept until acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DroppedTask {
    pub task_id: SyncTaskId,
    pub action_kind: ActionKind,
    pub payload: SyncPayload,
    pub record: Option<RecordRef>,
    pub attempts: u32,
    pub failure: FailureKind,
    pub http_status: Option<u16>,
    pub reason: String,
    pub enqueued_at: DateTime<Utc>,
    pub dropped_at: DateTime<Utc>,
}

impl DroppedTask {
    pub fn from_task(
        task: &SyncTask,
        failure: FailureKind,
        http_status: Option<u16>,
        reason: impl Into<String>,
        dropped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id: task.id,
            action_kind: task.action_kind,
            payload: task.payload.clone(),
            record: task.record.clone(),
            attempts: task.attempts,
            failure,
            http_status,
            reason: reason.into(),
            enqueued_at: task.enqueued_at,
            dropped_at,
        }
    }
}
