use serde::{Deserialize, Serialize};
use std::fmt;

/// Queue position assigned on enqueue; strictly increasing, so it doubles as FIFO order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyncTaskId(i64);

impl SyncTaskId {
    pub fn new(value: i64) -> Result<Self, String> {
        if value <= 0 {
            return Err("Sync task id must be positive".to_string());
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SyncTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SyncTaskId> for i64 {
    fn from(id: SyncTaskId) -> Self {
        id.0
    }
}
