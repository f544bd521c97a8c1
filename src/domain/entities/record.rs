use crate::domain::value_objects::{Collection, RecordId, SyncPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRef {
    pub collection: Collection,
    pub id: RecordId,
}

impl RecordRef {
    pub fn new(collection: Collection, id: RecordId) -> Self {
        Self { collection, id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub collection: Collection,
    pub id: RecordId,
    pub payload: SyncPayload,
    pub synced: bool,
    pub created_offline: bool,
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// A record written by a local action; unsynced until its task is applied remotely.
    pub fn local(
        collection: Collection,
        id: RecordId,
        payload: SyncPayload,
        created_offline: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            collection,
            id,
            payload,
            synced: false,
            created_offline,
            timestamp,
        }
    }

    /// A record fetched from the server, already reflecting remote state.
    pub fn from_remote(
        collection: Collection,
        id: RecordId,
        payload: SyncPayload,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            collection,
            id,
            payload,
            synced: true,
            created_offline: false,
            timestamp,
        }
    }

    pub fn reference(&self) -> RecordRef {
        RecordRef::new(self.collection, self.id.clone())
    }
}

/// Query-time predicate over secondary fields. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub job_id: Option<String>,
    pub technician_id: Option<String>,
    pub status: Option<String>,
    pub synced: Option<bool>,
}

impl RecordFilter {
    pub fn by_job(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            ..Self::default()
        }
    }

    pub fn by_technician(technician_id: impl Into<String>) -> Self {
        Self {
            technician_id: Some(technician_id.into()),
            ..Self::default()
        }
    }

    pub fn unsynced() -> Self {
        Self {
            synced: Some(false),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_synced(mut self, synced: bool) -> Self {
        self.synced = Some(synced);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(job_id) = &self.job_id
            && record.payload.job_id().as_deref() != Some(job_id.as_str())
        {
            return false;
        }
        if let Some(technician_id) = &self.technician_id
            && record.payload.technician_id().as_deref() != Some(technician_id.as_str())
        {
            return false;
        }
        if let Some(status) = &self.status
            && record.payload.status().as_deref() != Some(status.as_str())
        {
            return false;
        }
        if let Some(synced) = self.synced
            && record.synced != synced
        {
            return false;
        }
        true
    }
}
