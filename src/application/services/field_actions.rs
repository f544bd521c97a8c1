use crate::application::ports::offline_store::{LocalStore, OfflinePersistence};
use crate::application::ports::platform::{Clock, DrainRequester, OnlineState};
use crate::domain::entities::{
    DEFAULT_MAX_ATTEMPTS, DrainTrigger, NewSyncTask, Record, RecordFilter, RecordRef,
};
use crate::domain::value_objects::{ActionKind, Collection, RecordId, SyncPayload, SyncTaskId};
use crate::shared::error::AppError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Scheduled,
    EnRoute,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Scheduled => "scheduled",
            JobStatus::EnRoute => "en_route",
            JobStatus::InProgress => "in_progress",
            JobStatus::OnHold => "on_hold",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeEntryKind {
    ClockIn,
    ClockOut,
}

impl TimeEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeEntryKind::ClockIn => "clock_in",
            TimeEntryKind::ClockOut => "clock_out",
        }
    }
}

/// Urgency carried on material requests. Informational only; the queue stays FIFO.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TimeEntryParams {
    pub job_id: String,
    pub technician_id: String,
    pub notes: Option<String>,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone)]
pub struct PhotoFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,
    pub name: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// What a mutating action left behind: the local record and the task that will sync it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReceipt {
    pub record: RecordRef,
    pub task_id: SyncTaskId,
}

/// Field technician actions. Each one writes its record and queues one task atomically, so
/// it works the same with or without a connection.
pub struct FieldActionService {
    store: Arc<dyn OfflinePersistence>,
    online: Arc<dyn OnlineState>,
    clock: Arc<dyn Clock>,
    requester: Option<Arc<dyn DrainRequester>>,
    max_attempts: u32,
}

impl FieldActionService {
    pub fn new(
        store: Arc<dyn OfflinePersistence>,
        online: Arc<dyn OnlineState>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            online,
            clock,
            requester: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Ask for a drain right after a local change while online.
    pub fn with_requester(mut self, requester: Arc<dyn DrainRequester>) -> Self {
        self.requester = Some(requester);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn clock_in(&self, params: TimeEntryParams) -> Result<ActionReceipt, AppError> {
        self.record_time_entry(TimeEntryKind::ClockIn, params).await
    }

    pub async fn clock_out(&self, params: TimeEntryParams) -> Result<ActionReceipt, AppError> {
        self.record_time_entry(TimeEntryKind::ClockOut, params).await
    }

    pub async fn start_job(&self, job_id: &str) -> Result<ActionReceipt, AppError> {
        let mut extra = Map::new();
        extra.insert("startedAt".into(), json!(self.clock.now().to_rfc3339()));
        self.transition_job(job_id, JobStatus::InProgress, extra).await
    }

    pub async fn complete_job(
        &self,
        job_id: &str,
        completion_notes: Option<String>,
    ) -> Result<ActionReceipt, AppError> {
        let mut extra = Map::new();
        extra.insert("completedAt".into(), json!(self.clock.now().to_rfc3339()));
        if let Some(notes) = completion_notes {
            extra.insert("completionNotes".into(), json!(notes));
        }
        self.transition_job(job_id, JobStatus::Completed, extra).await
    }

    pub async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
    ) -> Result<ActionReceipt, AppError> {
        self.transition_job(job_id, status, Map::new()).await
    }

    pub async fn capture_photo(
        &self,
        job_id: &str,
        file: PhotoFile,
        category: &str,
        description: &str,
    ) -> Result<ActionReceipt, AppError> {
        let job_id = non_empty("jobId", job_id)?;
        let category = non_empty("category", category)?;
        if file.bytes.is_empty() {
            return Err(AppError::ValidationError("Photo file is empty".into()));
        }

        let id = RecordId::generate();
        let payload = object_payload(json!({
            "localId": id.as_str(),
            "jobId": job_id,
            "category": category,
            "description": description,
            "fileName": file.file_name,
            "contentType": file.content_type,
            "fileData": BASE64.encode(&file.bytes),
            "capturedAt": self.clock.now().to_rfc3339(),
        }))?;
        self.save(Collection::Photos, id, payload.clone(), ActionKind::UploadPhoto, payload)
            .await
    }

    pub async fn request_materials(
        &self,
        job_id: &str,
        items: Vec<MaterialItem>,
        priority: MaterialPriority,
    ) -> Result<ActionReceipt, AppError> {
        let job_id = non_empty("jobId", job_id)?;
        if items.is_empty() {
            return Err(AppError::ValidationError(
                "Material request needs at least one item".into(),
            ));
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(AppError::ValidationError(format!(
                "Quantity for {} must be positive",
                item.name
            )));
        }

        let id = RecordId::generate();
        let task_payload = object_payload(json!({
            "localId": id.as_str(),
            "jobId": job_id,
            "items": items,
            "priority": priority,
            "requestedAt": self.clock.now().to_rfc3339(),
        }))?;
        let record_payload = task_payload.merged_with(&object_payload(json!({"status": "pending"}))?);
        self.save(
            Collection::Materials,
            id,
            record_payload,
            ActionKind::CreateMaterialRequest,
            task_payload,
        )
        .await
    }

    pub async fn update_customer_notes(
        &self,
        customer_id: &str,
        notes: &str,
        note_type: &str,
    ) -> Result<ActionReceipt, AppError> {
        let customer_id = non_empty("customerId", customer_id)?;
        let id = RecordId::new(customer_id.to_string()).map_err(AppError::ValidationError)?;
        let patch = object_payload(json!({
            "notes": notes,
            "notesType": note_type,
            "notesUpdatedAt": self.clock.now().to_rfc3339(),
        }))?;
        let record_payload = self.current_payload(Collection::Customers, &id).await?.merged_with(&patch);
        let task_payload = object_payload(json!({
            "customerId": customer_id,
            "notes": notes,
            "type": note_type,
        }))?;
        self.save(
            Collection::Customers,
            id,
            record_payload,
            ActionKind::UpdateCustomerNotes,
            task_payload,
        )
        .await
    }

    /// Stores records fetched from the server. They arrive synced and never queue anything.
    pub async fn cache_remote_records(
        &self,
        collection: Collection,
        records: Vec<Value>,
    ) -> Result<usize, AppError> {
        let now = self.clock.now();
        let mut stored = 0;
        for value in records {
            let payload = SyncPayload::new(value).map_err(AppError::ValidationError)?;
            let id = payload.str_field("id").ok_or_else(|| {
                AppError::ValidationError(format!("Remote {collection} record without id"))
            })?;
            let id = RecordId::new(id).map_err(AppError::ValidationError)?;
            self.store
                .put(collection, Record::from_remote(collection, id, payload, now))
                .await?;
            stored += 1;
        }
        debug!(target: "sync::store", collection = %collection, stored, "cached remote records");
        Ok(stored)
    }

    pub async fn records(
        &self,
        collection: Collection,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Record>, AppError> {
        self.store.get_all(collection, filter).await
    }

    async fn record_time_entry(
        &self,
        kind: TimeEntryKind,
        params: TimeEntryParams,
    ) -> Result<ActionReceipt, AppError> {
        let job_id = non_empty("jobId", &params.job_id)?;
        let technician_id = non_empty("technicianId", &params.technician_id)?;

        let id = RecordId::generate();
        let mut body = json!({
            "localId": id.as_str(),
            "jobId": job_id,
            "technicianId": technician_id,
            "type": kind.as_str(),
            "timestamp": self.clock.now().to_rfc3339(),
        });
        if let Some(notes) = params.notes {
            body["notes"] = json!(notes);
        }
        if let Some(location) = params.location {
            body["location"] = serde_json::to_value(location)?;
        }
        let payload = object_payload(body)?;
        self.save(
            Collection::TimeEntries,
            id,
            payload.clone(),
            ActionKind::CreateTimeEntry,
            payload,
        )
        .await
    }

    async fn transition_job(
        &self,
        job_id: &str,
        status: JobStatus,
        extra: Map<String, Value>,
    ) -> Result<ActionReceipt, AppError> {
        let job_id = non_empty("jobId", job_id)?;
        let id = RecordId::new(job_id.to_string()).map_err(AppError::ValidationError)?;

        let mut patch = extra;
        patch.insert("status".into(), json!(status.as_str()));
        patch.insert("updatedAt".into(), json!(self.clock.now().to_rfc3339()));
        let patch = object_payload(Value::Object(patch))?;

        let mut record_payload = self.current_payload(Collection::Jobs, &id).await?;
        if record_payload.str_field("id").is_none() {
            record_payload = record_payload.merged_with(&object_payload(json!({"id": job_id}))?);
        }
        let record_payload = record_payload.merged_with(&patch);
        let task_payload = object_payload(json!({"jobId": job_id}))?.merged_with(&patch);

        self.save(
            Collection::Jobs,
            id,
            record_payload,
            ActionKind::UpdateJobStatus,
            task_payload,
        )
        .await
    }

    async fn current_payload(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<SyncPayload, AppError> {
        Ok(self
            .store
            .get(collection, id)
            .await?
            .map(|record| record.payload)
            .unwrap_or_else(SyncPayload::empty))
    }

    async fn save(
        &self,
        collection: Collection,
        id: RecordId,
        record_payload: SyncPayload,
        action_kind: ActionKind,
        task_payload: SyncPayload,
    ) -> Result<ActionReceipt, AppError> {
        let online = self.online.is_online();
        let record = Record::local(collection, id, record_payload, !online, self.clock.now());
        let reference = record.reference();
        let task = NewSyncTask::new(action_kind, task_payload).with_max_attempts(self.max_attempts);
        let (_, task_id) = self.store.put_and_enqueue(record, task).await?;

        info!(
            target: "sync::store",
            collection = %collection,
            record_id = %reference.id,
            task_id = %task_id,
            action = %action_kind,
            online,
            "action recorded"
        );
        if online && let Some(requester) = &self.requester {
            requester.request_drain(DrainTrigger::LocalChange);
        }
        Ok(ActionReceipt {
            record: reference,
            task_id,
        })
    }
}

fn non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn object_payload(value: Value) -> Result<SyncPayload, AppError> {
    SyncPayload::new(value).map_err(AppError::ValidationError)
}
