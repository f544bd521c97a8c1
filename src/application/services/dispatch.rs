use crate::application::ports::remote_api::{
    FilePart, HttpMethod, RemoteRequest, RemoteResponse, RequestBody,
};
use crate::domain::entities::SyncTask;
use crate::domain::value_objects::ActionKind;
use crate::shared::error::AppError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};

/// Payload keys used only on the device; never sent to the server.
const LOCAL_ONLY_KEYS: [&str; 3] = ["localId", "fileData", "createdOffline"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// 401: credentials must be refreshed before anything else is sent.
    AuthExpired,
    /// Terminal refusal; the payload will never be accepted as is.
    Rejected { status: Option<u16>, message: String },
    /// Transient failure: network, timeout or server side.
    Retryable { status: Option<u16>, message: String },
}

/// Maps a queued task onto its remote call.
pub fn build_request(task: &SyncTask) -> Result<RemoteRequest, AppError> {
    let payload = task.payload.as_json();
    match task.action_kind {
        ActionKind::CreateTimeEntry => Ok(RemoteRequest {
            method: HttpMethod::Post,
            segments: vec!["time-entries".into()],
            body: RequestBody::Json(wire_body(payload, &[])),
        }),
        ActionKind::UpdateJobStatus => {
            let job_id = required(task, "jobId")?;
            Ok(RemoteRequest {
                method: HttpMethod::Put,
                segments: vec!["jobs".into(), job_id],
                body: RequestBody::Json(wire_body(payload, &["jobId"])),
            })
        }
        ActionKind::CreateMaterialRequest => Ok(RemoteRequest {
            method: HttpMethod::Post,
            segments: vec!["materials".into(), "requests".into()],
            body: RequestBody::Json(wire_body(payload, &[])),
        }),
        ActionKind::UpdateCustomerNotes => {
            let customer_id = required(task, "customerId")?;
            Ok(RemoteRequest {
                method: HttpMethod::Post,
                segments: vec!["customers".into(), customer_id, "notes".into()],
                body: RequestBody::Json(wire_body(payload, &["customerId"])),
            })
        }
        ActionKind::UploadPhoto => photo_request(task),
    }
}

fn photo_request(task: &SyncTask) -> Result<RemoteRequest, AppError> {
    let encoded = required(task, "fileData")?;
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|err| AppError::ValidationError(format!("Photo data is not base64: {err}")))?;
    let file_name = task
        .payload
        .str_field("fileName")
        .unwrap_or_else(|| format!("photo-{}.jpg", task.id));
    let content_type = task
        .payload
        .str_field("contentType")
        .unwrap_or_else(|| "image/jpeg".to_string());

    let mut fields = vec![("jobId".to_string(), required(task, "jobId")?)];
    for key in ["category", "description", "capturedAt"] {
        if let Some(value) = task.payload.str_field(key) {
            fields.push((key.to_string(), value));
        }
    }

    Ok(RemoteRequest {
        method: HttpMethod::Post,
        segments: vec!["photos".into()],
        body: RequestBody::Multipart {
            fields,
            file: FilePart {
                field_name: "photo".into(),
                file_name,
                content_type,
                bytes,
            },
        },
    })
}

fn required(task: &SyncTask, key: &str) -> Result<String, AppError> {
    task.payload.str_field(key).ok_or_else(|| {
        AppError::ValidationError(format!(
            "{} task {} is missing {key}",
            task.action_kind, task.id
        ))
    })
}

fn wire_body(payload: &Value, path_keys: &[&str]) -> Value {
    let map: Map<String, Value> = payload
        .as_object()
        .map(|object| {
            object
                .iter()
                .filter(|(key, _)| {
                    !LOCAL_ONLY_KEYS.contains(&key.as_str()) && !path_keys.contains(&key.as_str())
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();
    Value::Object(map)
}

/// Sorts a remote result into the retry taxonomy.
pub fn classify(result: Result<RemoteResponse, AppError>) -> TaskOutcome {
    match result {
        Ok(response) => classify_status(&response),
        Err(AppError::AuthExpired) => TaskOutcome::AuthExpired,
        Err(AppError::ValidationError(message)) => TaskOutcome::Rejected {
            status: None,
            message,
        },
        Err(err) => TaskOutcome::Retryable {
            status: None,
            message: err.to_string(),
        },
    }
}

fn classify_status(response: &RemoteResponse) -> TaskOutcome {
    let status = response.status;
    let message = match &response.body {
        Some(body) => format!("HTTP {status}: {}", truncate(body, 200)),
        None => format!("HTTP {status}"),
    };
    match status {
        200..=299 => TaskOutcome::Success,
        401 => TaskOutcome::AuthExpired,
        // Request timeout and rate limiting say nothing about the payload.
        408 | 429 => TaskOutcome::Retryable {
            status: Some(status),
            message,
        },
        400..=499 => TaskOutcome::Rejected {
            status: Some(status),
            message,
        },
        500..=599 => TaskOutcome::Retryable {
            status: Some(status),
            message,
        },
        // The client follows redirects; any other status here will not change on resend.
        _ => TaskOutcome::Rejected {
            status: Some(status),
            message: format!("unexpected {message}"),
        },
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
