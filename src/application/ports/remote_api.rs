use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart {
        fields: Vec<(String, String)>,
        file: FilePart,
    },
}

/// One call against the field service API. Path segments are raw and get encoded by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: HttpMethod,
    pub segments: Vec<String>,
    pub body: RequestBody,
}

impl RemoteRequest {
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl RemoteResponse {
    pub fn new(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Consumed collaborator. Implementations attach the bearer token; a transport failure is an
/// `Err`, any HTTP answer (including 4xx/5xx) is an `Ok`.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteResponse, AppError>;
    async fn update_credentials(&self, bearer_token: String);
}
