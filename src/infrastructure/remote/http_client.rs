use crate::application::ports::remote_api::{
    FilePart, HttpMethod, RemoteApi, RemoteRequest, RemoteResponse, RequestBody,
};
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// `RemoteApi` over HTTPS with bearer auth.
pub struct HttpRemoteApi {
    client: reqwest::Client,
    base_url: Url,
    bearer_token: RwLock<Option<String>>,
}

impl HttpRemoteApi {
    pub fn new(config: &RemoteConfig, timeout: Duration) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            AppError::Configuration(format!("Invalid API base url {}: {err}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Configuration(format!(
                "API base url cannot carry paths: {}",
                config.base_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Configuration(err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            bearer_token: RwLock::new(config.api_token.clone()),
        })
    }

    fn url_for(&self, segments: &[String]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Configuration("API base url cannot carry paths".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn multipart_form(fields: Vec<(String, String)>, file: FilePart) -> Result<Form, AppError> {
    let part = Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(&file.content_type)
        .map_err(|err| AppError::ValidationError(format!("Invalid content type: {err}")))?;
    let form = fields
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value));
    Ok(form.part(file.field_name, part))
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteResponse, AppError> {
        let url = self.url_for(&request.segments)?;
        let path = request.path();
        let method = request.method;
        // Without credentials the server would answer 401 anyway.
        let token = self
            .bearer_token
            .read()
            .await
            .clone()
            .ok_or(AppError::AuthExpired)?;

        let builder = match method {
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Put => self.client.put(url),
        }
        .bearer_auth(token);

        let builder = match request.body {
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart { fields, file } => builder.multipart(multipart_form(fields, file)?),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.ok().filter(|text| !text.is_empty());

        debug!(
            target: "sync::remote",
            method = method.as_str(),
            path = %path,
            status,
            "remote call finished"
        );
        Ok(RemoteResponse { status, body })
    }

    async fn update_credentials(&self, bearer_token: String) {
        *self.bearer_token.write().await = Some(bearer_token);
    }
}
