use super::InferenceBackend;
use crate::error::ClientError;
use crate::model::{AugmentRequest, ClientConfig, HealthStatus, InferResponse, SelectedFile};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;

const UPLOAD_PATH: &str = "api/infer/upload";
const AUGMENT_PATH: &str = "api/infer/augment";
const DEMO_PATH: &str = "api/infer/demo";
const HEALTH_PATH: &str = "api/health";

/// Longest backend detail message carried into a notification.
const MAX_DETAIL_CHARS: usize = 200;

/// `reqwest`-backed client for the inference endpoints.
pub struct HttpBackend {
    http: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ClientError> {
        let base = parse_base_url(&cfg.base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Config(format!("cannot build {path} url: {e}")))
    }
}

/// Parse the base URL so that relative endpoint paths join beneath it, even
/// when the backend is mounted under a path prefix.
fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|e| ClientError::Config(format!("base url {raw:?}: {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Config(format!(
            "base url {raw:?} must be an http(s) url"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Pull a human-readable reason out of an error body. FastAPI uses `detail`,
/// Spring uses `error`/`message`.
pub(crate) fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = ["detail", "message", "error"]
        .iter()
        .find_map(|key| match value.get(*key)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Array(items) => items.iter().find_map(|item| {
                item.get("msg")
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string())
            }),
            _ => None,
        })?;
    Some(detail.chars().take(MAX_DETAIL_CHARS).collect())
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let detail = error_detail(&body);
        tracing::debug!(status = status.as_u16(), detail = ?detail, "backend rejected request");
        return Err(ClientError::Status {
            status: status.as_u16(),
            detail,
        });
    }
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    async fn infer_upload(&self, file: SelectedFile) -> Result<InferResponse, ClientError> {
        let url = self.endpoint(UPLOAD_PATH)?;
        tracing::debug!(%url, file = %file.name, bytes = file.size(), "upload inference");
        let len = file.size() as u64;
        let part = Part::stream_with_length(file.bytes, len)
            .file_name(file.name)
            .mime_str(file.content_type)?;
        let form = Form::new().part("file", part);
        let resp = self.http.post(url).multipart(form).send().await?;
        decode(resp).await
    }

    async fn infer_augment(&self, request: AugmentRequest) -> Result<InferResponse, ClientError> {
        let url = self.endpoint(AUGMENT_PATH)?;
        tracing::debug!(%url, session = %request.session_id, chars = request.text.chars().count(), "augment inference");
        let resp = self.http.post(url).json(&request).send().await?;
        decode(resp).await
    }

    async fn infer_demo(&self) -> Result<InferResponse, ClientError> {
        let url = self.endpoint(DEMO_PATH)?;
        tracing::debug!(%url, "demo inference");
        let resp = self.http.get(url).send().await?;
        decode(resp).await
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        let url = self.endpoint(HEALTH_PATH)?;
        let resp = self.http.get(url).send().await?;
        decode(resp).await
    }
}
