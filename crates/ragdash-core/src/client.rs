use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::chat::ChatRequest;
use crate::error::ApiError;
use crate::payload::{
    BackendStatus, ChatReply, Cluster, ClusterData, IngestReport, PipelineConfig, Sentiment,
    TimePoint,
};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Envelope status of an accepted chat, analytics, ingest or config request
const SUCCESS: &str = "success";
/// Envelope status of a healthy `/api/status` reply
const HEALTHY: &str = "ok";

/// HTTP client for the RAG backend's JSON API
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client whose requests fail as transport errors after `timeout`
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let mut body = self.post("/api/chat", request, SUCCESS).await?;
        let reply: ChatReply = take_field(&mut body, "response")?;
        if let Some(usage) = &reply.usage {
            tracing::debug!(total = ?usage.total, processing_time = ?usage.processing_time, "chat usage");
        }
        Ok(reply)
    }

    pub async fn clusters(&self) -> Result<Vec<Cluster>, ApiError> {
        let mut body = self.get("/api/analytics/clusters", SUCCESS).await?;
        let data: ClusterData = take_field(&mut body, "data")?;
        Ok(data.clusters)
    }

    pub async fn sentiment(&self) -> Result<Sentiment, ApiError> {
        let mut body = self.get("/api/analytics/sentiment", SUCCESS).await?;
        take_field(&mut body, "data")
    }

    pub async fn timeseries(&self) -> Result<Vec<TimePoint>, ApiError> {
        let mut body = self.get("/api/analytics/timeseries", SUCCESS).await?;
        take_field(&mut body, "data")
    }

    pub async fn status(&self) -> Result<BackendStatus, ApiError> {
        let body = self.get("/api/status", HEALTHY).await?;
        Ok(serde_json::from_value(Value::Object(body))?)
    }

    pub async fn ingest(&self, path: &str) -> Result<IngestReport, ApiError> {
        let mut body = self.post("/api/ingest", &json!({ "path": path }), SUCCESS).await?;
        Ok(IngestReport {
            stats: body.remove("stats"),
        })
    }

    /// Reconfigure the pipeline; returns the config the backend reports back
    pub async fn update_config(&self, config: &PipelineConfig) -> Result<PipelineConfig, ApiError> {
        let mut body = self.post("/api/config", config, SUCCESS).await?;
        match body.remove("config") {
            Some(Value::Null) | None => Ok(config.clone()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    async fn get(&self, path: &str, accepted: &str) -> Result<Map<String, Value>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        read_envelope(response, accepted).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        accepted: &str,
    ) -> Result<Map<String, Value>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        read_envelope(response, accepted).await
    }
}

/// Decode the `{status, message, ...}` envelope. Only a `status` equal to
/// `accepted` is a success; any other value is a rejection.
///
/// The HTTP status code is not consulted: the backend reports failures with
/// 4xx/5xx codes *and* an error envelope, and the envelope decides.
async fn read_envelope(response: Response, accepted: &str) -> Result<Map<String, Value>, ApiError> {
    let code = response.status();
    let bytes = response.bytes().await?;
    let value: Value = serde_json::from_slice(&bytes)?;
    let Value::Object(body) = value else {
        return Err(ApiError::Malformed(format!("expected a JSON object (HTTP {})", code)));
    };

    let status = body.get("status").and_then(Value::as_str);
    if status == Some(accepted) {
        return Ok(body);
    }

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    tracing::debug!(%code, ?status, %message, "backend rejected request");
    Err(ApiError::Rejected { message })
}

fn take_field<T: DeserializeOwned>(body: &mut Map<String, Value>, key: &str) -> Result<T, ApiError> {
    let value = body
        .remove(key)
        .ok_or_else(|| ApiError::Malformed(format!("missing `{}` field", key)))?;
    Ok(serde_json::from_value(value)?)
}
