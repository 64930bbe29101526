//! HTTP vision-language backend.

use super::{TierBackend, TierError, TierRequest};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A tier reached by POSTing a JSON request to an endpoint.
///
/// Request body:
///
/// ```json
/// { "model": "…", "prompt": "…", "image": "<base64>", "mime_type": "image/jpeg" }
/// ```
///
/// The response must be a JSON object with a `text` (or `response` /
/// `output`) string field.
pub struct HttpTierBackend {
    name: String,
    endpoint: String,
    model: Option<String>,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct AnalysisRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
}

#[derive(Deserialize)]
struct AnalysisResponse {
    #[serde(alias = "response", alias = "output")]
    text: String,
}

impl HttpTierBackend {
    /// Creates an HTTP tier.
    #[must_use]
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            model: None,
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Sets the model identifier sent with each request.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn body<'a>(&'a self, request: &'a TierRequest) -> AnalysisRequest<'a> {
        let has_image = !request.frame.is_empty();
        AnalysisRequest {
            model: self.model.as_deref(),
            prompt: &request.query,
            image: has_image.then(|| STANDARD.encode(&request.frame.data)),
            mime_type: has_image.then_some(request.frame.mime_type),
        }
    }
}

/// Maps a non-success status to a tier error.
fn classify_status(status: StatusCode, body: &str) -> TierError {
    let detail = format!("{status}: {}", body.chars().take(200).collect::<String>());
    match status {
        StatusCode::TOO_MANY_REQUESTS => TierError::QuotaExceeded(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TierError::Unauthorized(detail),
        _ => TierError::Transport(detail),
    }
}

fn classify_error(err: &reqwest::Error, timeout: Duration) -> TierError {
    if err.is_timeout() {
        TierError::Timeout(timeout)
    } else {
        TierError::Transport(err.to_string())
    }
}

#[async_trait]
impl TierBackend for HttpTierBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: &TierRequest, timeout: Duration) -> Result<String, TierError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .header("X-Request-Id", &request.request_id)
            .json(&self.body(request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(tier = %self.name, %status, "Tier returned error status");
            return Err(classify_status(status, &body));
        }

        let parsed: AnalysisResponse = response
            .json()
            .await
            .map_err(|e| TierError::Transport(format!("malformed response: {e}")))?;
        Ok(parsed.text)
    }
}
