//! HTTP seam between the ML client and the scoring service.
//!
//! Deadlines are not applied here. The client wraps each call in its own
//! timeout so that an expired call is dropped (and its request aborted).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// JSON-over-HTTP transport used by [`MlPredictionClient`](super::MlPredictionClient).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON and return the decoded JSON response.
    ///
    /// Non-2xx responses are errors.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError>;

    /// GET `url` and succeed only on a 2xx status.
    async fn probe(&self, url: &str) -> Result<(), TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Self::ensure_success(response)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn probe(&self, url: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Self::ensure_success(response).await.map(|_| ())
    }
}
