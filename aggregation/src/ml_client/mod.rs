//! Remote prediction client for the external ML scoring service.
//!
//! Every call gets a deadline, linear-backoff retries and, when the service
//! cannot be used, a rule-based fallback. Errors never leave this module:
//! callers receive a [`PredictionOutcome`] that says whether the answer is
//! genuine.
//!
//! # Usage
//!
//! ```rust,ignore
//! use aggregation::config::MlClientConfig;
//! use aggregation::ml_client::MlPredictionClient;
//! use aggregation::types::PredictionRequest;
//!
//! let client = MlPredictionClient::new(MlClientConfig::from_env()?)?;
//! let outcome = client
//!     .predict_match(&PredictionRequest::new("A", "B", vec![2.0, 1.0]))
//!     .await;
//! if outcome.is_fallback() {
//!     tracing::warn!("serving rule-based prediction");
//! }
//! ```

pub mod outcome;
pub mod response;
pub mod retry;
pub mod transport;

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::PredictionCache;
use crate::config::{MlClientConfig, DEFAULT_CACHE_CAPACITY};
use crate::error::TransportError;
use crate::types::PredictionRequest;

pub use outcome::{
    rule_based_prediction, FallbackReason, PredictionOutcome, FALLBACK_CONFIDENCE,
    FALLBACK_MODEL_VERSION,
};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Transport};

/// Reachability of the scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Online,
    Offline,
}

/// Client for `POST /predict`, `POST /predict/batch` and `GET /health`.
pub struct MlPredictionClient {
    config: MlClientConfig,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    cache: Option<Arc<PredictionCache>>,
}

impl MlPredictionClient {
    /// Client over HTTP. Attaches a cache when `config.cache_ttl` is set.
    pub fn new(config: MlClientConfig) -> Result<Self, TransportError> {
        let transport = Arc::new(HttpTransport::new()?);
        let cache = config
            .cache_ttl
            .map(|ttl| Arc::new(PredictionCache::new(ttl, DEFAULT_CACHE_CAPACITY)));

        let mut client = Self::with_transport(config, transport);
        client.cache = cache;
        Ok(client)
    }

    /// Client over an arbitrary transport, without a cache.
    pub fn with_transport(config: MlClientConfig, transport: Arc<dyn Transport>) -> Self {
        let retry = RetryPolicy {
            max_attempts: config.max_attempts,
            backoff_step: config.backoff_step,
            timeout: config.timeout,
        };
        Self {
            config,
            transport,
            retry,
            cache: None,
        }
    }

    /// Use `cache` for single and batch predictions.
    pub fn with_cache(mut self, cache: Arc<PredictionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &MlClientConfig {
        &self.config
    }

    pub async fn predict_match(&self, request: &PredictionRequest) -> PredictionOutcome {
        self.predict_match_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Predict one match. Never fails; see [`PredictionOutcome`].
    pub async fn predict_match_with_cancel(
        &self,
        request: &PredictionRequest,
        cancel: &CancellationToken,
    ) -> PredictionOutcome {
        if let Err(e) = request.validate() {
            warn!(error = %e, "Rejecting prediction request");
            return PredictionOutcome::fallback(
                request,
                FallbackReason::InvalidRequest {
                    detail: e.to_string(),
                },
            );
        }

        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(request)) {
            debug!(home = %request.home_team, away = %request.away_team, "Prediction cache hit");
            return PredictionOutcome::Success(hit);
        }

        let url = self.config.endpoint("predict");
        let body = json!(request);
        let (url, body, transport) = (&url, &body, &self.transport);

        let attempt = move || async move {
            let raw = transport.post_json(url, body).await?;
            response::parse_single(raw)
        };

        match self.retry.run("predict", cancel, attempt).await {
            Ok(result) => {
                if let Some(cache) = &self.cache {
                    cache.insert(request, result.clone());
                }
                PredictionOutcome::Success(result)
            }
            Err(reason) => {
                warn!(
                    home = %request.home_team,
                    away = %request.away_team,
                    %reason,
                    "ML service failed, falling back to rule-based prediction"
                );
                PredictionOutcome::fallback(request, reason)
            }
        }
    }

    pub async fn batch_predict(&self, requests: &[PredictionRequest]) -> Vec<PredictionOutcome> {
        self.batch_predict_with_cancel(requests, &CancellationToken::new())
            .await
    }

    /// Predict many matches with a single batch call.
    ///
    /// The output has one entry per input, in input order. Retries apply to
    /// the batch call as a whole; if it fails, every item falls back on its
    /// own. Requests that fail validation fall back without being sent.
    pub async fn batch_predict_with_cancel(
        &self,
        requests: &[PredictionRequest],
        cancel: &CancellationToken,
    ) -> Vec<PredictionOutcome> {
        let mut outcomes: Vec<Option<PredictionOutcome>> = vec![None; requests.len()];
        let mut pending: Vec<usize> = Vec::new();

        for (index, request) in requests.iter().enumerate() {
            if let Err(e) = request.validate() {
                outcomes[index] = Some(PredictionOutcome::fallback(
                    request,
                    FallbackReason::InvalidRequest {
                        detail: e.to_string(),
                    },
                ));
            } else if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(request)) {
                outcomes[index] = Some(PredictionOutcome::Success(hit));
            } else {
                pending.push(index);
            }
        }

        if !pending.is_empty() {
            let batch: Vec<&PredictionRequest> = pending.iter().map(|&i| &requests[i]).collect();
            let url = self.config.endpoint("predict/batch");
            let body = json!({ "predictions": batch });
            let expected = batch.len();
            let (url, body, transport) = (&url, &body, &self.transport);

            let attempt = move || async move {
                let raw = transport.post_json(url, body).await?;
                response::parse_batch(raw, expected)
            };

            match self.retry.run("predict/batch", cancel, attempt).await {
                Ok(results) => {
                    info!(count = results.len(), "Batch prediction succeeded");
                    for (&index, result) in pending.iter().zip(results) {
                        if let Some(cache) = &self.cache {
                            cache.insert(&requests[index], result.clone());
                        }
                        outcomes[index] = Some(PredictionOutcome::Success(result));
                    }
                }
                Err(reason) => {
                    warn!(
                        count = pending.len(),
                        %reason,
                        "Batch ML service failed, using rule-based fallback"
                    );
                    for &index in &pending {
                        outcomes[index] = Some(PredictionOutcome::fallback(
                            &requests[index],
                            reason.clone(),
                        ));
                    }
                }
            }
        }

        outcomes
            .into_iter()
            .zip(requests)
            .map(|(outcome, request)| {
                outcome.unwrap_or_else(|| {
                    PredictionOutcome::fallback(request, FallbackReason::Disabled)
                })
            })
            .collect()
    }

    /// Probe `GET /health` with the health deadline. Never fails.
    pub async fn health(&self) -> ServiceStatus {
        let url = self.config.endpoint("health");
        match tokio::time::timeout(self.config.health_timeout, self.transport.probe(&url)).await {
            Ok(Ok(())) => ServiceStatus::Online,
            Ok(Err(e)) => {
                debug!(error = %e, "ML service health check failed");
                ServiceStatus::Offline
            }
            Err(_) => {
                debug!(timeout = ?self.config.health_timeout, "ML service health check timed out");
                ServiceStatus::Offline
            }
        }
    }
}
