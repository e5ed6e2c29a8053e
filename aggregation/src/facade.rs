//! Single entry point over the ML client and the source aggregator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::ml_client::{MlPredictionClient, PredictionOutcome, ServiceStatus};
use crate::sources::SourceAggregator;
use crate::types::{AggregatedPrediction, PredictionRequest};

/// Snapshot of one aggregation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub with_consensus: usize,
    pub predictions: Vec<AggregatedPrediction>,
}

impl AggregationReport {
    pub fn new(predictions: Vec<AggregatedPrediction>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            total: predictions.len(),
            with_consensus: predictions.iter().filter(|p| p.consensus.is_some()).count(),
            predictions,
        }
    }
}

pub struct AggregationFacade {
    client: Arc<MlPredictionClient>,
    aggregator: SourceAggregator,
}

impl AggregationFacade {
    pub fn new(client: Arc<MlPredictionClient>, aggregator: SourceAggregator) -> Self {
        Self { client, aggregator }
    }

    pub fn client(&self) -> &Arc<MlPredictionClient> {
        &self.client
    }

    /// Aggregated predictions, at most `limit` (default from the aggregator
    /// config), in discovery order.
    pub async fn aggregate_predictions(&self, limit: Option<usize>) -> Vec<AggregatedPrediction> {
        self.aggregate_predictions_with_cancel(limit, &CancellationToken::new())
            .await
    }

    pub async fn aggregate_predictions_with_cancel(
        &self,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Vec<AggregatedPrediction> {
        let limit = limit.unwrap_or(self.aggregator.config().default_limit);
        let mut predictions = self
            .aggregator
            .aggregate_predictions_with_cancel(limit, cancel)
            .await;
        predictions.truncate(limit);
        predictions
    }

    /// Aggregate and wrap the run in an [`AggregationReport`].
    pub async fn report(
        &self,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> AggregationReport {
        AggregationReport::new(self.aggregate_predictions_with_cancel(limit, cancel).await)
    }

    pub async fn predict_match(&self, request: &PredictionRequest) -> PredictionOutcome {
        self.client.predict_match(request).await
    }

    pub async fn batch_predict(&self, requests: &[PredictionRequest]) -> Vec<PredictionOutcome> {
        self.client.batch_predict(requests).await
    }

    pub async fn health(&self) -> ServiceStatus {
        self.client.health().await
    }
}
