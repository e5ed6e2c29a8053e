//! The `ml` origin: the scoring service seen as one more prediction source.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{MatchInfo, PredictionSource};
use crate::error::SourceResult;
use crate::ml_client::{FallbackReason, MlPredictionClient, PredictionOutcome};
use crate::types::{ConfidenceScale, Origin, PredictionRequest, SourcedPrediction};

/// Scores each fixture with [`MlPredictionClient`].
///
/// Rule-based fallbacks are reported as `ml` sources flagged with
/// `fallback: true`. A cancelled call reports nothing.
pub struct MlSource {
    client: Arc<MlPredictionClient>,
    default_features: Option<Vec<f64>>,
    scale: ConfidenceScale,
}

impl MlSource {
    pub fn new(client: Arc<MlPredictionClient>, default_features: Option<Vec<f64>>) -> Self {
        let scale = client.config().confidence_scale;
        Self {
            client,
            default_features,
            scale,
        }
    }

    /// Request for `fixture`, or `None` if no features are available.
    pub fn request_for(&self, fixture: &MatchInfo) -> Option<PredictionRequest> {
        let features = fixture
            .features
            .clone()
            .filter(|f| !f.is_empty())
            .or_else(|| self.default_features.clone())?;
        Some(PredictionRequest::new(
            fixture.home_team.clone(),
            fixture.away_team.clone(),
            features,
        ))
    }
}

#[async_trait]
impl PredictionSource for MlSource {
    fn origin(&self) -> Origin {
        Origin::Ml
    }

    async fn fetch(
        &self,
        fixture: &MatchInfo,
        cancel: &CancellationToken,
    ) -> SourceResult<Option<SourcedPrediction>> {
        let Some(request) = self.request_for(fixture) else {
            debug!(match_id = %fixture.match_id, "No features for fixture, skipping ml");
            return Ok(None);
        };

        let sourced = match self.client.predict_match_with_cancel(&request, cancel).await {
            PredictionOutcome::Success(result) => {
                SourcedPrediction::from_result(Origin::Ml, &result, self.scale)
            }
            PredictionOutcome::Fallback {
                reason: FallbackReason::Cancelled,
                ..
            } => return Ok(None),
            PredictionOutcome::Fallback { result, .. } => {
                SourcedPrediction::from_result(Origin::Ml, &result, ConfidenceScale::Fraction)
                    .as_fallback()
            }
        };
        Ok(Some(sourced))
    }
}
