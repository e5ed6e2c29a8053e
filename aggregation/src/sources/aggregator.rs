//! Per-match fan-out across origins.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{MatchCatalog, MatchInfo, PredictionSource};
use crate::config::AggregatorConfig;
use crate::consensus::ConsensusResolver;
use crate::types::{AggregatedPrediction, SourceMap};

/// Builds [`AggregatedPrediction`]s for the fixtures a catalog lists.
///
/// Every origin is queried independently. A failing origin only drops its
/// own key; the match is still returned.
pub struct SourceAggregator {
    catalog: Arc<dyn MatchCatalog>,
    sources: Vec<Arc<dyn PredictionSource>>,
    resolver: ConsensusResolver,
    config: AggregatorConfig,
}

impl SourceAggregator {
    pub fn new(catalog: Arc<dyn MatchCatalog>, config: AggregatorConfig) -> Self {
        Self {
            catalog,
            sources: Vec::new(),
            resolver: ConsensusResolver::new(),
            config,
        }
    }

    /// Register an origin adapter, replacing any adapter for the same origin.
    pub fn with_source(mut self, source: Arc<dyn PredictionSource>) -> Self {
        let origin = source.origin();
        self.sources.retain(|existing| existing.origin() != origin);
        self.sources.push(source);
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub async fn aggregate_predictions(&self, limit: usize) -> Vec<AggregatedPrediction> {
        self.aggregate_predictions_with_cancel(limit, &CancellationToken::new())
            .await
    }

    /// Aggregate up to `limit` fixtures, in catalog order.
    ///
    /// A failing catalog yields an empty list.
    pub async fn aggregate_predictions_with_cancel(
        &self,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Vec<AggregatedPrediction> {
        if limit == 0 {
            return Vec::new();
        }

        let start = Instant::now();
        let fixtures = match self.catalog.list_matches(limit).await {
            Ok(fixtures) => dedupe(fixtures, limit),
            Err(e) => {
                warn!(error = %e, "Match catalog failed, returning no predictions");
                return Vec::new();
            }
        };

        let concurrency = self.config.max_concurrent_matches.max(1);
        let aggregated: Vec<AggregatedPrediction> = stream::iter(fixtures.iter())
            .map(|fixture| self.aggregate_match(fixture, cancel))
            .buffered(concurrency)
            .collect()
            .await;

        info!(
            matches = aggregated.len(),
            with_consensus = aggregated.iter().filter(|a| a.consensus.is_some()).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Aggregated predictions"
        );
        aggregated
    }

    /// Query every origin for `fixture` concurrently and resolve consensus.
    pub async fn aggregate_match(
        &self,
        fixture: &MatchInfo,
        cancel: &CancellationToken,
    ) -> AggregatedPrediction {
        let lookups = self.sources.iter().map(|source| async move {
            let origin = source.origin();
            match source.fetch(fixture, cancel).await {
                Ok(Some(mut prediction)) => {
                    prediction.origin = origin;
                    Some(prediction)
                }
                Ok(None) => {
                    debug!(match_id = %fixture.match_id, %origin, "Origin has no prediction");
                    None
                }
                Err(e) => {
                    warn!(match_id = %fixture.match_id, %origin, error = %e, "Origin lookup failed");
                    None
                }
            }
        });

        let sources: SourceMap = futures::future::join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .collect();
        let consensus = self.resolver.resolve(&sources);

        AggregatedPrediction {
            match_id: fixture.match_id.clone(),
            home_team: fixture.home_team.clone(),
            away_team: fixture.away_team.clone(),
            sources,
            consensus,
            match_date: fixture.match_date,
            league: fixture.league.clone(),
        }
    }
}

/// Drop repeated `home-away` keys (first wins) and cap at `limit`.
fn dedupe(fixtures: Vec<MatchInfo>, limit: usize) -> Vec<MatchInfo> {
    let mut seen = HashSet::new();
    fixtures
        .into_iter()
        .filter(|fixture| seen.insert(fixture.key()))
        .take(limit)
        .collect()
}
