//! Origin adapters and the per-match source aggregator.
//!
//! ```text
//! MatchCatalog::list_matches(limit)      discovery, deduplicated by home-away
//!        │
//!        ▼  (bounded concurrency, order preserved)
//! ┌─────────────── per match ───────────────┐
//! │ MlSource │ scraper adapter │ db adapter │  fan-out, errors → key omitted
//! └──────────────────┬──────────────────────┘
//!                    ▼
//!        ConsensusResolver::resolve(sources)
//! ```

pub mod aggregator;
pub mod ml;
pub mod records;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::SourceResult;
use crate::types::{Origin, SourcedPrediction};

pub use aggregator::SourceAggregator;
pub use ml::MlSource;
pub use records::{ScrapedMatch, StoredPrediction};

/// A fixture to aggregate predictions for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    /// Signals for the scoring service, if this fixture carries its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<f64>>,
}

impl MatchInfo {
    pub fn new(
        match_id: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            match_date: None,
            league: None,
            features: None,
        }
    }

    /// Deduplication key: `home-away`.
    pub fn key(&self) -> String {
        match_key(&self.home_team, &self.away_team)
    }
}

/// Key used to merge records from different origins for the same fixture.
pub fn match_key(home_team: &str, away_team: &str) -> String {
    format!("{}-{}", home_team.trim(), away_team.trim())
}

/// Lists the fixtures to aggregate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchCatalog: Send + Sync {
    /// At most `limit` fixtures, in discovery order.
    async fn list_matches(&self, limit: usize) -> SourceResult<Vec<MatchInfo>>;
}

/// One origin's view of a fixture.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PredictionSource: Send + Sync {
    fn origin(&self) -> Origin;

    /// This origin's prediction for `fixture`, or `None` if it has none.
    ///
    /// Confidence must be returned as a percentage.
    async fn fetch(
        &self,
        fixture: &MatchInfo,
        cancel: &CancellationToken,
    ) -> SourceResult<Option<SourcedPrediction>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_key() {
        let fixture = MatchInfo::new("m1", "Arsenal ", "Chelsea");
        assert_eq!(fixture.key(), "Arsenal-Chelsea");
        assert_eq!(match_key("A", "B"), "A-B");
    }

    #[test]
    fn test_match_info_wire_shape() {
        let json = serde_json::json!({
            "matchId": "m7",
            "homeTeam": "A",
            "awayTeam": "B",
            "matchDate": "2026-05-01T15:00:00Z",
            "features": [2.0, 1.0]
        });
        let fixture: MatchInfo = serde_json::from_value(json).unwrap();
        assert_eq!(fixture.match_id, "m7");
        assert_eq!(fixture.features, Some(vec![2.0, 1.0]));
        assert!(fixture.match_date.is_some());
        assert!(fixture.league.is_none());
    }
}
