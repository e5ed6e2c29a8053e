//! JSON fixture file backing the match catalog and the scraper/database
//! origins.
//!
//! ```json
//! {
//!   "matches":  [ { "matchId": "...", "homeTeam": "...", "awayTeam": "...", "features": [..] } ],
//!   "database": [ { "matchId": "...", "homeTeam": "...", "awayTeam": "...", "predictedWinner": "...", "confidence": 62 } ],
//!   "scraper":  [ { "id": "...", "homeTeam": "...", "awayTeam": "...", "prediction": "...", "odds": 1.9 } ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use aggregation::sources::match_key;
use aggregation::{
    MatchCatalog, MatchInfo, Origin, PredictionSource, ScrapedMatch, SourceResult,
    SourcedPrediction, StoredPrediction,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureFile {
    #[serde(default)]
    pub matches: Vec<MatchInfo>,
    #[serde(default)]
    pub database: Vec<StoredPrediction>,
    #[serde(default)]
    pub scraper: Vec<ScrapedMatch>,
}

impl FixtureFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixtures {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid fixtures in {}", path.display()))
    }

    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse fixtures JSON")
    }

    /// Fixtures in discovery order: explicit matches, then stored predictions,
    /// then scraped matches not already listed.
    pub fn discover(&self) -> Vec<MatchInfo> {
        let mut seen = HashSet::new();
        let explicit = self.matches.iter().cloned();
        let stored = self.database.iter().map(StoredPrediction::to_match_info);
        let scraped = self.scraper.iter().map(ScrapedMatch::to_match_info);

        explicit
            .chain(stored)
            .chain(scraped)
            .filter(|fixture| seen.insert(fixture.key()))
            .collect()
    }

    fn stored_for(&self, fixture: &MatchInfo) -> Option<&StoredPrediction> {
        let key = fixture.key();
        self.database.iter().find(|record| {
            record.match_id.as_deref() == Some(fixture.match_id.as_str())
                || match_key(&record.home_team, &record.away_team) == key
        })
    }

    fn scraped_for(&self, fixture: &MatchInfo) -> Option<&ScrapedMatch> {
        let key = fixture.key();
        self.scraper.iter().find(|record| {
            record.id.as_deref() == Some(fixture.match_id.as_str())
                || match_key(&record.home_team, &record.away_team) == key
        })
    }
}

/// [`MatchCatalog`] over a [`FixtureFile`].
pub struct FixtureCatalog {
    fixtures: Arc<FixtureFile>,
}

impl FixtureCatalog {
    pub fn new(fixtures: Arc<FixtureFile>) -> Self {
        Self { fixtures }
    }
}

#[async_trait]
impl MatchCatalog for FixtureCatalog {
    async fn list_matches(&self, limit: usize) -> SourceResult<Vec<MatchInfo>> {
        let mut fixtures = self.fixtures.discover();
        fixtures.truncate(limit);
        debug!(count = fixtures.len(), limit, "Listed fixtures");
        Ok(fixtures)
    }
}

/// The `database` origin, served from stored prediction records.
pub struct DatabaseSource {
    fixtures: Arc<FixtureFile>,
}

impl DatabaseSource {
    pub fn new(fixtures: Arc<FixtureFile>) -> Self {
        Self { fixtures }
    }
}

#[async_trait]
impl PredictionSource for DatabaseSource {
    fn origin(&self) -> Origin {
        Origin::Database
    }

    async fn fetch(
        &self,
        fixture: &MatchInfo,
        _cancel: &CancellationToken,
    ) -> SourceResult<Option<SourcedPrediction>> {
        Ok(self
            .fixtures
            .stored_for(fixture)
            .and_then(StoredPrediction::to_sourced))
    }
}

/// The `scraper` origin, served from scraped match records.
pub struct ScraperSource {
    fixtures: Arc<FixtureFile>,
}

impl ScraperSource {
    pub fn new(fixtures: Arc<FixtureFile>) -> Self {
        Self { fixtures }
    }
}

#[async_trait]
impl PredictionSource for ScraperSource {
    fn origin(&self) -> Origin {
        Origin::Scraper
    }

    async fn fetch(
        &self,
        fixture: &MatchInfo,
        _cancel: &CancellationToken,
    ) -> SourceResult<Option<SourcedPrediction>> {
        Ok(self
            .fixtures
            .scraped_for(fixture)
            .map(ScrapedMatch::to_sourced))
    }
}
