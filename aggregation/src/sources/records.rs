//! Stored and scraped prediction records.
//!
//! Both origins report confidence as a percentage and often name the winning
//! team instead of the side; labels are normalized against the fixture's team
//! names before they reach consensus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MatchInfo;
use crate::types::{MatchOutcome, Origin, SourcedPrediction};

/// Confidence given to scraped matches that report none.
pub const DEFAULT_SCRAPER_CONFIDENCE: f64 = 65.0;

/// A prediction persisted by the prediction store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPrediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
    /// Storage identifier, used when `match_id` is absent.
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    /// Team name or side. Blank records carry no prediction.
    #[serde(default, alias = "prediction", skip_serializing_if = "Option::is_none")]
    pub predicted_winner: Option<String>,
    /// Percentage. Missing or null means 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
}

impl StoredPrediction {
    pub fn to_match_info(&self) -> MatchInfo {
        MatchInfo {
            match_id: self
                .match_id
                .clone()
                .or_else(|| self.id.clone())
                .unwrap_or_default(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            match_date: self.match_date,
            league: self.league.clone(),
            features: None,
        }
    }

    /// `None` when the record names no winner.
    pub fn to_sourced(&self) -> Option<SourcedPrediction> {
        let label = non_blank(self.predicted_winner.as_deref())?;
        let outcome = MatchOutcome::parse(label).resolve_teams(&self.home_team, &self.away_team);
        let confidence = self.confidence.filter(|c| c.is_finite()).unwrap_or(0.0);
        Some(SourcedPrediction::new(Origin::Database, outcome, confidence))
    }
}

/// An upcoming match reported by the odds scraper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    /// Team name or side. Missing or blank means the home team.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    /// Percentage. Missing or zero means [`DEFAULT_SCRAPER_CONFIDENCE`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds: Option<f64>,
    #[serde(default, alias = "matchDate", skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
}

impl ScrapedMatch {
    /// Fixture for this record. Records without an id get `scraper-<uuid>`.
    pub fn to_match_info(&self) -> MatchInfo {
        MatchInfo {
            match_id: self
                .id
                .clone()
                .unwrap_or_else(|| format!("scraper-{}", Uuid::new_v4())),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            match_date: self.date,
            league: self.league.clone(),
            features: None,
        }
    }

    pub fn to_sourced(&self) -> SourcedPrediction {
        let label = non_blank(self.prediction.as_deref()).unwrap_or(&self.home_team);
        let outcome = MatchOutcome::parse(label).resolve_teams(&self.home_team, &self.away_team);
        let confidence = self
            .confidence
            .filter(|c| c.is_finite() && *c != 0.0)
            .unwrap_or(DEFAULT_SCRAPER_CONFIDENCE);
        SourcedPrediction::new(Origin::Scraper, outcome, confidence).with_odds(self.odds)
    }
}

fn non_blank(label: Option<&str>) -> Option<&str> {
    label.filter(|l| !l.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stored_prediction_defaults() {
        let record: StoredPrediction = serde_json::from_value(json!({
            "_id": "652f",
            "homeTeam": "Arsenal",
            "awayTeam": "Chelsea",
            "predictedWinner": "Chelsea"
        }))
        .unwrap();

        let fixture = record.to_match_info();
        assert_eq!(fixture.match_id, "652f");
        assert_eq!(fixture.key(), "Arsenal-Chelsea");

        let sourced = record.to_sourced().unwrap();
        assert_eq!(sourced.origin, Origin::Database);
        assert_eq!(sourced.prediction, MatchOutcome::Away);
        assert_eq!(sourced.confidence, 0.0);
    }

    #[test]
    fn test_stored_prediction_prefers_match_id() {
        let record: StoredPrediction = serde_json::from_value(json!({
            "matchId": "m-1",
            "_id": "652f",
            "homeTeam": "A",
            "awayTeam": "B",
            "prediction": "draw",
            "confidence": 58
        }))
        .unwrap();
        assert_eq!(record.to_match_info().match_id, "m-1");
        let sourced = record.to_sourced().unwrap();
        assert_eq!(sourced.prediction, MatchOutcome::Draw);
        assert_eq!(sourced.confidence, 58.0);
    }

    #[test]
    fn test_scraped_match_defaults_to_home_team() {
        let record: ScrapedMatch = serde_json::from_value(json!({
            "homeTeam": "Lyon",
            "awayTeam": "Nice",
            "odds": 1.85,
            "date": "2026-03-14T20:00:00Z",
            "league": "Ligue 1"
        }))
        .unwrap();

        let sourced = record.to_sourced();
        assert_eq!(sourced.prediction, MatchOutcome::Home);
        assert_eq!(sourced.confidence, 65.0);
        assert_eq!(sourced.odds, Some(1.85));

        let fixture = record.to_match_info();
        assert!(fixture.match_id.starts_with("scraper-"));
        assert_eq!(fixture.league.as_deref(), Some("Ligue 1"));
        assert!(fixture.match_date.is_some());
    }

    #[test]
    fn test_scraped_match_generated_ids_are_unique() {
        let record = ScrapedMatch {
            id: None,
            home_team: "A".to_string(),
            away_team: "B".to_string(),
            prediction: None,
            confidence: None,
            odds: None,
            date: None,
            league: None,
        };
        assert_ne!(record.to_match_info().match_id, record.to_match_info().match_id);
    }

    #[test]
    fn test_scraped_match_explicit_prediction() {
        let record: ScrapedMatch = serde_json::from_value(json!({
            "id": "s-9",
            "homeTeam": "Lyon",
            "awayTeam": "Nice",
            "prediction": "nice",
            "confidence": 71
        }))
        .unwrap();
        let sourced = record.to_sourced();
        assert_eq!(sourced.prediction, MatchOutcome::Away);
        assert_eq!(sourced.confidence, 71.0);
        assert_eq!(record.to_match_info().match_id, "s-9");
    }

    #[test]
    fn test_stored_prediction_null_confidence_is_zero() {
        let record: StoredPrediction = serde_json::from_value(json!({
            "homeTeam": "A",
            "awayTeam": "B",
            "predictedWinner": "home",
            "confidence": null
        }))
        .unwrap();
        let sourced = record.to_sourced().unwrap();
        assert_eq!(sourced.prediction, MatchOutcome::Home);
        assert_eq!(sourced.confidence, 0.0);
    }

    #[test]
    fn test_stored_prediction_without_winner_is_skipped() {
        for winner in [json!(""), json!("   "), json!(null)] {
            let record: StoredPrediction = serde_json::from_value(json!({
                "homeTeam": "Lyon",
                "awayTeam": "Nice",
                "predictedWinner": winner,
                "confidence": 80
            }))
            .unwrap();
            assert!(record.to_sourced().is_none(), "winner {winner}");
        }
    }

    #[test]
    fn test_scraped_match_blank_values_take_defaults() {
        let record: ScrapedMatch = serde_json::from_value(json!({
            "homeTeam": "Lyon",
            "awayTeam": "Nice",
            "prediction": "",
            "confidence": 0
        }))
        .unwrap();
        let sourced = record.to_sourced();
        assert_eq!(sourced.prediction, MatchOutcome::Home);
        assert_eq!(sourced.confidence, 65.0);

        let record: ScrapedMatch = serde_json::from_value(json!({
            "homeTeam": "Lyon",
            "awayTeam": "Nice",
            "prediction": "  ",
            "confidence": null
        }))
        .unwrap();
        let sourced = record.to_sourced();
        assert_eq!(sourced.prediction, MatchOutcome::Home);
        assert_eq!(sourced.confidence, 65.0);
    }
}
