//! Core prediction types shared by the ML client, the source aggregator and
//! the consensus resolver.
//!
//! Every value here is built fresh per request. Aggregation assembles new
//! objects instead of editing existing ones.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientResult, PredictionError};

/// Predicted result of a match.
///
/// Aggregated predictions use `home`, `draw` or `away`. Single calls against
/// the scoring service may return any label, which is kept as [`Other`].
///
/// [`Other`]: MatchOutcome::Other
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchOutcome {
    Home,
    Draw,
    Away,
    /// Free-form label that is not one of the three standard outcomes.
    Other(String),
}

impl MatchOutcome {
    /// Parse a label, case-insensitively for the standard outcomes.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "home" => Self::Home,
            "draw" => Self::Draw,
            "away" => Self::Away,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    /// Map a team-name label onto `home`/`away` for the given fixture.
    ///
    /// Scrapers and stored predictions often name the winning team instead of
    /// the side.
    pub fn resolve_teams(self, home_team: &str, away_team: &str) -> Self {
        match self {
            Self::Other(label) => {
                if label.eq_ignore_ascii_case(home_team.trim()) {
                    Self::Home
                } else if label.eq_ignore_ascii_case(away_team.trim()) {
                    Self::Away
                } else {
                    Self::Other(label)
                }
            }
            standard => standard,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Home => "home",
            Self::Draw => "draw",
            Self::Away => "away",
            Self::Other(label) => label,
        }
    }

    /// Whether this is one of `home`, `draw`, `away`.
    pub fn is_standard(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for MatchOutcome {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<MatchOutcome> for String {
    fn from(outcome: MatchOutcome) -> Self {
        outcome.as_str().to_string()
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome probabilities, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Probabilities {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self { home, draw, away }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    /// Divide every component by `divisor`.
    pub fn scaled_down(&self, divisor: f64) -> Self {
        Self::new(self.home / divisor, self.draw / divisor, self.away / divisor)
    }
}

/// Scale a producer reports confidence on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceScale {
    /// Values `<= 1.0` are fractions, larger values are percentages.
    #[default]
    Auto,
    /// `[0, 1]`.
    Fraction,
    /// `[0, 100]`.
    Percent,
}

impl ConfidenceScale {
    /// Convert a raw confidence on this scale into a percentage.
    pub fn to_percent(self, raw: f64) -> f64 {
        match self {
            Self::Fraction => raw * 100.0,
            Self::Percent => raw,
            Self::Auto if raw <= 1.0 => raw * 100.0,
            Self::Auto => raw,
        }
    }
}

impl FromStr for ConfidenceScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "fraction" => Ok(Self::Fraction),
            "percent" => Ok(Self::Percent),
            other => Err(format!("unknown confidence scale '{other}'")),
        }
    }
}

impl fmt::Display for ConfidenceScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fraction => write!(f, "fraction"),
            Self::Percent => write!(f, "percent"),
        }
    }
}

/// Request body for the scoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub home_team: String,
    pub away_team: String,
    /// Opaque numeric signals, forwarded as-is.
    pub features: Vec<f64>,
}

impl PredictionRequest {
    pub fn new(home_team: impl Into<String>, away_team: impl Into<String>, features: Vec<f64>) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            features,
        }
    }

    /// Check the request before it goes on the wire.
    pub fn validate(&self) -> ClientResult<()> {
        if self.features.is_empty() {
            return Err(PredictionError::InvalidRequest(format!(
                "{} vs {}: features must not be empty",
                self.home_team, self.away_team
            )));
        }
        Ok(())
    }
}

/// A single prediction as produced by the scoring service or the rule-based
/// fallback. `confidence` is reported on the producer's own scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "prediction")]
    pub outcome: MatchOutcome,
    pub confidence: f64,
    #[serde(alias = "modelVersion")]
    pub model_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Probabilities>,
}

/// Producer of a per-match prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Ml,
    Scraper,
    Database,
}

impl Origin {
    /// All origins in consensus scan order.
    pub const PRIORITY: [Origin; 3] = [Origin::Ml, Origin::Scraper, Origin::Database];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ml => "ml",
            Self::Scraper => "scraper",
            Self::Database => "database",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prediction tagged with its origin. `confidence` is always a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcedPrediction {
    pub origin: Origin,
    pub prediction: MatchOutcome,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Probabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Set when the prediction is a rule-based substitute for the ML service.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl SourcedPrediction {
    /// Build from an already-normalized percentage confidence.
    pub fn new(origin: Origin, prediction: MatchOutcome, confidence_percent: f64) -> Self {
        Self {
            origin,
            prediction,
            confidence: confidence_percent,
            probabilities: None,
            odds: None,
            model_version: None,
            fallback: false,
        }
    }

    /// Tag a service result, normalizing its confidence from `scale`.
    pub fn from_result(origin: Origin, result: &PredictionResult, scale: ConfidenceScale) -> Self {
        Self {
            origin,
            prediction: result.outcome.clone(),
            confidence: scale.to_percent(result.confidence),
            probabilities: result.probabilities,
            odds: None,
            model_version: Some(result.model_version.clone()),
            fallback: false,
        }
    }

    pub fn with_odds(mut self, odds: Option<f64>) -> Self {
        self.odds = odds;
        self
    }

    pub fn as_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }
}

/// Per-origin predictions for one match. Each origin contributes at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml: Option<SourcedPrediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraper: Option<SourcedPrediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<SourcedPrediction>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `prediction` under its origin, returning whatever it replaced.
    pub fn insert(&mut self, prediction: SourcedPrediction) -> Option<SourcedPrediction> {
        let slot = match prediction.origin {
            Origin::Ml => &mut self.ml,
            Origin::Scraper => &mut self.scraper,
            Origin::Database => &mut self.database,
        };
        slot.replace(prediction)
    }

    pub fn get(&self, origin: Origin) -> Option<&SourcedPrediction> {
        match origin {
            Origin::Ml => self.ml.as_ref(),
            Origin::Scraper => self.scraper.as_ref(),
            Origin::Database => self.database.as_ref(),
        }
    }

    /// Present predictions in scan order: ml, scraper, database.
    pub fn iter(&self) -> impl Iterator<Item = &SourcedPrediction> {
        Origin::PRIORITY
            .into_iter()
            .filter_map(move |origin| self.get(origin))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.ml.is_none() && self.scraper.is_none() && self.database.is_none()
    }
}

impl FromIterator<SourcedPrediction> for SourceMap {
    fn from_iter<I: IntoIterator<Item = SourcedPrediction>>(iter: I) -> Self {
        let mut map = Self::new();
        for prediction in iter {
            map.insert(prediction);
        }
        map
    }
}

/// Reconciled prediction across all present origins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub prediction: MatchOutcome,
    /// Mean confidence of every source, rounded percentage.
    pub average_confidence: u32,
    /// Share of sources backing `prediction`, rounded percentage.
    pub agreement: u32,
}

/// Everything known about one match after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPrediction {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub sources: SourceMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
}
