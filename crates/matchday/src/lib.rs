//! Command-line front end for the match prediction aggregator.
//!
//! Wires [`AppConfig`](config::AppConfig), the JSON fixture adapters and the
//! `aggregation` library together. [`run`] executes one parsed command and
//! returns the JSON document the binary prints.

pub mod cli;
pub mod config;
pub mod fixtures;

use std::path::Path;
use std::sync::Arc;

use aggregation::{
    AggregationFacade, MlPredictionClient, MlSource, PredictionRequest, SourceAggregator,
};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::Command;
use crate::config::AppConfig;
use crate::fixtures::{DatabaseSource, FixtureCatalog, FixtureFile, ScraperSource};

/// Facade over `fixtures` with all three origins registered.
pub fn build_facade(
    client: Arc<MlPredictionClient>,
    config: &AppConfig,
    fixtures: Arc<FixtureFile>,
) -> AggregationFacade {
    let aggregator = SourceAggregator::new(
        Arc::new(FixtureCatalog::new(fixtures.clone())),
        config.aggregator.clone(),
    )
    .with_source(Arc::new(MlSource::new(
        client.clone(),
        config.aggregator.default_features.clone(),
    )))
    .with_source(Arc::new(ScraperSource::new(fixtures.clone())))
    .with_source(Arc::new(DatabaseSource::new(fixtures)));

    AggregationFacade::new(client, aggregator)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchInput {
    Bare(Vec<PredictionRequest>),
    Wrapped { predictions: Vec<PredictionRequest> },
}

/// Parse a batch input document.
pub fn parse_batch(json: &str) -> Result<Vec<PredictionRequest>> {
    let input: BatchInput = serde_json::from_str(json)
        .context("Batch input must be an array of requests or {\"predictions\": [...]}")?;
    Ok(match input {
        BatchInput::Bare(requests) => requests,
        BatchInput::Wrapped { predictions } => predictions,
    })
}

pub fn load_batch(path: &Path) -> Result<Vec<PredictionRequest>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch input {}", path.display()))?;
    parse_batch(&content)
}

/// Execute `command` and return its JSON output.
///
/// ML outages never fail a command; only local errors (unreadable or invalid
/// files) do.
pub async fn run(command: Command, config: &AppConfig, cancel: &CancellationToken) -> Result<Value> {
    let client = Arc::new(
        MlPredictionClient::new(config.ml.clone()).context("Failed to build HTTP client")?,
    );

    match command {
        Command::Predict {
            home,
            away,
            features,
        } => {
            if features.is_empty() {
                bail!("--features must contain at least one value");
            }
            let request = PredictionRequest::new(home, away, features);
            let outcome = client.predict_match_with_cancel(&request, cancel).await;
            Ok(serde_json::to_value(outcome)?)
        }
        Command::Batch { input } => {
            let requests = load_batch(&input)?;
            info!(count = requests.len(), "Running batch prediction");
            let outcomes = client.batch_predict_with_cancel(&requests, cancel).await;
            Ok(json!({
                "count": outcomes.len(),
                "fallbacks": outcomes.iter().filter(|o| o.is_fallback()).count(),
                "predictions": outcomes,
            }))
        }
        Command::Aggregate { fixtures, limit } => {
            let fixtures = Arc::new(FixtureFile::load(&fixtures)?);
            let facade = build_facade(client, config, fixtures);
            let report = facade.report(limit, cancel).await;
            Ok(serde_json::to_value(report)?)
        }
        Command::Health => {
            let status = client.health().await;
            Ok(json!({
                "service": config.ml.base_url,
                "status": status,
            }))
        }
    }
}
