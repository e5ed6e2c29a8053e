//! Commands run end to end against files on disk, with the scoring service
//! disabled or unreachable so that no network is needed.

use std::io::Write;
use std::path::PathBuf;

use matchday::cli::Command;
use matchday::config::AppConfig;
use serde_json::Value;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

const FIXTURES: &str = r#"{
    "matches": [
        {"matchId": "fx-1", "homeTeam": "Arsenal", "awayTeam": "Chelsea", "features": [0.8, 0.4], "league": "Premier League"}
    ],
    "database": [
        {"matchId": "db-1", "homeTeam": "Arsenal", "awayTeam": "Chelsea", "predictedWinner": "Arsenal", "confidence": 62},
        {"_id": "db-2", "homeTeam": "Lyon", "awayTeam": "Nice", "predictedWinner": "Nice", "confidence": 70}
    ],
    "scraper": [
        {"homeTeam": "Lyon", "awayTeam": "Nice", "prediction": "Nice", "confidence": 74, "odds": 2.4},
        {"id": "sc-9", "homeTeam": "Porto", "awayTeam": "Braga"}
    ]
}"#;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Scoring service switched off: every ML call falls back immediately.
fn offline_config() -> AppConfig {
    AppConfig::resolve(
        |key| match key {
            "ML_SERVICE_URL" => Some("http://127.0.0.1:1".to_string()),
            "ML_RETRIES" => Some("0".to_string()),
            _ => None,
        },
        None,
    )
    .unwrap()
}

async fn run(command: Command, config: &AppConfig) -> Value {
    matchday::run(command, config, &CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_aggregate_merges_origins() {
    let fixtures = write_temp(FIXTURES);
    let report = run(
        Command::Aggregate {
            fixtures: fixtures.path().to_path_buf(),
            limit: None,
        },
        &offline_config(),
    )
    .await;

    assert_eq!(report["total"], 3);
    assert_eq!(report["withConsensus"], 3);
    let predictions = report["predictions"].as_array().unwrap();

    // Arsenal-Chelsea: rule-based ml (home, 60) + database (home, 62).
    let arsenal = &predictions[0];
    assert_eq!(arsenal["matchId"], "fx-1");
    assert_eq!(arsenal["league"], "Premier League");
    assert_eq!(arsenal["sources"]["ml"]["prediction"], "home");
    assert_eq!(arsenal["sources"]["ml"]["fallback"], true);
    assert_eq!(arsenal["sources"]["database"]["prediction"], "home");
    assert!(arsenal["sources"].get("scraper").is_none());
    assert_eq!(arsenal["consensus"]["prediction"], "home");
    assert_eq!(arsenal["consensus"]["averageConfidence"], 61);
    assert_eq!(arsenal["consensus"]["agreement"], 100);

    // Lyon-Nice: default features favour home, both records say away.
    let lyon = &predictions[1];
    assert_eq!(lyon["matchId"], "db-2");
    assert_eq!(lyon["sources"]["ml"]["prediction"], "home");
    assert_eq!(lyon["sources"]["scraper"]["odds"], 2.4);
    assert_eq!(lyon["consensus"]["prediction"], "away");
    assert_eq!(lyon["consensus"]["agreement"], 67);
    assert_eq!(lyon["consensus"]["averageConfidence"], 68);

    let porto = &predictions[2];
    assert_eq!(porto["matchId"], "sc-9");
    assert_eq!(porto["sources"]["scraper"]["confidence"], 65.0);
}

#[tokio::test]
async fn test_aggregate_limit() {
    let fixtures = write_temp(FIXTURES);
    let report = run(
        Command::Aggregate {
            fixtures: fixtures.path().to_path_buf(),
            limit: Some(1),
        },
        &offline_config(),
    )
    .await;
    assert_eq!(report["total"], 1);
}

#[tokio::test]
async fn test_aggregate_without_default_features_skips_ml() {
    let fixtures = write_temp(FIXTURES);
    let config = AppConfig::resolve(
        |key| (key == "ML_RETRIES").then(|| "0".to_string()),
        Some("[aggregator]\ndefault_features = []\n"),
    )
    .unwrap();

    let report = run(
        Command::Aggregate {
            fixtures: fixtures.path().to_path_buf(),
            limit: None,
        },
        &config,
    )
    .await;

    let predictions = report["predictions"].as_array().unwrap();
    // Only the explicit fixture carries its own features.
    assert!(predictions[0]["sources"].get("ml").is_some());
    assert!(predictions[1]["sources"].get("ml").is_none());
    assert!(predictions[2]["sources"].get("ml").is_none());
}

#[tokio::test]
async fn test_aggregate_blank_records_take_defaults() {
    let fixtures = write_temp(
        r#"{
            "database": [
                {"_id": "db-1", "homeTeam": "Lyon", "awayTeam": "Nice", "predictedWinner": "", "confidence": 90},
                {"_id": "db-2", "homeTeam": "Porto", "awayTeam": "Braga", "predictedWinner": "Braga", "confidence": null}
            ],
            "scraper": [
                {"homeTeam": "Lyon", "awayTeam": "Nice", "prediction": "", "confidence": 0}
            ]
        }"#,
    );
    let config = AppConfig::resolve(
        |key| (key == "ML_RETRIES").then(|| "0".to_string()),
        Some("[aggregator]\ndefault_features = []\n"),
    )
    .unwrap();

    let report = run(
        Command::Aggregate {
            fixtures: fixtures.path().to_path_buf(),
            limit: None,
        },
        &config,
    )
    .await;

    let predictions = report["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);

    let lyon = &predictions[0];
    assert!(lyon["sources"].get("database").is_none());
    assert_eq!(lyon["sources"]["scraper"]["prediction"], "home");
    assert_eq!(lyon["sources"]["scraper"]["confidence"], 65.0);
    assert_eq!(lyon["consensus"]["prediction"], "home");
    assert_eq!(lyon["consensus"]["averageConfidence"], 65);

    let porto = &predictions[1];
    assert_eq!(porto["sources"]["database"]["prediction"], "away");
    assert_eq!(porto["sources"]["database"]["confidence"], 0.0);
}

#[tokio::test]
async fn test_predict_falls_back_when_disabled() {
    let output = run(
        Command::Predict {
            home: "A".to_string(),
            away: "B".to_string(),
            features: vec![2.0, 1.0],
        },
        &offline_config(),
    )
    .await;

    assert_eq!(output["source"], "fallback");
    assert_eq!(output["result"]["prediction"], "home");
    assert_eq!(output["result"]["confidence"], 0.6);
    assert_eq!(output["result"]["model_version"], "rule-based-v1");
    assert_eq!(output["reason"]["kind"], "disabled");
}

#[tokio::test]
async fn test_predict_unreachable_service() {
    let config = AppConfig::resolve(
        |key| match key {
            "ML_SERVICE_URL" => Some("http://127.0.0.1:1".to_string()),
            "ML_RETRIES" => Some("1".to_string()),
            _ => None,
        },
        None,
    )
    .unwrap();

    let output = run(
        Command::Predict {
            home: "A".to_string(),
            away: "B".to_string(),
            features: vec![2.0, 1.0],
        },
        &config,
    )
    .await;
    assert_eq!(output["source"], "fallback");
    assert_eq!(output["reason"]["kind"], "exhausted");
    assert_eq!(output["result"]["prediction"], "home");
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let input = write_temp(
        r#"[
            {"homeTeam": "A", "awayTeam": "B", "features": [2, 1]},
            {"homeTeam": "C", "awayTeam": "D", "features": [1, 2]},
            {"homeTeam": "E", "awayTeam": "F", "features": []}
        ]"#,
    );
    let output = run(
        Command::Batch {
            input: input.path().to_path_buf(),
        },
        &offline_config(),
    )
    .await;

    assert_eq!(output["count"], 3);
    assert_eq!(output["fallbacks"], 3);
    let labels: Vec<&str> = output["predictions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["result"]["prediction"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["home", "away", "away"]);
    assert_eq!(output["predictions"][2]["reason"]["kind"], "invalid_request");
}

#[tokio::test]
async fn test_health_offline() {
    let output = run(Command::Health, &offline_config()).await;
    assert_eq!(output["status"], "offline");
    assert_eq!(output["service"], "http://127.0.0.1:1");
}

#[tokio::test]
async fn test_missing_fixtures_file_is_an_error() {
    let result = matchday::run(
        Command::Aggregate {
            fixtures: PathBuf::from("/nonexistent/fixtures.json"),
            limit: None,
        },
        &offline_config(),
        &CancellationToken::new(),
    )
    .await;
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read fixtures"));
}

#[test]
fn test_config_file_overrides() {
    let file = write_temp(
        r#"
        [ml]
        service_url = "http://scoring.local:8000"
        retries = 3
        timeout_ms = 1500

        [aggregator]
        max_concurrent_matches = 2
        "#,
    );
    let config = AppConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.ml.base_url, "http://scoring.local:8000");
    assert_eq!(config.ml.max_attempts, 3);
    assert_eq!(config.ml.timeout.as_millis(), 1500);
    assert_eq!(config.aggregator.max_concurrent_matches, 2);
}
