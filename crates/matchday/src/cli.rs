use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Match prediction aggregator.
///
/// Results are printed to stdout as JSON; logs go to stderr.
#[derive(Debug, Parser)]
#[command(name = "matchday", version)]
pub struct Cli {
    /// TOML file whose `[ml]` and `[aggregator]` tables override the environment.
    #[arg(long, global = true, env = "MATCHDAY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Score one match.
    Predict {
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        /// Comma-separated numeric features, e.g. `2,1`.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        features: Vec<f64>,
    },
    /// Score every request in a JSON file with a single batch call.
    Batch {
        /// Array of `{homeTeam, awayTeam, features}` or `{"predictions": [...]}`.
        #[arg(long)]
        input: PathBuf,
    },
    /// Aggregate all origins for the fixtures in a JSON file.
    Aggregate {
        #[arg(long)]
        fixtures: PathBuf,
        /// Maximum matches; defaults to the aggregator's default limit.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Report whether the scoring service is reachable.
    Health,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_args() {
        let cli = Cli::try_parse_from([
            "matchday", "predict", "--home", "A", "--away", "B", "--features", "2,1",
        ])
        .unwrap();
        match cli.command {
            Command::Predict {
                home,
                away,
                features,
            } => {
                assert_eq!(home, "A");
                assert_eq!(away, "B");
                assert_eq!(features, vec![2.0, 1.0]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_negative_features() {
        let cli = Cli::try_parse_from([
            "matchday", "predict", "--home", "A", "--away", "B", "--features", "-3,1.5",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Predict { ref features, .. } if features == &vec![-3.0, 1.5]
        ));
    }

    #[test]
    fn test_predict_requires_features() {
        assert!(Cli::try_parse_from(["matchday", "predict", "--home", "A", "--away", "B"]).is_err());
    }

    #[test]
    fn test_aggregate_args() {
        let cli = Cli::try_parse_from([
            "matchday",
            "aggregate",
            "--fixtures",
            "fx.json",
            "--limit",
            "5",
            "--config",
            "matchday.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("matchday.toml")));
        assert!(matches!(cli.command, Command::Aggregate { limit: Some(5), .. }));
    }
}
