//! Configuration for the ML client and the aggregator.
//!
//! The ML client reads environment-style keys:
//!
//! | key                   | default               |
//! |-----------------------|-----------------------|
//! | `ML_SERVICE_URL`      | `http://0.0.0.0:8000` |
//! | `ML_TIMEOUT`          | `10000` (ms)          |
//! | `ML_RETRIES`          | `2` (total attempts)  |
//! | `ML_CONFIDENCE_SCALE` | `auto`                |
//! | `ML_CACHE_TTL`        | `0` (s, disabled)     |
//!
//! Empty values count as unset.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::types::ConfidenceScale;

pub const DEFAULT_SERVICE_URL: &str = "http://0.0.0.0:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_ATTEMPTS: u32 = 2;
/// Retry `n` waits `n * BACKOFF_STEP`.
pub const BACKOFF_STEP: Duration = Duration::from_millis(3_000);
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_CACHE_CAPACITY: usize = 1_000;

pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_MAX_CONCURRENT_MATCHES: usize = 8;
/// Features used to score matches that carry none of their own.
pub const DEFAULT_FEATURES: [f64; 7] = [0.7, 0.65, 0.6, 0.55, 0.5, 2.0, 1.0];

pub const ENV_SERVICE_URL: &str = "ML_SERVICE_URL";
pub const ENV_TIMEOUT: &str = "ML_TIMEOUT";
pub const ENV_RETRIES: &str = "ML_RETRIES";
pub const ENV_CONFIDENCE_SCALE: &str = "ML_CONFIDENCE_SCALE";
pub const ENV_CACHE_TTL: &str = "ML_CACHE_TTL";

/// Settings for [`MlPredictionClient`](crate::ml_client::MlPredictionClient).
#[derive(Debug, Clone, PartialEq)]
pub struct MlClientConfig {
    /// Base URL of the scoring service, without trailing slash.
    pub base_url: String,
    /// Deadline for each individual attempt.
    pub timeout: Duration,
    /// Total attempts per call. Zero disables the service entirely.
    pub max_attempts: u32,
    pub backoff_step: Duration,
    pub health_timeout: Duration,
    /// Scale of confidences the service reports.
    pub confidence_scale: ConfidenceScale,
    /// TTL of the prediction cache; `None` disables caching.
    pub cache_ttl: Option<Duration>,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_attempts: DEFAULT_ATTEMPTS,
            backoff_step: BACKOFF_STEP,
            health_timeout: HEALTH_TIMEOUT,
            confidence_scale: ConfidenceScale::Auto,
            cache_ttl: None,
        }
    }
}

impl MlClientConfig {
    /// Load from process environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_SERVICE_URL) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = get(ENV_TIMEOUT) {
            config.timeout = Duration::from_millis(parse_value(ENV_TIMEOUT, &raw)?);
        }
        if let Some(raw) = get(ENV_RETRIES) {
            config.max_attempts = parse_value(ENV_RETRIES, &raw)?;
        }
        if let Some(raw) = get(ENV_CONFIDENCE_SCALE) {
            config.confidence_scale = parse_value(ENV_CONFIDENCE_SCALE, &raw)?;
        }
        if let Some(raw) = get(ENV_CACHE_TTL) {
            let secs: u64 = parse_value(ENV_CACHE_TTL, &raw)?;
            config.cache_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Full URL for a service path such as `predict/batch`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_value<T>(key: &str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Settings for [`SourceAggregator`](crate::sources::SourceAggregator).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Limit used when the caller does not pass one.
    pub default_limit: usize,
    /// Matches aggregated concurrently.
    pub max_concurrent_matches: usize,
    /// Features sent for matches that have none. `None` skips the ML origin
    /// for such matches.
    pub default_features: Option<Vec<f64>>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_concurrent_matches: DEFAULT_MAX_CONCURRENT_MATCHES,
            default_features: Some(DEFAULT_FEATURES.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MlClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, "http://0.0.0.0:8000");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.backoff_step, Duration::from_millis(3000));
        assert_eq!(config.confidence_scale, ConfidenceScale::Auto);
        assert!(config.cache_ttl.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = MlClientConfig::from_lookup(lookup(&[
            ("ML_SERVICE_URL", "http://ml.internal:9000/"),
            ("ML_TIMEOUT", "2500"),
            ("ML_RETRIES", "4"),
            ("ML_CONFIDENCE_SCALE", "percent"),
            ("ML_CACHE_TTL", "300"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://ml.internal:9000");
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.confidence_scale, ConfidenceScale::Percent);
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config =
            MlClientConfig::from_lookup(lookup(&[("ML_TIMEOUT", ""), ("ML_RETRIES", "  ")]))
                .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_attempts, 2);
    }

    #[test]
    fn test_invalid_value_reports_key() {
        let err = MlClientConfig::from_lookup(lookup(&[("ML_RETRIES", "many")])).unwrap_err();
        let ConfigError::Invalid { key, value, .. } = err;
        assert_eq!(key, "ML_RETRIES");
        assert_eq!(value, "many");
    }

    #[test]
    fn test_zero_cache_ttl_disables_cache() {
        let config = MlClientConfig::from_lookup(lookup(&[("ML_CACHE_TTL", "0")])).unwrap();
        assert!(config.cache_ttl.is_none());
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let config = MlClientConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.endpoint("/predict"), "http://localhost:8000/predict");
        assert_eq!(
            config.endpoint("predict/batch"),
            "http://localhost:8000/predict/batch"
        );
    }

    #[test]
    fn test_aggregator_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.default_limit, 50);
        assert_eq!(
            config.default_features.as_deref(),
            Some(&DEFAULT_FEATURES[..])
        );
    }
}
