use std::path::Path;
use std::time::Duration;

use aggregation::{AggregatorConfig, ConfidenceScale, MlClientConfig};
use anyhow::{Context, Result};
use serde::Deserialize;

/// `[ml]` table of the config file. Every key overrides the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MlSection {
    pub service_url: Option<String>,
    pub timeout_ms: Option<u64>,
    /// Total attempts; 0 disables the service.
    pub retries: Option<u32>,
    pub confidence_scale: Option<ConfidenceScale>,
    /// 0 disables the cache.
    pub cache_ttl_secs: Option<u64>,
}

/// `[aggregator]` table of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregatorSection {
    pub default_limit: Option<usize>,
    pub max_concurrent_matches: Option<usize>,
    /// Features for fixtures without their own. An empty list disables ML
    /// scoring for such fixtures.
    pub default_features: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub ml: MlSection,
    #[serde(default)]
    pub aggregator: AggregatorSection,
}

/// Fully resolved settings for one CLI run.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub ml: MlClientConfig,
    pub aggregator: AggregatorConfig,
}

impl AppConfig {
    /// Environment first, then the optional TOML file on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Some(content)
            }
            None => None,
        };
        Self::resolve(|key| std::env::var(key).ok(), file.as_deref())
    }

    /// Resolve from a key lookup and optional TOML text.
    pub fn resolve<F>(lookup: F, toml_text: Option<&str>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ml = MlClientConfig::from_lookup(lookup).context("Invalid ML environment")?;
        let mut aggregator = AggregatorConfig::default();

        if let Some(text) = toml_text {
            let file: FileConfig = toml::from_str(text).context("Failed to parse config TOML")?;
            file.apply(&mut ml, &mut aggregator);
        }

        Ok(Self { ml, aggregator })
    }
}

impl FileConfig {
    fn apply(self, ml: &mut MlClientConfig, aggregator: &mut AggregatorConfig) {
        let MlSection {
            service_url,
            timeout_ms,
            retries,
            confidence_scale,
            cache_ttl_secs,
        } = self.ml;

        if let Some(url) = service_url {
            ml.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = timeout_ms {
            ml.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = retries {
            ml.max_attempts = retries;
        }
        if let Some(scale) = confidence_scale {
            ml.confidence_scale = scale;
        }
        if let Some(secs) = cache_ttl_secs {
            ml.cache_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }

        let AggregatorSection {
            default_limit,
            max_concurrent_matches,
            default_features,
        } = self.aggregator;

        if let Some(limit) = default_limit {
            aggregator.default_limit = limit;
        }
        if let Some(concurrency) = max_concurrent_matches {
            aggregator.max_concurrent_matches = concurrency;
        }
        if let Some(features) = default_features {
            aggregator.default_features = (!features.is_empty()).then_some(features);
        }
    }
}
