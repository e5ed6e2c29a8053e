//! Match Prediction Aggregation
//!
//! This library provides:
//! - A resilient client for the external ML scoring service, with deadlines,
//!   linear-backoff retries and a deterministic rule-based fallback
//! - Per-match fan-out across prediction origins (ml, scraper, database)
//! - Majority-vote consensus with a confidence tie-break
//!
//! # Components
//!
//! - [`MlPredictionClient`]: `predict_match`, `batch_predict`, `health`
//! - [`SourceAggregator`]: `aggregate_predictions(limit)` over a [`MatchCatalog`]
//!   and any number of [`PredictionSource`] adapters
//! - [`ConsensusResolver`]: `resolve(sources)`
//! - [`AggregationFacade`]: the three above behind one handle
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = Arc::new(MlPredictionClient::new(MlClientConfig::from_env()?)?);
//! let aggregator = SourceAggregator::new(catalog, AggregatorConfig::default())
//!     .with_source(Arc::new(MlSource::new(client.clone(), Some(DEFAULT_FEATURES.to_vec()))));
//! let facade = AggregationFacade::new(client, aggregator);
//! let predictions = facade.aggregate_predictions(Some(50)).await;
//! ```

pub mod cache;
pub mod config;
pub mod consensus;
pub mod error;
pub mod facade;
pub mod ml_client;
pub mod sources;
pub mod types;

pub use cache::PredictionCache;
pub use config::{AggregatorConfig, MlClientConfig, DEFAULT_FEATURES};
pub use consensus::ConsensusResolver;
pub use error::{
    ClientResult, ConfigError, ConfigResult, PredictionError, SourceError, SourceResult,
    TransportError,
};
pub use facade::{AggregationFacade, AggregationReport};
pub use ml_client::{
    FallbackReason, HttpTransport, MlPredictionClient, PredictionOutcome, ServiceStatus,
    Transport,
};
pub use sources::{
    MatchCatalog, MatchInfo, MlSource, PredictionSource, ScrapedMatch, SourceAggregator,
    StoredPrediction,
};
pub use types::{
    AggregatedPrediction, ConfidenceScale, ConsensusResult, MatchOutcome, Origin,
    PredictionRequest, PredictionResult, Probabilities, SourceMap, SourcedPrediction,
};
