//! Prediction outcomes: genuine ML results vs. rule-based substitutes.
//!
//! The client never fails. Instead it returns either the service's answer or
//! a deterministic fallback tagged with why the service was not used.
//!
//! ```text
//! predict_match
//!   ├─ service answers (any attempt)   → Success(result)
//!   ├─ every attempt fails             → Fallback { Exhausted { .. } }
//!   ├─ ML_RETRIES = 0                  → Fallback { Disabled }
//!   ├─ request has no features         → Fallback { InvalidRequest { .. } }
//!   └─ caller cancels                  → Fallback { Cancelled }
//! ```

use serde::Serialize;

use crate::types::{MatchOutcome, PredictionRequest, PredictionResult, Probabilities};

/// Model version reported by rule-based fallbacks.
pub const FALLBACK_MODEL_VERSION: &str = "rule-based-v1";
/// Fixed fallback confidence, as a fraction.
pub const FALLBACK_CONFIDENCE: f64 = 0.6;

/// Why a fallback was served instead of the scoring service's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Every attempt failed.
    Exhausted { attempts: u32, last_error: String },
    /// The client is configured with zero attempts.
    Disabled,
    /// The request could not be sent.
    InvalidRequest { detail: String },
    /// The caller cancelled the call chain.
    Cancelled,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted {
                attempts,
                last_error,
            } => write!(f, "unavailable after {attempts} attempt(s): {last_error}"),
            Self::Disabled => write!(f, "ML service disabled"),
            Self::InvalidRequest { detail } => write!(f, "invalid request: {detail}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of a prediction call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PredictionOutcome {
    /// Answer from the scoring service (or its cache).
    Success(PredictionResult),
    /// Rule-based substitute.
    Fallback {
        result: PredictionResult,
        reason: FallbackReason,
    },
}

impl PredictionOutcome {
    /// Fallback for `request`, computed with [`rule_based_prediction`].
    pub fn fallback(request: &PredictionRequest, reason: FallbackReason) -> Self {
        Self::Fallback {
            result: rule_based_prediction(request),
            reason,
        }
    }

    pub fn result(&self) -> &PredictionResult {
        match self {
            Self::Success(result) => result,
            Self::Fallback { result, .. } => result,
        }
    }

    pub fn into_result(self) -> PredictionResult {
        match self {
            Self::Success(result) => result,
            Self::Fallback { result, .. } => result,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Success(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Deterministic prediction used when the scoring service is unavailable.
///
/// `home` iff `features[0] > features[1]`, otherwise `away`. Never `draw`.
/// Missing or NaN features compare as false.
pub fn rule_based_prediction(request: &PredictionRequest) -> PredictionResult {
    let home_favoured = matches!(
        (request.features.first(), request.features.get(1)),
        (Some(home), Some(away)) if home > away
    );

    let (outcome, probabilities) = if home_favoured {
        (MatchOutcome::Home, Probabilities::new(0.55, 0.20, 0.25))
    } else {
        (MatchOutcome::Away, Probabilities::new(0.25, 0.20, 0.55))
    };

    PredictionResult {
        outcome,
        confidence: FALLBACK_CONFIDENCE,
        model_version: FALLBACK_MODEL_VERSION.to_string(),
        probabilities: Some(probabilities),
    }
}
