//! Parse-and-validate for scoring-service responses.
//!
//! Bodies are decoded into [`PredictionResult`]s here and nowhere else. Any
//! shape that does not fit becomes [`PredictionError::UnrecognizedResponse`],
//! which the client treats like any other failed attempt.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientResult, PredictionError};
use crate::types::{MatchOutcome, PredictionResult, Probabilities};

/// Reported when neither the item nor its batch envelope names a model.
pub const UNKNOWN_MODEL_VERSION: &str = "unknown";

/// Allowed drift of a probability triple from 1 (fractions) or 100 (percent).
const FRACTION_TOLERANCE: f64 = 0.05;
const PERCENT_TOLERANCE: f64 = 5.0;

#[derive(Debug, Deserialize)]
struct WireResult {
    prediction: Option<String>,
    confidence: Option<f64>,
    #[serde(default, alias = "modelVersion")]
    model_version: Option<String>,
    #[serde(default)]
    probabilities: Option<Probabilities>,
}

/// Validate the body of `POST /predict`.
pub fn parse_single(body: Value) -> ClientResult<PredictionResult> {
    parse_item(body, None)
}

/// Validate the body of `POST /predict/batch`.
///
/// Accepts a bare array or the `{ predictions: [...], model_version }`
/// envelope. The item count must equal `expected`.
pub fn parse_batch(body: Value, expected: usize) -> ClientResult<Vec<PredictionResult>> {
    let (items, envelope_version) = match body {
        Value::Array(items) => (items, None),
        Value::Object(mut map) => {
            let items = match map.remove("predictions") {
                Some(Value::Array(items)) => items,
                _ => return Err(unrecognized("batch body has no predictions array")),
            };
            let version = map
                .get("model_version")
                .and_then(Value::as_str)
                .map(str::to_string);
            (items, version)
        }
        other => {
            return Err(unrecognized(format!(
                "batch body must be an array or object, got {}",
                json_kind(&other)
            )))
        }
    };

    if items.len() != expected {
        return Err(unrecognized(format!(
            "batch returned {} results for {} requests",
            items.len(),
            expected
        )));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            parse_item(item, envelope_version.as_deref()).map_err(|e| match e {
                PredictionError::UnrecognizedResponse(msg) => {
                    unrecognized(format!("item {index}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}

fn parse_item(body: Value, inherited_version: Option<&str>) -> ClientResult<PredictionResult> {
    if !body.is_object() {
        return Err(unrecognized(format!(
            "expected an object, got {}",
            json_kind(&body)
        )));
    }
    let wire: WireResult =
        serde_json::from_value(body).map_err(|e| unrecognized(e.to_string()))?;

    let label = wire
        .prediction
        .filter(|label| !label.trim().is_empty())
        .ok_or_else(|| unrecognized("missing prediction label"))?;

    let confidence = wire
        .confidence
        .ok_or_else(|| unrecognized("missing confidence"))?;
    if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
        return Err(unrecognized(format!("confidence {confidence} out of range")));
    }

    let probabilities = wire.probabilities.map(normalize_probabilities).transpose()?;

    let model_version = wire
        .model_version
        .or_else(|| inherited_version.map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_MODEL_VERSION.to_string());

    Ok(PredictionResult {
        outcome: MatchOutcome::parse(&label),
        confidence,
        model_version,
        probabilities,
    })
}

/// Bring a probability triple onto `[0, 1]`.
fn normalize_probabilities(p: Probabilities) -> ClientResult<Probabilities> {
    if [p.home, p.draw, p.away]
        .iter()
        .any(|v| !v.is_finite() || *v < 0.0)
    {
        return Err(unrecognized("probabilities must be finite and non-negative"));
    }

    let sum = p.sum();
    if (sum - 1.0).abs() <= FRACTION_TOLERANCE {
        Ok(p)
    } else if (sum - 100.0).abs() <= PERCENT_TOLERANCE {
        Ok(p.scaled_down(100.0))
    } else {
        Err(unrecognized(format!("probabilities sum to {sum}")))
    }
}

fn unrecognized(msg: impl Into<String>) -> PredictionError {
    PredictionError::UnrecognizedResponse(msg.into())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
