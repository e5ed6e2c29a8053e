//! Consensus across prediction origins.
//!
//! Majority vote over outcome labels with a confidence tie-break. Sources are
//! scanned in the fixed order ml → scraper → database so that the same input
//! always produces the same winner.

use tracing::debug;

use crate::types::{ConsensusResult, MatchOutcome, SourceMap, SourcedPrediction};

/// Votes gathered for one outcome label.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeTally {
    pub outcome: MatchOutcome,
    /// Sources backing this outcome.
    pub count: u32,
    /// Sum of their confidences.
    pub total_confidence: f64,
}

/// Group predictions by outcome, in order of first appearance.
pub fn tally<'a, I>(predictions: I) -> Vec<OutcomeTally>
where
    I: IntoIterator<Item = &'a SourcedPrediction>,
{
    let mut tallies: Vec<OutcomeTally> = Vec::new();
    for prediction in predictions {
        match tallies
            .iter_mut()
            .find(|t| t.outcome == prediction.prediction)
        {
            Some(existing) => {
                existing.count += 1;
                existing.total_confidence += prediction.confidence;
            }
            None => tallies.push(OutcomeTally {
                outcome: prediction.prediction.clone(),
                count: 1,
                total_confidence: prediction.confidence,
            }),
        }
    }
    tallies
}

/// Pick the leading tally.
///
/// A later tally takes the lead only with a strictly higher count, or an equal
/// count and a strictly higher total confidence. Remaining ties keep the
/// earlier one.
pub fn leader(tallies: &[OutcomeTally]) -> Option<&OutcomeTally> {
    let mut best: Option<&OutcomeTally> = None;
    for candidate in tallies {
        let replace = match best {
            None => true,
            Some(current) => {
                candidate.count > current.count
                    || (candidate.count == current.count
                        && candidate.total_confidence > current.total_confidence)
            }
        };
        if replace {
            best = Some(candidate);
        }
    }
    best
}

/// Reduces a [`SourceMap`] to a [`ConsensusResult`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusResolver;

impl ConsensusResolver {
    pub fn new() -> Self {
        Self
    }

    /// Consensus of every present source, or `None` when there are none.
    ///
    /// Confidences must already share one scale (percent).
    pub fn resolve(&self, sources: &SourceMap) -> Option<ConsensusResult> {
        let predictions: Vec<&SourcedPrediction> = sources.iter().collect();
        if predictions.is_empty() {
            return None;
        }

        let tallies = tally(predictions.iter().copied());
        let winner = leader(&tallies)?;

        let total = predictions.len() as f64;
        let mean_confidence = predictions.iter().map(|p| p.confidence).sum::<f64>() / total;
        let agreement = f64::from(winner.count) * 100.0 / total;

        debug!(
            sources = predictions.len(),
            outcomes = tallies.len(),
            winner = %winner.outcome,
            "Resolved consensus"
        );

        Some(ConsensusResult {
            prediction: winner.outcome.clone(),
            average_confidence: round_percent(mean_confidence),
            agreement: round_percent(agreement),
        })
    }
}

/// Round half up to a whole percentage; negatives and NaN clamp to 0.
fn round_percent(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value.round() as u32
    }
}
