use crate::compare::SimilarityScore;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// A score outside [0, 1] reached the classifier. Only a comparator bug can
/// produce one.
#[derive(Debug, Error)]
#[error("similarity score {0} is outside [0, 1]")]
pub struct InvariantViolation(pub f64);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub is_match: bool,
    pub score: SimilarityScore,
    /// Score as a percentage with two decimals, e.g. `"95.00"`.
    pub percent_text: String,
}

/// Classify `score` against `threshold`. A match needs strictly more than the
/// threshold.
pub fn classify(score: SimilarityScore, threshold: f64) -> Result<Decision, InvariantViolation> {
    let value = score.value();
    if !(0.0..=1.0).contains(&value) {
        log::error!("similarity score {} outside [0, 1]", value);
        return Err(InvariantViolation(value));
    }

    Ok(Decision {
        is_match: value > threshold,
        score,
        percent_text: percent_text(value),
    })
}

/// Half-up to hundredths of a percent.
fn percent_text(value: f64) -> String {
    let hundredths = (value * 10_000.0).round();
    format!("{:.2}", hundredths / 100.0)
}
