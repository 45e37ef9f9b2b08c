use crate::{config::Config, storage::StoredImage};
use anyhow::{Context, Result};
use photomatch_vision::{
    classify, compare, compare_strict, decode, BestMatch, Decision, RawImage, SimilarityScore,
    DEFAULT_THRESHOLD,
};
use serde::Serialize;

/// Result of checking one photo against the stored references.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// No reference was left to compare against.
    NoReferences,
    Decided {
        #[serde(flatten)]
        decision: Decision,
        reference_id: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    pub threshold: f64,
    pub strict_geometry: bool,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            strict_geometry: false,
        }
    }
}

impl Matcher {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            threshold: cfg.threshold,
            strict_geometry: cfg.strict_geometry,
        }
    }

    pub fn with_threshold(self, threshold: f64) -> Self {
        Self { threshold, ..self }
    }

    /// Decode the candidate and compare it with every usable reference.
    ///
    /// A candidate that cannot be decoded fails the request. References that
    /// lack a buffer, fail to decode, or (in strict mode) differ in geometry
    /// are skipped.
    pub fn evaluate(&self, candidate: &[u8], references: &[StoredImage]) -> Result<Outcome> {
        let candidate = decode(candidate).context("decoding received photo")?;
        log::debug!(
            "candidate geometry {:?}, {} stored reference(s)",
            candidate.geometry(),
            references.len()
        );

        match self.best_match(&candidate, references) {
            BestMatch::NoReferences => {
                log::info!("no usable reference to compare against");
                Ok(Outcome::NoReferences)
            }
            BestMatch::Scored { score, index } => {
                let decision = classify(score, self.threshold)
                    .context("classifying best similarity score")?;
                log::info!(
                    "best match {}% against {} (threshold {:.3}): {}",
                    decision.percent_text,
                    references[index].id,
                    self.threshold,
                    if decision.is_match { "match" } else { "no match" }
                );
                Ok(Outcome::Decided {
                    decision,
                    reference_id: references[index].id.clone(),
                })
            }
        }
    }

    /// Highest score across `references`; the index points into the slice.
    pub fn best_match(&self, candidate: &RawImage, references: &[StoredImage]) -> BestMatch {
        references
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let reference = decode_reference(entry)?;
                let score = self.score(candidate, &reference, &entry.id)?;
                log::debug!("reference {}: score {:.4}", entry.id, score.value());
                Some((index, score))
            })
            .collect()
    }

    fn score(&self, candidate: &RawImage, reference: &RawImage, id: &str) -> Option<SimilarityScore> {
        if !self.strict_geometry {
            return Some(compare(candidate, reference));
        }
        match compare_strict(candidate, reference) {
            Ok(score) => Some(score),
            Err(e) => {
                log::warn!("skipping reference {}: {}", id, e);
                None
            }
        }
    }
}

fn decode_reference(entry: &StoredImage) -> Option<RawImage> {
    let bytes = match entry.encoded() {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            log::warn!("skipping reference {}: no image buffer", entry.id);
            return None;
        }
        Err(e) => {
            log::warn!("skipping reference {}: {:#}", entry.id, e);
            return None;
        }
    };
    match decode(&bytes) {
        Ok(image) => Some(image),
        Err(e) => {
            log::warn!("skipping reference {}: {}", entry.id, e);
            None
        }
    }
}
