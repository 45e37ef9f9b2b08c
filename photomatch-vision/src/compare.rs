use crate::decode::RawImage;
use serde::Serialize;
use thiserror::Error;

/// Fraction of equal samples between two grids, in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SimilarityScore(f64);

impl SimilarityScore {
    pub const IDENTICAL: Self = Self(1.0);

    /// Wrap a raw ratio. Not range checked here; `decision::classify` is.
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("geometry mismatch: candidate {candidate:?}, reference {reference:?}")]
    GeometryMismatch {
        candidate: (u32, u32, u8),
        reference: (u32, u32, u8),
    },
}

/// Compare `candidate` against `reference` sample by sample.
///
/// The bound is the reference's sample count. Candidate positions past its own
/// end count as differences; candidate samples past the reference's end are
/// ignored. Therefore `compare(a, b)` and `compare(b, a)` differ whenever the
/// geometries do.
pub fn compare(candidate: &RawImage, reference: &RawImage) -> SimilarityScore {
    let total = reference.len();
    let missing = total.saturating_sub(candidate.len());
    let differing = candidate
        .samples()
        .iter()
        .zip(reference.samples())
        .filter(|(c, r)| c != r)
        .count()
        + missing;

    SimilarityScore(1.0 - differing as f64 / total as f64)
}

/// Like [`compare`], but refuses grids whose width, height or channel count
/// disagree.
pub fn compare_strict(
    candidate: &RawImage,
    reference: &RawImage,
) -> Result<SimilarityScore, CompareError> {
    if candidate.geometry() != reference.geometry() {
        return Err(CompareError::GeometryMismatch {
            candidate: candidate.geometry(),
            reference: reference.geometry(),
        });
    }
    Ok(compare(candidate, reference))
}

/// Running maximum over a reference set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BestMatch {
    /// Nothing was compared: the set was empty or every entry was skipped.
    NoReferences,
    /// Highest score and the position of the first reference that reached it.
    Scored { score: SimilarityScore, index: usize },
}

impl BestMatch {
    /// Fold one more score in. Ties keep the earlier entry.
    pub fn offer(self, index: usize, score: SimilarityScore) -> Self {
        match self {
            BestMatch::Scored { score: best, .. } if best >= score => self,
            _ => BestMatch::Scored { score, index },
        }
    }

    pub fn score(&self) -> Option<SimilarityScore> {
        match self {
            BestMatch::NoReferences => None,
            BestMatch::Scored { score, .. } => Some(*score),
        }
    }
}

impl FromIterator<(usize, SimilarityScore)> for BestMatch {
    fn from_iter<I: IntoIterator<Item = (usize, SimilarityScore)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(BestMatch::NoReferences, |acc, (index, score)| {
                acc.offer(index, score)
            })
    }
}

/// Best score of `candidate` across all `references`.
pub fn best_match<'a, I>(candidate: &RawImage, references: I) -> BestMatch
where
    I: IntoIterator<Item = &'a RawImage>,
{
    references
        .into_iter()
        .map(|reference| compare(candidate, reference))
        .enumerate()
        .collect()
}
