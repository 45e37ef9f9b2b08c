pub mod compare;
pub mod decision;
pub mod decode;

// Re-export commonly used types
pub use compare::{best_match, compare, compare_strict, BestMatch, CompareError, SimilarityScore};
pub use decision::{classify, Decision, InvariantViolation, DEFAULT_THRESHOLD};
pub use decode::{decode, DecodeError, RawImage};
