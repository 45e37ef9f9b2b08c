pub mod config;
pub mod intake;
pub mod matcher;
pub mod reply;
pub mod storage;

// Re-export vision types for convenience
pub use photomatch_vision::{compare, decision, decode, BestMatch, Decision, RawImage, SimilarityScore};
