//! Core services: matching, scoring and ranking
//!
//! Pure, synchronous building blocks used by the workflow stages. Nothing here performs
//! I/O or holds state across requests.

pub mod confidence_assessor;
pub mod difficulty;
pub mod explainer;
pub mod fingerprint_matcher;
pub mod genre_mapper;
pub mod key_relations;
pub mod ranker;
pub mod scorer;

pub use confidence_assessor::{ConfidenceAssessor, Evidence};
pub use fingerprint_matcher::{match_fingerprints, FingerprintMatcher, HashMatchReport};
pub use scorer::{CandidateScorer, ScoringContext};
