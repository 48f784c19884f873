//! Recommendation workflow stages
//!
//! Per-request pipeline driven by the engine:
//! 1. **Identification chain**: fingerprint lookup, then feature search
//! 2. **Candidate aggregation**: similar tracks, genre fallback, deduplication
//! 3. **Enrichment**: bounded concurrent batches, each finished before it is scored
//!
//! Provider failures are recovered inside each stage and never reach the caller.

pub mod candidate_aggregator;
pub mod enrichment;
pub mod identification_chain;

pub use candidate_aggregator::{AggregatedCandidates, CandidateAggregator};
pub use enrichment::CandidateEnricher;
pub use identification_chain::{ChainInput, ChainOutcome, ChainState, IdentificationChain};
