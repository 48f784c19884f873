//! Fingerprint Matcher
//!
//! Approximate comparison of two constellation-hash sets.
//!
//! # Algorithm
//! - Query capped to its first `max_query_hashes` hashes (bounded cost)
//! - A query hash matches when both frequency bins differ by ≤ 2 and the time deltas
//!   differ by ≤ `time_window`
//! - Each query hash contributes at most one match (first qualifying candidate hash wins)
//!
//! Linear scan, O(query × candidate). Set sizes are bounded so no bucketed index is kept.

use crate::types::FingerprintHash;
use serde::Serialize;

/// Maximum frequency-bin distance for two hashes to match
pub const FREQ_BIN_TOLERANCE: i32 = 2;

/// Default allowed time-delta difference
pub const DEFAULT_TIME_WINDOW: i32 = 5;

/// Default query cap
pub const DEFAULT_MAX_QUERY_HASHES: usize = 100;

/// Result of comparing two hash sets
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HashMatchReport {
    pub match_count: usize,
    /// Query hashes considered (after capping)
    pub total_hashes: usize,
    /// 0.0-100.0
    pub match_percentage: f64,
}

impl HashMatchReport {
    fn empty() -> Self {
        Self {
            match_count: 0,
            total_hashes: 0,
            match_percentage: 0.0,
        }
    }
}

/// Fingerprint matcher with configurable tolerance
#[derive(Debug, Clone, Copy)]
pub struct FingerprintMatcher {
    time_window: i32,
    max_query_hashes: usize,
}

impl FingerprintMatcher {
    pub fn new(time_window: i32, max_query_hashes: usize) -> Self {
        Self {
            time_window: time_window.max(0),
            max_query_hashes,
        }
    }

    /// Compare `query` against `candidate`
    ///
    /// Returns 0 % when either set is empty.
    pub fn match_fingerprints(
        &self,
        query: &[FingerprintHash],
        candidate: &[FingerprintHash],
    ) -> HashMatchReport {
        let query = &query[..query.len().min(self.max_query_hashes)];
        if query.is_empty() || candidate.is_empty() {
            return HashMatchReport::empty();
        }

        let match_count = query
            .iter()
            .filter(|q| candidate.iter().any(|c| self.hashes_match(q, c)))
            .count();

        HashMatchReport {
            match_count,
            total_hashes: query.len(),
            match_percentage: match_count as f64 / query.len() as f64 * 100.0,
        }
    }

    fn hashes_match(&self, a: &FingerprintHash, b: &FingerprintHash) -> bool {
        let tolerance = FREQ_BIN_TOLERANCE.unsigned_abs();
        a.freq1.abs_diff(b.freq1) <= tolerance
            && a.freq2.abs_diff(b.freq2) <= tolerance
            && a.time_delta.abs_diff(b.time_delta) <= self.time_window.unsigned_abs()
    }
}

impl Default for FingerprintMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_WINDOW, DEFAULT_MAX_QUERY_HASHES)
    }
}

/// Compare two hash sets with the default query cap
pub fn match_fingerprints(
    query: &[FingerprintHash],
    candidate: &[FingerprintHash],
    time_window: i32,
) -> HashMatchReport {
    FingerprintMatcher::new(time_window, DEFAULT_MAX_QUERY_HASHES).match_fingerprints(query, candidate)
}
