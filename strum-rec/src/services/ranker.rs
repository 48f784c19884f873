//! Ranker
//!
//! Presentation ordering on top of the numeric score: candidates with artwork come first,
//! each partition sorted by descending score with ties kept in discovery order, then the
//! list is cut to the configured length.

use crate::types::ScoredCandidate;
use std::cmp::Ordering;

/// Order and truncate scored candidates
pub fn rank(scored: Vec<ScoredCandidate>, max_results: usize) -> Vec<ScoredCandidate> {
    let (mut with_artwork, mut without_artwork): (Vec<_>, Vec<_>) =
        scored.into_iter().partition(|s| s.candidate.has_artwork());

    // sort_by is stable
    with_artwork.sort_by(by_score_desc);
    without_artwork.sort_by(by_score_desc);

    with_artwork
        .into_iter()
        .chain(without_artwork)
        .take(max_results)
        .collect()
}

fn by_score_desc(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.match_score
        .partial_cmp(&a.match_score)
        .unwrap_or(Ordering::Equal)
}
