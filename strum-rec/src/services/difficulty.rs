//! Difficulty estimation
//!
//! **[Performer level]** Estimated from the performance itself: fast or fingerpicked playing
//! is at least intermediate; very fast or very energetic playing is advanced.
//!
//! **[Candidate level]** Derived during enrichment from a 10-100 difficulty number:
//! `30 + tempo_distance * 0.3 + key_complexity * 0.3 + genre_complexity * 0.4`, where
//! `tempo_distance = |tempo - 120| / 2`. Buckets: < 40 beginner, < 70 intermediate, else
//! advanced. Unknown tempo or key yields intermediate.

use crate::services::key_relations::{key_token, parse_key};
use crate::types::{Difficulty, FeatureVector, Mode};

/// Reference tempo for the tempo-distance term
const REFERENCE_TEMPO: f64 = 120.0;

/// Estimate the performer's level from their performance
pub fn estimate_performer_level(features: &FeatureVector) -> Difficulty {
    let mut level = Difficulty::Beginner;
    if features.tempo > 130.0 || features.fingerstyle {
        level = Difficulty::Intermediate;
    }
    if features.tempo > 150.0 || features.energy.is_some_and(|e| e > 0.8) {
        level = Difficulty::Advanced;
    }
    level
}

/// Key complexity (25 base, +15 for sharp/flat keys, +10 for minor)
pub fn key_complexity(key: &str) -> f64 {
    let mut complexity = 25.0;
    let token = key_token(key);
    if token.chars().skip(1).any(|c| matches!(c, '#' | 'b' | '♯' | '♭')) {
        complexity += 15.0;
    }
    if parse_key(key, Mode::Major).is_some_and(|k| k.mode == Mode::Minor) {
        complexity += 10.0;
    }
    complexity
}

/// Genre complexity, classical/jazz hardest and acoustic easiest
pub fn genre_complexity(genre: Option<&str>) -> f64 {
    let Some(genre) = genre else {
        return 35.0;
    };
    let genre = genre.to_lowercase();
    let table: [(&[&str], f64); 10] = [
        (&["classical", "jazz"], 70.0),
        (&["progressive", "experimental"], 65.0),
        (&["metal"], 60.0),
        (&["funk", "fusion"], 55.0),
        (&["blues", "soul"], 45.0),
        (&["rock", "alternative"], 40.0),
        (&["indie", "folk"], 35.0),
        (&["hip hop", "hip-hop", "rap"], 30.0),
        (&["pop", "dance"], 25.0),
        (&["acoustic", "easy listening"], 20.0),
    ];
    table
        .iter()
        .find(|(names, _)| names.iter().any(|n| genre.contains(n)))
        .map(|(_, complexity)| *complexity)
        .unwrap_or(35.0)
}

/// Raw difficulty number (10-100)
pub fn difficulty_score(tempo: f64, key: &str, genre: Option<&str>) -> u8 {
    let tempo_distance = (tempo - REFERENCE_TEMPO).abs() / 2.0;
    let raw = 30.0
        + tempo_distance * 0.3
        + key_complexity(key) * 0.3
        + genre_complexity(genre) * 0.4;
    raw.round().clamp(10.0, 100.0) as u8
}

/// Bucket a difficulty number into a level
pub fn level_for_score(score: u8) -> Difficulty {
    if score < 40 {
        Difficulty::Beginner
    } else if score < 70 {
        Difficulty::Intermediate
    } else {
        Difficulty::Advanced
    }
}

/// Candidate level from whatever the providers reported
pub fn estimate_candidate_level(
    tempo: Option<f64>,
    key: Option<&str>,
    genre: Option<&str>,
) -> Difficulty {
    match (tempo, key) {
        (Some(tempo), Some(key)) if tempo > 0.0 => {
            level_for_score(difficulty_score(tempo, key, genre))
        }
        _ => Difficulty::Intermediate,
    }
}
