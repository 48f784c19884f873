//! Genre Mapper
//!
//! Resolves the fallback genre used when relatedness lookups leave too few candidates,
//! and holds the curated mood vocabulary shared by the scorer.
//!
//! # Resolution order
//! 1. Fixed mood → genre table (7 moods)
//! 2. Feature heuristic over tempo/energy/valence/acousticness/danceability
//! 3. `pop`

use crate::types::FeatureVector;

/// Genre used when nothing else matches
pub const DEFAULT_GENRE: &str = "pop";

/// Neutral value for descriptors the analyzer did not estimate
const NEUTRAL: f64 = 0.5;

/// Mood → genre table
const MOOD_GENRES: [(&str, &str); 7] = [
    ("happy", "pop"),
    ("sad", "indie"),
    ("chill", "indie"),
    ("romantic", "rnb"),
    ("energetic", "rock"),
    ("nostalgic", "indie"),
    ("inspiring", "pop"),
];

/// Mood → related adjectives (7 moods × 5 adjectives)
const MOOD_VOCABULARY: [(&str, [&str; 5]); 7] = [
    ("happy", ["uplifting", "fun", "energetic", "joyful", "bright"]),
    ("sad", ["melancholic", "emotional", "reflective", "dark", "somber"]),
    ("chill", ["mellow", "peaceful", "laid-back", "relaxed", "calm"]),
    ("romantic", ["loving", "tender", "gentle", "intimate", "sweet"]),
    ("energetic", ["upbeat", "driving", "powerful", "anthemic", "intense"]),
    ("nostalgic", ["wistful", "reminiscent", "classic", "vintage", "timeless"]),
    ("inspiring", ["hopeful", "motivational", "empowering", "uplifting", "spiritual"]),
];

/// Genre for a mood from the fixed table (case-insensitive)
pub fn genre_for_mood(mood: &str) -> Option<&'static str> {
    let mood = mood.trim().to_lowercase();
    MOOD_GENRES
        .iter()
        .find(|(m, _)| *m == mood)
        .map(|(_, genre)| *genre)
}

/// Adjectives curated as related to a mood (empty for unknown moods)
pub fn related_adjectives(mood: &str) -> &'static [&'static str] {
    let mood = mood.trim().to_lowercase();
    MOOD_VOCABULARY
        .iter()
        .find(|(m, _)| *m == mood)
        .map(|(_, adjectives)| adjectives.as_slice())
        .unwrap_or(&[])
}

/// Genre derived from the performance's features alone
///
/// Rules are evaluated in order, first match wins. Missing descriptors count as 0.5.
pub fn genre_from_features(features: &FeatureVector) -> &'static str {
    let tempo = features.tempo;
    let energy = features.energy.unwrap_or(NEUTRAL);
    let valence = features.valence.unwrap_or(NEUTRAL);
    let acousticness = features.acousticness.unwrap_or(NEUTRAL);
    let danceability = features.danceability.unwrap_or(NEUTRAL);

    if energy > 0.7 && tempo > 140.0 && valence > 0.6 {
        "rock"
    } else if energy < 0.4 && tempo < 90.0 && acousticness > 0.6 {
        "indie"
    } else if danceability > 0.7 && (110.0..=130.0).contains(&tempo) {
        "pop"
    } else if tempo > 120.0 && energy > 0.6 && danceability > 0.6 {
        "edm"
    } else if acousticness > 0.7 && energy < 0.5 {
        "folk"
    } else if energy > 0.6 && valence < 0.4 {
        "alternative"
    } else if tempo < 100.0 && valence > 0.4 {
        "rnb"
    } else {
        DEFAULT_GENRE
    }
}

/// Resolve the fallback genre: mood table first, then the feature heuristic
pub fn resolve_fallback_genre(mood: Option<&str>, features: &FeatureVector) -> &'static str {
    mood.and_then(genre_for_mood)
        .unwrap_or_else(|| genre_from_features(features))
}
