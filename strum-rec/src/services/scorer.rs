//! Multi-Criteria Scorer
//!
//! Additive match score per candidate. Each axis is independently bounded so it can be
//! explained on its own:
//!
//! | Axis            | Points                                                  |
//! |-----------------|---------------------------------------------------------|
//! | Tempo           | ≤10 bpm → 25, ≤20 → 15, ≤30 → 10, ≤50 → 5, else 0         |
//! | Key             | exact 20, same pitch class 15, related 10, otherwise 5   |
//! | Chords          | fraction of query chord roots in candidate × 30          |
//! | Vibe            | +5 per shared tag                                        |
//! | Mood            | exact 30, related adjective 20, else 0                   |
//! | User preference | genre +10, +5 per liked mood, tempo ±15 +10, key +8      |
//! | Difficulty      | same level 15, one apart 8, two apart 2                  |
//!
//! The tier types here are shared with the explainer so reasons never disagree with points.

use crate::services::explainer;
use crate::services::genre_mapper::related_adjectives;
use crate::services::key_relations::{chord_root, classify_key, key_token, KeyRelation};
use crate::types::{
    Candidate, Difficulty, FeatureVector, ScoreBreakdown, ScoredCandidate, UserProfile,
};
use std::collections::HashSet;

// ============================================================================
// Tiers
// ============================================================================

/// Tempo proximity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoTier {
    /// ≤ 10 bpm apart
    VerySimilar,
    /// ≤ 20 bpm apart
    Similar,
    /// ≤ 30 bpm apart
    Near,
    /// ≤ 50 bpm apart
    Distant,
    /// More than 50 bpm apart
    Far,
    /// Candidate tempo not reported
    Unknown,
}

impl TempoTier {
    pub fn classify(query_tempo: f64, candidate_tempo: Option<f64>) -> Self {
        let Some(candidate_tempo) = candidate_tempo else {
            return TempoTier::Unknown;
        };
        let diff = (query_tempo - candidate_tempo).abs();
        if diff <= 10.0 {
            TempoTier::VerySimilar
        } else if diff <= 20.0 {
            TempoTier::Similar
        } else if diff <= 30.0 {
            TempoTier::Near
        } else if diff <= 50.0 {
            TempoTier::Distant
        } else {
            TempoTier::Far
        }
    }

    pub fn points(self) -> f64 {
        match self {
            TempoTier::VerySimilar => 25.0,
            TempoTier::Similar => 15.0,
            TempoTier::Near => 10.0,
            TempoTier::Distant => 5.0,
            TempoTier::Far | TempoTier::Unknown => 0.0,
        }
    }
}

/// Key sub-score; an unknown or unrelated key is never penalized to zero
pub fn key_points(relation: KeyRelation) -> f64 {
    match relation {
        KeyRelation::Exact => 20.0,
        KeyRelation::SamePitchClass => 15.0,
        KeyRelation::Related => 10.0,
        KeyRelation::Unrelated => 5.0,
    }
}

/// Mood match tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodMatch {
    /// Candidate carries the mood tag itself
    Exact,
    /// Candidate carries one of the mood's curated adjectives
    Related,
    None,
}

impl MoodMatch {
    pub fn classify(mood: Option<&str>, candidate_moods: &[String]) -> Self {
        let Some(mood) = mood else {
            return MoodMatch::None;
        };
        let mood = mood.trim().to_lowercase();
        let tags: HashSet<String> = candidate_moods.iter().map(|m| m.to_lowercase()).collect();

        if tags.contains(&mood) {
            MoodMatch::Exact
        } else if related_adjectives(&mood).iter().any(|adj| tags.contains(*adj)) {
            MoodMatch::Related
        } else {
            MoodMatch::None
        }
    }

    pub fn points(self) -> f64 {
        match self {
            MoodMatch::Exact => 30.0,
            MoodMatch::Related => 20.0,
            MoodMatch::None => 0.0,
        }
    }
}

/// Difficulty alignment, symmetric in its arguments
pub fn difficulty_points(a: Difficulty, b: Difficulty) -> f64 {
    match a.ordinal().abs_diff(b.ordinal()) {
        0 => 15.0,
        1 => 8.0,
        2 => 2.0,
        _ => 0.0,
    }
}

/// Query vibe tags the candidate shares, in query order (case-insensitive)
pub fn shared_vibes(query: &[String], candidate: &[String]) -> Vec<String> {
    let candidate: HashSet<String> = candidate.iter().map(|v| v.to_lowercase()).collect();
    query
        .iter()
        .filter(|v| candidate.contains(&v.to_lowercase()))
        .cloned()
        .collect()
}

/// Fraction of query chord roots present among the candidate's chord roots
pub fn chord_overlap(query: &[String], candidate: &[String]) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let roots: HashSet<char> = candidate.iter().filter_map(|c| chord_root(c)).collect();
    let matches = query
        .iter()
        .filter_map(|c| chord_root(c))
        .filter(|root| roots.contains(root))
        .count();
    matches as f64 / query.len() as f64
}

// ============================================================================
// Scorer
// ============================================================================

/// Everything a candidate is scored against
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub features: &'a FeatureVector,
    /// Requested mood, else the performance's mood tag
    pub mood: Option<&'a str>,
    pub profile: Option<&'a UserProfile>,
    pub performer_level: Difficulty,
}

impl<'a> ScoringContext<'a> {
    pub fn new(
        features: &'a FeatureVector,
        mood: Option<&'a str>,
        profile: Option<&'a UserProfile>,
        performer_level: Difficulty,
    ) -> Self {
        Self {
            features,
            mood: mood.or(features.mood_tag.as_deref()),
            profile,
            performer_level,
        }
    }
}

/// Scores candidates against one request's context
pub struct CandidateScorer<'a> {
    context: ScoringContext<'a>,
}

impl<'a> CandidateScorer<'a> {
    pub fn new(context: ScoringContext<'a>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ScoringContext<'a> {
        &self.context
    }

    /// Per-axis points for one candidate
    pub fn breakdown(&self, candidate: &Candidate) -> ScoreBreakdown {
        let features = self.context.features;

        let tempo = TempoTier::classify(features.tempo, candidate.tempo()).points();
        let key = key_points(classify_key(&features.key, features.mode, candidate.key()));
        let chords = chord_overlap(&features.chord_set, candidate.chords()) * 30.0;
        let vibe = shared_vibes(&features.vibe_tags, &candidate.vibe_tags).len() as f64 * 5.0;
        let mood = MoodMatch::classify(self.context.mood, &candidate.mood_tags).points();
        let user_preference = self
            .context
            .profile
            .map(|profile| user_preference_points(profile, candidate))
            .unwrap_or(0.0);
        let difficulty = difficulty_points(self.context.performer_level, candidate.difficulty);

        ScoreBreakdown {
            tempo,
            key,
            chords,
            vibe,
            mood,
            user_preference,
            difficulty,
        }
    }

    /// Score and explain one candidate
    pub fn score(&self, candidate: Candidate) -> ScoredCandidate {
        let breakdown = self.breakdown(&candidate);
        let match_reasons = explainer::explain(&self.context, &candidate);
        ScoredCandidate {
            match_score: breakdown.total(),
            match_reasons,
            breakdown,
            candidate,
        }
    }
}

fn counted(counts: &std::collections::HashMap<String, u32>, name: &str) -> bool {
    counts
        .iter()
        .any(|(k, &count)| count > 0 && k.eq_ignore_ascii_case(name))
}

/// Optional bonus from the listener's history
pub fn user_preference_points(profile: &UserProfile, candidate: &Candidate) -> f64 {
    let mut points = 0.0;

    if candidate
        .genre
        .as_deref()
        .is_some_and(|genre| counted(&profile.genre_counts, genre))
    {
        points += 10.0;
    }

    points += candidate
        .mood_tags
        .iter()
        .filter(|mood| counted(&profile.mood_counts, mood))
        .count() as f64
        * 5.0;

    if let (Some(average), Some(tempo)) = (profile.average_tempo, candidate.tempo()) {
        if (average - tempo).abs() <= 15.0 {
            points += 10.0;
        }
    }

    if candidate
        .key()
        .is_some_and(|key| counted(&profile.favorite_keys, key_token(key)))
    {
        points += 8.0;
    }

    points
}
