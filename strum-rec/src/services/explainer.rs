//! Explainer
//!
//! Human-readable match reasons, derived only from the candidate's own fields and the
//! scoring context. Uses the scorer's tier types so a reason appears exactly when the
//! matching sub-score tier was awarded.

use crate::services::key_relations::{classify_key, KeyRelation};
use crate::services::scorer::{shared_vibes, MoodMatch, ScoringContext, TempoTier};
use crate::types::Candidate;

/// Technique tag that earns the fingerstyle reason
pub const FINGERPICKING: &str = "fingerpicking";

/// Maximum vibe tags named in the vibe reason
const MAX_NAMED_VIBES: usize = 2;

/// Ordered match reasons for one candidate
pub fn explain(context: &ScoringContext<'_>, candidate: &Candidate) -> Vec<String> {
    let features = context.features;
    let mut reasons = Vec::new();

    match (TempoTier::classify(features.tempo, candidate.tempo()), candidate.tempo()) {
        (TempoTier::VerySimilar, Some(tempo)) => reasons.push(format!(
            "Very similar tempo ({:.0} BPM vs your {:.0} BPM)",
            tempo, features.tempo
        )),
        (TempoTier::Similar, Some(tempo)) => {
            reasons.push(format!("Similar tempo ({:.0} BPM)", tempo))
        }
        _ => {}
    }

    if let Some(key) = candidate.key() {
        if classify_key(&features.key, features.mode, Some(key)) == KeyRelation::Exact {
            reasons.push(format!("Same key ({})", key));
        }
    }

    let vibes = shared_vibes(&features.vibe_tags, &candidate.vibe_tags);
    if !vibes.is_empty() {
        let named: Vec<&str> = vibes.iter().take(MAX_NAMED_VIBES).map(String::as_str).collect();
        reasons.push(format!("Similar vibe: {}", named.join(", ")));
    }

    if let Some(mood) = context.mood {
        if MoodMatch::classify(Some(mood), &candidate.mood_tags) == MoodMatch::Exact {
            reasons.push(format!("Matches your {} mood", mood));
        }
    }

    if candidate.difficulty == context.performer_level {
        reasons.push(format!("Matches your skill level ({})", candidate.difficulty));
    }

    if features.fingerstyle
        && candidate
            .techniques
            .iter()
            .any(|t| t.eq_ignore_ascii_case(FINGERPICKING))
    {
        reasons.push("Great for fingerstyle playing".to_string());
    }

    reasons
}
