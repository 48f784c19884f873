//! Confidence Assessor Service
//!
//! Evidence-based identification confidence on a 0-100 scale.
//!
//! Combines fingerprint match percentage with feature similarity:
//! - With fingerprint evidence: 70 % fingerprint + 30 % feature similarity
//! - Without fingerprint evidence: feature similarity alone
//!
//! Inputs must already be normalized to 0-100; the blend does not clamp.

use crate::services::key_relations::{classify_key, KeyRelation};
use crate::types::{FeatureVector, ProviderFeatures};

/// Evidence for one identification candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evidence {
    /// Local fingerprint match percentage (0-100), when reference hashes were available
    pub fingerprint_match: Option<f64>,
    /// Feature similarity (0-100)
    pub feature_similarity: f64,
}

/// Confidence Assessor
pub struct ConfidenceAssessor {
    /// Fingerprint weight (default 0.70 = 70%)
    fingerprint_weight: f64,
    /// Feature weight (default 0.30 = 30%)
    feature_weight: f64,
}

impl ConfidenceAssessor {
    /// Create new confidence assessor with default weights
    pub fn new() -> Self {
        Self {
            fingerprint_weight: 0.70,
            feature_weight: 0.30,
        }
    }

    /// Weighted blend of fingerprint match and feature similarity, rounded
    pub fn blend(&self, match_percentage: f64, feature_similarity: f64) -> u8 {
        let confidence =
            match_percentage * self.fingerprint_weight + feature_similarity * self.feature_weight;
        confidence.round() as u8
    }

    /// Assess confidence from whatever evidence is present
    pub fn assess(&self, evidence: Evidence) -> u8 {
        match evidence.fingerprint_match {
            Some(match_percentage) => self.blend(match_percentage, evidence.feature_similarity),
            None => evidence.feature_similarity.round() as u8,
        }
    }
}

impl Default for ConfidenceAssessor {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Feature Similarity
// ============================================================================

const TEMPO_POINTS: f64 = 40.0;
/// BPM difference at which tempo proximity reaches zero
const TEMPO_FALLOFF_BPM: f64 = 40.0;
const KEY_POINTS: f64 = 30.0;
const KEY_RELATED_POINTS: f64 = 20.0;
const ENERGY_POINTS: f64 = 15.0;
const VALENCE_POINTS: f64 = 15.0;

/// Proximity-based similarity between a performance and a candidate (0-100)
///
/// Axes: tempo (40), key (30), energy (15), valence (15). An axis whose value is missing on
/// either side contributes half its points.
pub fn feature_similarity(features: &FeatureVector, candidate: Option<&ProviderFeatures>) -> f64 {
    let empty = ProviderFeatures::default();
    let candidate = candidate.unwrap_or(&empty);

    let tempo = match candidate.tempo {
        Some(tempo) => {
            let diff = (features.tempo - tempo).abs();
            TEMPO_POINTS * (1.0 - diff / TEMPO_FALLOFF_BPM).max(0.0)
        }
        None => TEMPO_POINTS / 2.0,
    };

    let key = match candidate.key.as_deref() {
        Some(key) => match classify_key(&features.key, features.mode, Some(key)) {
            KeyRelation::Exact | KeyRelation::SamePitchClass => KEY_POINTS,
            KeyRelation::Related => KEY_RELATED_POINTS,
            KeyRelation::Unrelated => 0.0,
        },
        None => KEY_POINTS / 2.0,
    };

    let energy = unit_proximity(features.energy, candidate.energy, ENERGY_POINTS);
    let valence = unit_proximity(features.valence, candidate.valence, VALENCE_POINTS);

    (tempo + key + energy + valence).clamp(0.0, 100.0)
}

fn unit_proximity(a: Option<f64>, b: Option<f64>, points: f64) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => points * (1.0 - (a - b).abs()).clamp(0.0, 1.0),
        _ => points / 2.0,
    }
}
