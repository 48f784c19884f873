//! Core Types for StrumSense recommendation
//!
//! Fixed shapes every provider adapter normalizes into before data reaches the core:
//! - **FeatureVector:** structured summary of one performance (external analyzer output)
//! - **Candidate:** a track under consideration, created per request and never persisted
//! - **IdentificationResult / ScoredCandidate:** what `Recommend` hands back
//!
//! Provider failures use the `ProviderError` taxonomy and are always recovered locally.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Performance Input
// ============================================================================

/// Tonal mode of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[serde(alias = "Major")]
    Major,
    #[serde(alias = "Minor")]
    Minor,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => write!(f, "major"),
            Mode::Minor => write!(f, "minor"),
        }
    }
}

/// Feature vector produced by the external audio analyzer
///
/// Immutable once produced. Optional 0..1 descriptors are `None` when the analyzer could
/// not estimate them; consumers substitute neutral values rather than invent data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    /// Tempo in BPM (must be > 0)
    pub tempo: f64,
    /// Key tonic as spelled by the analyzer ("G", "F#", "Bb")
    pub key: String,
    pub mode: Mode,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub acousticness: Option<f64>,
    #[serde(default)]
    pub danceability: Option<f64>,
    /// Detected chords in order of appearance
    #[serde(default)]
    pub chord_set: Vec<String>,
    #[serde(default)]
    pub vibe_tags: Vec<String>,
    #[serde(default)]
    pub mood_tag: Option<String>,
    /// Performance is fingerpicked rather than strummed
    #[serde(default)]
    pub fingerstyle: bool,
}

impl FeatureVector {
    /// Minimal vector for a tempo/key/mode triple
    pub fn new(tempo: f64, key: impl Into<String>, mode: Mode) -> Self {
        Self {
            tempo,
            key: key.into(),
            mode,
            energy: None,
            valence: None,
            acousticness: None,
            danceability: None,
            chord_set: Vec::new(),
            vibe_tags: Vec::new(),
            mood_tag: None,
            fingerstyle: false,
        }
    }

    /// Check analyzer output invariants
    pub fn validate(&self) -> Result<(), String> {
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(format!("tempo must be a positive number, got {}", self.tempo));
        }
        let unit_fields = [
            ("energy", self.energy),
            ("valence", self.valence),
            ("acousticness", self.acousticness),
            ("danceability", self.danceability),
        ];
        for (name, value) in unit_fields {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(format!("{} must be within 0..1, got {}", name, v));
                }
            }
        }
        Ok(())
    }
}

/// Constellation hash: two spectral peaks and their temporal relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintHash {
    pub freq1: i32,
    pub freq2: i32,
    pub time_delta: i32,
}

impl FingerprintHash {
    pub fn new(freq1: i32, freq2: i32, time_delta: i32) -> Self {
        Self {
            freq1,
            freq2,
            time_delta,
        }
    }
}

/// Ordered hash sequence, present only when local fingerprinting succeeded
pub type FingerprintHashSet = Vec<FingerprintHash>;

/// Raw fingerprint for provider-side identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFingerprint {
    /// Recording duration in seconds
    pub duration_secs: f64,
    /// Compressed fingerprint blob as the identification provider expects it
    pub blob: String,
}

// ============================================================================
// Candidates
// ============================================================================

/// Learning difficulty level, ordered easiest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Position on the beginner → advanced scale
    pub fn ordinal(self) -> u8 {
        match self {
            Difficulty::Beginner => 0,
            Difficulty::Intermediate => 1,
            Difficulty::Advanced => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Musical data a provider actually reported for a track
///
/// Every field is optional: unknown stays unknown, nothing is synthesized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFeatures {
    pub tempo: Option<f64>,
    pub key: Option<String>,
    pub mode: Option<Mode>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub acousticness: Option<f64>,
    pub danceability: Option<f64>,
    #[serde(default)]
    pub chords: Vec<String>,
    /// Curated learning difficulty, when the catalog rates it
    pub difficulty: Option<Difficulty>,
    /// Reference constellation hashes (local reference catalogs only)
    #[serde(default)]
    pub reference_hashes: FingerprintHashSet,
}

/// A track under consideration for recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
    pub provider_track_id: String,
    pub provider_features: Option<ProviderFeatures>,
    /// Provider popularity (play count, search score), 0 when unknown
    pub popularity_signal: u64,
    pub genre: Option<String>,
    #[serde(default)]
    pub mood_tags: Vec<String>,
    #[serde(default)]
    pub vibe_tags: Vec<String>,
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl Candidate {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        provider_track_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: None,
            artwork_url: None,
            provider_track_id: provider_track_id.into(),
            provider_features: None,
            popularity_signal: 0,
            genre: None,
            mood_tags: Vec::new(),
            vibe_tags: Vec::new(),
            techniques: Vec::new(),
            difficulty: Difficulty::default(),
        }
    }

    /// Minimal record built from an identification hit alone
    pub fn from_track_ref(track: &TrackRef) -> Self {
        Self::new(
            track.title.clone().unwrap_or_else(|| "Unknown Title".to_string()),
            track.artist.clone().unwrap_or_else(|| "Unknown Artist".to_string()),
            track.id.clone(),
        )
    }

    /// Case-insensitive (artist, title) identity used for deduplication
    pub fn dedup_key(&self) -> String {
        format!(
            "{}\u{1f}{}",
            self.artist.trim().to_lowercase(),
            self.title.trim().to_lowercase()
        )
    }

    pub fn has_artwork(&self) -> bool {
        self.artwork_url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    pub fn tempo(&self) -> Option<f64> {
        self.provider_features.as_ref().and_then(|f| f.tempo)
    }

    pub fn key(&self) -> Option<&str> {
        self.provider_features.as_ref().and_then(|f| f.key.as_deref())
    }

    pub fn rated_difficulty(&self) -> Option<Difficulty> {
        self.provider_features.as_ref().and_then(|f| f.difficulty)
    }

    pub fn chords(&self) -> &[String] {
        self.provider_features
            .as_ref()
            .map(|f| f.chords.as_slice())
            .unwrap_or(&[])
    }
}

/// Provider reference to a track returned by fingerprint identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRef {
    /// Provider-side identifier (e.g. MusicBrainz Recording MBID)
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
}

/// One fingerprint-identification hit
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintHit {
    /// Provider match score (0.0-1.0)
    pub score: f64,
    pub track: TrackRef,
}

/// Per-candidate enrichment fetched from a metadata provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackEnrichment {
    pub artwork_url: Option<String>,
    pub genre: Option<String>,
    /// Lowercased descriptive tags
    pub tags: Vec<String>,
    pub popularity: Option<u64>,
}

// ============================================================================
// Outputs
// ============================================================================

/// How an identification was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentificationSource {
    Fingerprint,
    FeatureSearch,
}

/// Outcome of the identification chain when a provider match cleared the usability bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationResult {
    pub identified: bool,
    /// 0..=100
    pub confidence: u8,
    pub candidate: Candidate,
    pub message: String,
    pub source: IdentificationSource,
}

/// Per-axis contributions to a match score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub tempo: f64,
    pub key: f64,
    pub chords: f64,
    pub vibe: f64,
    pub mood: f64,
    pub user_preference: f64,
    pub difficulty: f64,
}

impl ScoreBreakdown {
    /// Additive total across all axes
    pub fn total(&self) -> f64 {
        self.tempo
            + self.key
            + self.chords
            + self.vibe
            + self.mood
            + self.user_preference
            + self.difficulty
    }
}

/// Candidate with its relative match score and human-readable reasons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// Relative ordering value, never a probability
    pub match_score: f64,
    pub match_reasons: Vec<String>,
    pub breakdown: ScoreBreakdown,
}

/// Listening/playing history summary, owned by an external store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub average_tempo: Option<f64>,
    pub favorite_keys: HashMap<String, u32>,
    pub common_chords: HashMap<String, u32>,
    pub genre_counts: HashMap<String, u32>,
    pub mood_counts: HashMap<String, u32>,
}

/// One `Recommend` invocation's input
#[derive(Debug, Clone, Default)]
pub struct RecommendRequest {
    pub features: Option<FeatureVector>,
    pub fingerprint: Option<RawFingerprint>,
    pub local_hashes: Option<FingerprintHashSet>,
    pub mood: Option<String>,
    /// Profile supplied directly by the caller; wins over `user_id`
    pub user_profile: Option<UserProfile>,
    /// Profile looked up through the configured store
    pub user_id: Option<String>,
}

impl RecommendRequest {
    pub fn for_features(features: FeatureVector) -> Self {
        Self {
            features: Some(features),
            ..Default::default()
        }
    }
}

/// `Recommend` output
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub request_id: Uuid,
    pub identification: Option<IdentificationResult>,
    pub recommendations: Vec<ScoredCandidate>,
}

// ============================================================================
// Provider Errors
// ============================================================================

/// Provider failure taxonomy
///
/// Every variant is recovered locally: the identification chain advances, the aggregator
/// skips a source, or enrichment degrades one candidate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network failure, timeout, rate limiting, auth or 5xx
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Provider answered but had nothing for this query
    #[error("Provider returned no result: {0}")]
    Empty(String),

    /// Payload did not match the expected shape
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}
