//! Local acoustic catalog
//!
//! Curated acoustic-guitar songs bundled with the crate (or loaded from a JSON file) that
//! carry the data remote providers rarely report: chords, key, tempo, difficulty and
//! playing techniques. Serves feature search and genre popularity without a network.
//!
//! Catalog entries look like:
//!
//! ```json
//! { "title": "Wonderwall", "artist": "Oasis", "difficulty": "beginner",
//!   "chords": ["Em7", "G", "Dsus4", "A7sus4"], "keySignature": "G major", "tempo": 87,
//!   "vibe": ["mellow"], "genre": ["rock", "britpop"], "mood": ["chill"],
//!   "techniques": ["strumming"] }
//! ```

use crate::providers::{FeatureSearchProvider, GenrePopularityProvider};
use crate::services::confidence_assessor::feature_similarity;
use crate::services::key_relations::{key_token, parse_key};
use crate::services::scorer::chord_overlap;
use crate::types::{Candidate, Difficulty, FeatureVector, Mode, ProviderError, ProviderFeatures};
use async_trait::async_trait;
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::Path;
use tracing::debug;

const PROVIDER: &str = "Local catalog";

/// Catalog compiled into the binary
const BUNDLED_CATALOG: &str = include_str!("../../data/acoustic_catalog.json");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    title: String,
    artist: String,
    difficulty: Option<Difficulty>,
    #[serde(default)]
    chords: Vec<String>,
    /// "G major", "A minor (capo 2)" or alternatives joined by " / "
    key_signature: Option<String>,
    tempo: Option<f64>,
    #[serde(default)]
    vibe: Vec<String>,
    #[serde(default)]
    genre: Vec<String>,
    #[serde(default)]
    mood: Vec<String>,
    #[serde(default)]
    techniques: Vec<String>,
}

impl CatalogEntry {
    /// Key in the short form the key classifier reads ("G", "Am", "G#m")
    fn key(&self) -> Option<(String, Mode)> {
        let signature = self.key_signature.as_deref()?;
        let primary = signature.split(" / ").next().unwrap_or(signature);
        let parsed = parse_key(primary, Mode::Major)?;
        let tonic = key_token(primary);
        let short = match parsed.mode {
            Mode::Major => tonic.to_string(),
            Mode::Minor => format!("{}m", tonic),
        };
        Some((short, parsed.mode))
    }

    fn in_genre(&self, genre: &str) -> bool {
        let genre = genre.trim().to_lowercase();
        self.genre.iter().any(|g| {
            let g = g.to_lowercase();
            g == genre || g.split('-').any(|part| part == genre)
        })
    }

    fn to_candidate(&self) -> Candidate {
        let (key, mode) = match self.key() {
            Some((key, mode)) => (Some(key), Some(mode)),
            None => (None, None),
        };

        let mut candidate = Candidate::new(
            self.title.clone(),
            self.artist.clone(),
            format!("catalog:{} - {}", self.artist, self.title),
        );
        candidate.provider_features = Some(ProviderFeatures {
            tempo: self.tempo,
            key,
            mode,
            chords: self.chords.clone(),
            difficulty: self.difficulty,
            ..Default::default()
        });
        candidate.genre = self.genre.first().cloned();
        candidate.mood_tags = self.mood.clone();
        candidate.vibe_tags = self.vibe.clone();
        candidate.techniques = self.techniques.clone();
        if self.techniques.iter().any(|t| t.contains("fingerpick"))
            && !candidate.techniques.iter().any(|t| t == "fingerpicking")
        {
            candidate.techniques.push("fingerpicking".to_string());
        }
        if let Some(difficulty) = self.difficulty {
            candidate.difficulty = difficulty;
        }
        candidate
    }
}

/// In-memory song catalog
pub struct LocalCatalog {
    entries: Vec<CatalogEntry>,
}

impl LocalCatalog {
    /// The catalog shipped with the crate
    pub fn bundled() -> Result<Self, ProviderError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)
            .map_err(|e| ProviderError::Malformed(format!("{} document: {}", PROVIDER, e)))?;
        Ok(Self { entries })
    }

    /// Load a catalog file in the bundled format
    pub async fn load(path: &Path) -> Result<Self, ProviderError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ProviderError::Unavailable(format!("{} {}: {}", PROVIDER, path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl FeatureSearchProvider for LocalCatalog {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    /// Closest entries by feature similarity, chord overlap breaking ties
    async fn search_by_feature_vector(
        &self,
        features: &FeatureVector,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        let mut ranked: Vec<(f64, f64, Candidate)> = self
            .entries
            .iter()
            .map(|entry| {
                let candidate = entry.to_candidate();
                let similarity =
                    feature_similarity(features, candidate.provider_features.as_ref());
                let overlap = chord_overlap(&features.chord_set, &entry.chords);
                (similarity, overlap, candidate)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
        });

        debug!(entries = ranked.len(), "Local catalog feature search");
        Ok(ranked.into_iter().take(limit).map(|(_, _, c)| c).collect())
    }
}

#[async_trait]
impl GenrePopularityProvider for LocalCatalog {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    /// Entries tagged with the genre, alone or as part of a compound ("indie-folk")
    async fn search_popular_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        let found: Vec<Candidate> = self
            .entries
            .iter()
            .filter(|entry| entry.in_genre(genre))
            .take(limit)
            .map(CatalogEntry::to_candidate)
            .collect();
        debug!(genre = %genre, found = found.len(), "Local catalog genre lookup");
        Ok(found)
    }
}
