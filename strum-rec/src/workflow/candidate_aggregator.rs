//! Candidate Aggregator
//!
//! Gathers recommendation candidates:
//! 1. Tracks similar to the identified song, above the popularity floor
//! 2. Popular tracks for a fallback genre while fewer than `min_candidates` were found,
//!    asking each genre backend in turn until the floor is reached
//! 3. Case-insensitive (artist, title) deduplication, first occurrence kept
//!
//! Relatedness results are gathered first, so they win collisions with genre results.

use crate::config::EngineConfig;
use crate::providers::{GenrePopularityProvider, ProviderSet};
use crate::services::genre_mapper::resolve_fallback_genre;
use crate::types::{Candidate, FeatureVector, IdentificationResult};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Aggregated candidates in discovery order
#[derive(Debug, Clone, Default)]
pub struct AggregatedCandidates {
    pub candidates: Vec<Candidate>,
    /// Genre used for the popularity fallback, when it ran
    pub fallback_genre: Option<&'static str>,
    pub similar_count: usize,
    pub genre_count: usize,
}

/// Candidate aggregator over one provider set
pub struct CandidateAggregator<'a> {
    providers: &'a ProviderSet,
    config: &'a EngineConfig,
}

impl<'a> CandidateAggregator<'a> {
    pub fn new(providers: &'a ProviderSet, config: &'a EngineConfig) -> Self {
        Self { providers, config }
    }

    pub async fn aggregate(
        &self,
        identification: Option<&IdentificationResult>,
        features: &FeatureVector,
        mood: Option<&str>,
    ) -> AggregatedCandidates {
        let mut gathered = Vec::new();
        let mut result = AggregatedCandidates::default();

        if let Some(identified) = identification {
            let similar = self.similar_tracks(&identified.candidate).await;
            result.similar_count = similar.len();
            gathered.extend(similar);
        }

        if gathered.len() < self.config.min_candidates {
            let genre = resolve_fallback_genre(mood, features);
            result.fallback_genre = Some(genre);
            if self.providers.genre_popularity.is_empty() {
                debug!("No genre-popularity provider configured");
            }
            for provider in &self.providers.genre_popularity {
                if gathered.len() >= self.config.min_candidates {
                    break;
                }
                let popular = self.popular_by_genre(provider.as_ref(), genre).await;
                result.genre_count += popular.len();
                gathered.extend(popular);
            }
        }

        result.candidates = dedupe(gathered);

        info!(
            similar = result.similar_count,
            genre = result.genre_count,
            fallback_genre = ?result.fallback_genre,
            unique = result.candidates.len(),
            "Candidates aggregated"
        );

        result
    }

    async fn similar_tracks(&self, seed: &Candidate) -> Vec<Candidate> {
        let Some(provider) = self.providers.relatedness.as_ref() else {
            debug!("No relatedness provider configured");
            return Vec::new();
        };

        match provider
            .search_similar_tracks(&seed.artist, &seed.title, self.config.similar_limit)
            .await
        {
            Ok(tracks) => tracks
                .into_iter()
                .take(self.config.similar_limit)
                .filter(|c| c.popularity_signal > self.config.popularity_floor)
                .collect(),
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "Similar-track lookup failed");
                Vec::new()
            }
        }
    }

    async fn popular_by_genre(
        &self,
        provider: &dyn GenrePopularityProvider,
        genre: &str,
    ) -> Vec<Candidate> {
        match provider
            .search_popular_by_genre(genre, self.config.genre_limit)
            .await
        {
            Ok(tracks) => tracks.into_iter().take(self.config.genre_limit).collect(),
            Err(e) => {
                warn!(provider = provider.name(), genre = %genre, error = %e, "Genre lookup failed");
                Vec::new()
            }
        }
    }
}

/// Drop later occurrences of the same (artist, title), ignoring case
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.dedup_key()))
        .collect()
}
