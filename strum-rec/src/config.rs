//! Engine configuration for strum-rec
//!
//! Compiled defaults, overridable field-by-field from the `[engine]` TOML section.

use strum_common::config::EngineToml;
use tracing::warn;

/// Tunables for one recommendation engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Final list length (default 10)
    pub max_results: usize,
    /// Similar-track fetch cap (default 30)
    pub similar_limit: usize,
    /// Similar tracks must exceed this popularity signal (default 100,000)
    pub popularity_floor: u64,
    /// Genre fallback kicks in below this many candidates (default 10)
    pub min_candidates: usize,
    /// Popular-by-genre fetch cap (default 50)
    pub genre_limit: usize,
    /// Feature-search fetch cap for identification (default 25)
    pub feature_search_limit: usize,
    /// Feature-search identification must exceed this similarity (default 60)
    pub min_usable_similarity: u8,
    /// Concurrent enrichment batch size (default 10)
    pub enrichment_batch_size: usize,
    /// Allowed time-delta difference when matching hashes (default 5)
    pub fingerprint_time_window: i32,
    /// Query hashes considered per match (default 100)
    pub max_query_hashes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            similar_limit: 30,
            popularity_floor: 100_000,
            min_candidates: 10,
            genre_limit: 50,
            feature_search_limit: 25,
            min_usable_similarity: 60,
            enrichment_batch_size: 10,
            fingerprint_time_window: 5,
            max_query_hashes: 100,
        }
    }
}

impl EngineConfig {
    /// Apply TOML overrides on top of the compiled defaults
    ///
    /// Zero-sized batches and result lists are rejected with a warning.
    pub fn from_toml(overrides: &EngineToml) -> Self {
        let defaults = Self::default();
        let config = Self {
            max_results: overrides.max_results.unwrap_or(defaults.max_results),
            similar_limit: overrides.similar_limit.unwrap_or(defaults.similar_limit),
            popularity_floor: overrides.popularity_floor.unwrap_or(defaults.popularity_floor),
            min_candidates: overrides.min_candidates.unwrap_or(defaults.min_candidates),
            genre_limit: overrides.genre_limit.unwrap_or(defaults.genre_limit),
            feature_search_limit: overrides
                .feature_search_limit
                .unwrap_or(defaults.feature_search_limit),
            min_usable_similarity: overrides
                .min_usable_similarity
                .unwrap_or(defaults.min_usable_similarity)
                .min(100),
            enrichment_batch_size: overrides
                .enrichment_batch_size
                .unwrap_or(defaults.enrichment_batch_size),
            fingerprint_time_window: overrides
                .fingerprint_time_window
                .unwrap_or(defaults.fingerprint_time_window),
            max_query_hashes: overrides.max_query_hashes.unwrap_or(defaults.max_query_hashes),
        };
        config.sanitized()
    }

    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_results == 0 {
            warn!("engine.max_results = 0 is invalid, using {}", defaults.max_results);
            self.max_results = defaults.max_results;
        }
        if self.enrichment_batch_size == 0 {
            warn!(
                "engine.enrichment_batch_size = 0 is invalid, using {}",
                defaults.enrichment_batch_size
            );
            self.enrichment_batch_size = defaults.enrichment_batch_size;
        }
        if self.fingerprint_time_window < 0 {
            warn!(
                "engine.fingerprint_time_window < 0 is invalid, using {}",
                defaults.fingerprint_time_window
            );
            self.fingerprint_time_window = defaults.fingerprint_time_window;
        }
        self
    }
}
