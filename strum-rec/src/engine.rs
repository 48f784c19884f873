//! Recommendation Engine
//!
//! The `Recommend` operation: identification → aggregation → enrichment + scoring in
//! batches → ranking. Holds no state across invocations; each call runs inside its own
//! `recommend` span carrying a fresh request id.

use crate::config::EngineConfig;
use crate::error::{RecommendError, RecommendResult};
use crate::providers::ProviderSet;
use crate::services::difficulty::estimate_performer_level;
use crate::services::ranker::rank;
use crate::services::scorer::{CandidateScorer, ScoringContext};
use crate::types::{Recommendation, RecommendRequest, UserProfile};
use crate::workflow::{CandidateAggregator, CandidateEnricher, ChainInput, IdentificationChain};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Recommendation engine over a fixed provider set
pub struct RecommendationEngine {
    providers: ProviderSet,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(providers: ProviderSet, config: EngineConfig) -> Self {
        Self { providers, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Identify the performance and rank songs to learn
    ///
    /// # Errors
    /// - `InputMissing` when no feature vector is supplied
    /// - `InvalidInput` when the feature vector violates analyzer invariants
    ///
    /// Provider failures never surface here; they only reduce what is returned.
    pub async fn recommend(&self, request: RecommendRequest) -> RecommendResult<Recommendation> {
        let request_id = Uuid::new_v4();
        let span = info_span!("recommend", request_id = %request_id);
        self.run(request_id, request).instrument(span).await
    }

    async fn run(
        &self,
        request_id: Uuid,
        request: RecommendRequest,
    ) -> RecommendResult<Recommendation> {
        let features = request
            .features
            .as_ref()
            .ok_or_else(|| RecommendError::InputMissing("feature vector is required".to_string()))?;
        features.validate().map_err(RecommendError::InvalidInput)?;

        let mood = request.mood.as_deref().or(features.mood_tag.as_deref());
        info!(
            tempo = features.tempo,
            key = %features.key,
            mode = %features.mode,
            mood = ?mood,
            has_fingerprint = request.fingerprint.is_some(),
            "Recommend started"
        );

        // Identification
        let outcome = IdentificationChain::new(&self.providers, &self.config)
            .run(ChainInput {
                features,
                fingerprint: request.fingerprint.as_ref(),
                local_hashes: request.local_hashes.as_deref(),
            })
            .await;
        let identification = outcome.identification;

        // Aggregation
        let aggregated = CandidateAggregator::new(&self.providers, &self.config)
            .aggregate(identification.as_ref(), features, mood)
            .await;

        // Scoring context
        let profile = self.resolve_profile(&request).await;
        let performer_level = estimate_performer_level(features);
        let scorer = CandidateScorer::new(ScoringContext::new(
            features,
            mood,
            profile.as_ref(),
            performer_level,
        ));
        debug!(performer_level = %performer_level, has_profile = profile.is_some(), "Scoring context ready");

        // Enrich and score batch by batch
        let enricher = CandidateEnricher::new(self.providers.enricher.clone());
        let mut remaining = aggregated.candidates.into_iter();
        let mut scored = Vec::new();
        loop {
            let batch: Vec<_> = remaining
                .by_ref()
                .take(self.config.enrichment_batch_size)
                .collect();
            if batch.is_empty() {
                break;
            }
            let enriched = enricher.enrich_batch(batch).await;
            scored.extend(enriched.into_iter().map(|candidate| scorer.score(candidate)));
        }

        let recommendations = rank(scored, self.config.max_results);

        info!(
            identified = identification.is_some(),
            recommendations = recommendations.len(),
            top_score = recommendations.first().map(|r| r.match_score),
            "Recommend complete"
        );

        Ok(Recommendation {
            request_id,
            identification,
            recommendations,
        })
    }

    /// Caller-supplied profile, else the store's profile for `user_id`
    async fn resolve_profile(&self, request: &RecommendRequest) -> Option<UserProfile> {
        if let Some(profile) = &request.user_profile {
            return Some(profile.clone());
        }
        let user_id = request.user_id.as_deref()?;
        let store = self.providers.profiles.as_ref()?;
        match store.read_user_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User profile unavailable");
                None
            }
        }
    }
}
