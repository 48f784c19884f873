//! Batched candidate enrichment
//!
//! Each batch is enriched concurrently with `join_all` and fully resolves before it is
//! scored. Every candidate is owned by exactly one enrichment task and handed back
//! finished, so scoring never observes a half-written candidate.
//!
//! A failed enrichment degrades only its own candidate: artwork and genre are cleared,
//! difficulty falls back to the curated rating or intermediate.

use crate::providers::TrackEnricher;
use crate::services::difficulty::estimate_candidate_level;
use crate::types::{Candidate, Difficulty, TrackEnrichment};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tags that mark a song as fingerpicked
const FINGERPICKING_TAGS: [&str; 3] = ["fingerpicking", "fingerstyle", "fingerpicked"];

/// Enriches candidates through an optional enricher
pub struct CandidateEnricher {
    enricher: Option<Arc<dyn TrackEnricher>>,
}

impl CandidateEnricher {
    pub fn new(enricher: Option<Arc<dyn TrackEnricher>>) -> Self {
        Self { enricher }
    }

    /// Enrich one batch; output order matches input order
    pub async fn enrich_batch(&self, batch: Vec<Candidate>) -> Vec<Candidate> {
        let Some(enricher) = self.enricher.as_ref() else {
            return batch.into_iter().map(degrade).collect();
        };

        debug!(batch_size = batch.len(), "Enriching candidate batch");

        let tasks = batch.into_iter().map(|candidate| {
            let enricher = Arc::clone(enricher);
            async move {
                match enricher.enrich_track(&candidate).await {
                    Ok(enrichment) => apply_enrichment(candidate, enrichment),
                    Err(e) => {
                        warn!(
                            provider = enricher.name(),
                            artist = %candidate.artist,
                            title = %candidate.title,
                            error = %e,
                            "Enrichment failed, using defaults"
                        );
                        degrade(candidate)
                    }
                }
            }
        });

        join_all(tasks).await
    }
}

/// Merge enrichment into a candidate; the candidate's own values take precedence
pub fn apply_enrichment(mut candidate: Candidate, enrichment: TrackEnrichment) -> Candidate {
    if !candidate.has_artwork() {
        candidate.artwork_url = enrichment.artwork_url;
    }
    if candidate.genre.is_none() {
        candidate.genre = enrichment.genre;
    }
    if candidate.popularity_signal == 0 {
        candidate.popularity_signal = enrichment.popularity.unwrap_or(0);
    }

    for tag in enrichment.tags {
        let tag = tag.to_lowercase();
        if FINGERPICKING_TAGS.contains(&tag.as_str())
            && !candidate.techniques.iter().any(|t| t == "fingerpicking")
        {
            candidate.techniques.push("fingerpicking".to_string());
        }
        if !candidate.mood_tags.contains(&tag) {
            candidate.mood_tags.push(tag.clone());
        }
        if !candidate.vibe_tags.contains(&tag) {
            candidate.vibe_tags.push(tag);
        }
    }

    candidate.difficulty = candidate.rated_difficulty().unwrap_or_else(|| {
        estimate_candidate_level(candidate.tempo(), candidate.key(), candidate.genre.as_deref())
    });
    candidate
}

/// Defaults for a candidate whose enrichment is unavailable
fn degrade(mut candidate: Candidate) -> Candidate {
    candidate.artwork_url = None;
    candidate.genre = None;
    candidate.difficulty = candidate
        .rated_difficulty()
        .unwrap_or(Difficulty::Intermediate);
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProviderError, ProviderFeatures};
    use async_trait::async_trait;

    struct ScriptedEnricher;

    #[async_trait]
    impl TrackEnricher for ScriptedEnricher {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn enrich_track(
            &self,
            candidate: &Candidate,
        ) -> Result<TrackEnrichment, ProviderError> {
            if candidate.title.starts_with("fail") {
                return Err(ProviderError::Unavailable("boom".into()));
            }
            Ok(TrackEnrichment {
                artwork_url: Some(format!("https://img/{}.png", candidate.title)),
                genre: Some("folk".into()),
                tags: vec!["folk".into(), "Fingerstyle".into(), "mellow".into()],
                popularity: Some(42),
            })
        }
    }

    fn failing_with_own_fields() -> Candidate {
        let mut candidate = Candidate::new("fail-two", "b", "2");
        candidate.artwork_url = Some("https://own/fail-two.jpg".into());
        candidate.genre = Some("rock".into());
        candidate.mood_tags = vec!["chill".into()];
        candidate
    }

    #[tokio::test]
    async fn test_batch_isolates_failures_and_keeps_order() {
        let enricher = CandidateEnricher::new(Some(Arc::new(ScriptedEnricher)));
        let batch = vec![
            Candidate::new("one", "a", "1"),
            failing_with_own_fields(),
            Candidate::new("three", "c", "3"),
        ];

        let enriched = enricher.enrich_batch(batch).await;
        let titles: Vec<_> = enriched.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "fail-two", "three"]);

        assert_eq!(enriched[0].artwork_url.as_deref(), Some("https://img/one.png"));
        assert_eq!(enriched[0].genre.as_deref(), Some("folk"));
        assert_eq!(enriched[0].techniques, vec!["fingerpicking"]);
        assert!(enriched[0].vibe_tags.contains(&"mellow".to_string()));

        assert!(enriched[1].artwork_url.is_none());
        assert!(enriched[1].genre.is_none());
        assert_eq!(enriched[1].difficulty, Difficulty::Intermediate);
        assert_eq!(enriched[1].mood_tags, vec!["chill"]);
    }

    #[tokio::test]
    async fn test_failed_enrichment_keeps_curated_difficulty() {
        let enricher = CandidateEnricher::new(Some(Arc::new(ScriptedEnricher)));
        let mut candidate = Candidate::new("fail-rated", "a", "1");
        candidate.provider_features = Some(ProviderFeatures {
            difficulty: Some(Difficulty::Advanced),
            ..Default::default()
        });

        let enriched = enricher.enrich_batch(vec![candidate]).await;
        assert_eq!(enriched[0].difficulty, Difficulty::Advanced);
        assert!(enriched[0].artwork_url.is_none());
    }

    #[test]
    fn test_curated_difficulty_beats_estimate() {
        let mut candidate = Candidate::new("Wonderwall", "Oasis", "1");
        candidate.provider_features = Some(ProviderFeatures {
            tempo: Some(180.0),
            key: Some("Ebm".into()),
            difficulty: Some(Difficulty::Beginner),
            ..Default::default()
        });

        let enriched = apply_enrichment(candidate, TrackEnrichment::default());
        assert_eq!(enriched.difficulty, Difficulty::Beginner);
    }

    #[test]
    fn test_existing_fields_win() {
        let mut candidate = Candidate::new("t", "a", "1");
        candidate.artwork_url = Some("https://own/art.jpg".into());
        candidate.popularity_signal = 500_000;
        candidate.provider_features = Some(ProviderFeatures {
            tempo: Some(180.0),
            key: Some("Ebm".into()),
            ..Default::default()
        });

        let enriched = apply_enrichment(
            candidate,
            TrackEnrichment {
                artwork_url: Some("https://other.jpg".into()),
                genre: Some("jazz".into()),
                tags: vec![],
                popularity: Some(1),
            },
        );

        assert_eq!(enriched.artwork_url.as_deref(), Some("https://own/art.jpg"));
        assert_eq!(enriched.popularity_signal, 500_000);
        assert_eq!(enriched.difficulty, Difficulty::Advanced);
    }

    #[tokio::test]
    async fn test_without_enricher_candidates_are_degraded() {
        let enricher = CandidateEnricher::new(None);
        let mut candidate = Candidate::new("t", "a", "1");
        candidate.difficulty = Difficulty::Beginner;
        let enriched = enricher.enrich_batch(vec![candidate]).await;
        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].difficulty, Difficulty::Intermediate);
    }
}
