//! Identification Chain
//!
//! Best-effort identification of the performed song.
//!
//! # States
//! ```text
//! Start ─┬─(raw fingerprint)──▶ TryFingerprint ──(hit)──▶ Identified
//!        │                           │
//!        │                      (empty/error)
//!        │                           ▼
//!        └──────────────────▶ TryFeatureSearch ─┬─(usable)──▶ Identified
//!                                               └──────────▶ NoMatch
//! ```
//!
//! Every provider error is logged and advances the chain; the chain always terminates in
//! `Identified` or `NoMatch`.

use crate::config::EngineConfig;
use crate::providers::ProviderSet;
use crate::services::confidence_assessor::{feature_similarity, ConfidenceAssessor, Evidence};
use crate::services::fingerprint_matcher::FingerprintMatcher;
use crate::types::{
    Candidate, FeatureVector, FingerprintHash, IdentificationResult, IdentificationSource,
    RawFingerprint,
};
use tracing::{debug, info, warn};

/// Identification chain states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Start,
    TryFingerprint,
    TryFeatureSearch,
    Identified,
    NoMatch,
}

impl ChainState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChainState::Identified | ChainState::NoMatch)
    }
}

/// What the chain is given
#[derive(Debug, Clone, Copy)]
pub struct ChainInput<'a> {
    pub features: &'a FeatureVector,
    pub fingerprint: Option<&'a RawFingerprint>,
    /// Locally computed constellation hashes, when fingerprinting succeeded
    pub local_hashes: Option<&'a [FingerprintHash]>,
}

/// Terminal result plus the states visited
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub identification: Option<IdentificationResult>,
    pub trace: Vec<ChainState>,
}

/// Identification chain over one provider set
pub struct IdentificationChain<'a> {
    providers: &'a ProviderSet,
    config: &'a EngineConfig,
    assessor: ConfidenceAssessor,
    matcher: FingerprintMatcher,
}

impl<'a> IdentificationChain<'a> {
    pub fn new(providers: &'a ProviderSet, config: &'a EngineConfig) -> Self {
        Self {
            providers,
            config,
            assessor: ConfidenceAssessor::new(),
            matcher: FingerprintMatcher::new(config.fingerprint_time_window, config.max_query_hashes),
        }
    }

    /// Run the chain to a terminal state
    pub async fn run(&self, input: ChainInput<'_>) -> ChainOutcome {
        let mut state = ChainState::Start;
        let mut trace = vec![state];
        let mut identification = None;

        while !state.is_terminal() {
            let next = match state {
                ChainState::Start => {
                    if input.fingerprint.is_some() {
                        ChainState::TryFingerprint
                    } else {
                        ChainState::TryFeatureSearch
                    }
                }
                ChainState::TryFingerprint => match self.try_fingerprint(&input).await {
                    Some(result) => {
                        identification = Some(result);
                        ChainState::Identified
                    }
                    None => ChainState::TryFeatureSearch,
                },
                ChainState::TryFeatureSearch => match self.try_feature_search(&input).await {
                    Some(result) => {
                        identification = Some(result);
                        ChainState::Identified
                    }
                    None => ChainState::NoMatch,
                },
                ChainState::Identified | ChainState::NoMatch => state,
            };

            debug!(from = ?state, to = ?next, "Identification chain transition");
            state = next;
            trace.push(state);
        }

        match &identification {
            Some(result) => info!(
                title = %result.candidate.title,
                artist = %result.candidate.artist,
                confidence = result.confidence,
                source = ?result.source,
                "Performance identified"
            ),
            None => info!("No identification, continuing with fallback recommendations"),
        }

        ChainOutcome {
            identification,
            trace,
        }
    }

    /// Provider fingerprint lookup, then full metadata for the top hit
    async fn try_fingerprint(&self, input: &ChainInput<'_>) -> Option<IdentificationResult> {
        let fingerprint = input.fingerprint?;
        let Some(identifier) = self.providers.fingerprint.as_ref() else {
            debug!("No fingerprint identifier configured");
            return None;
        };

        let hits = match identifier
            .identify_by_fingerprint(fingerprint.duration_secs, &fingerprint.blob)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(provider = identifier.name(), error = %e, "Fingerprint identification failed");
                return None;
            }
        };

        let top = hits.into_iter().next()?;

        let candidate = match self.providers.metadata.as_ref() {
            Some(metadata) => match metadata.fetch_track_metadata(&top.track).await {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!(
                        provider = metadata.name(),
                        error = %e,
                        "Metadata fetch failed, keeping minimal identification"
                    );
                    Candidate::from_track_ref(&top.track)
                }
            },
            None => Candidate::from_track_ref(&top.track),
        };

        let confidence = match self.local_evidence(input, &candidate) {
            Some(evidence) => self.assessor.assess(evidence),
            None => provider_confidence(top.score),
        };

        Some(IdentificationResult {
            identified: true,
            confidence,
            message: format!("Identified as \"{}\" by {}", candidate.title, candidate.artist),
            candidate,
            source: IdentificationSource::Fingerprint,
        })
    }

    /// Feature-only catalog search; backends are tried in order until one yields a usable match
    async fn try_feature_search(&self, input: &ChainInput<'_>) -> Option<IdentificationResult> {
        let threshold = f64::from(self.config.min_usable_similarity);
        let mut usable = None;

        for provider in &self.providers.feature_search {
            let found = match provider
                .search_by_feature_vector(input.features, self.config.feature_search_limit)
                .await
            {
                Ok(found) if !found.is_empty() => found,
                Ok(_) => {
                    debug!(provider = provider.name(), "Feature search returned nothing");
                    continue;
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Feature search failed");
                    continue;
                }
            };

            debug!(provider = provider.name(), count = found.len(), "Feature search results");
            let Some((candidate, similarity)) = best_by_similarity(input.features, found) else {
                continue;
            };
            if similarity > threshold {
                usable = Some((candidate, similarity));
                break;
            }
            debug!(
                provider = provider.name(),
                similarity,
                threshold = self.config.min_usable_similarity,
                "Best feature-search match below usability threshold"
            );
        }

        let (candidate, similarity) = usable?;

        let evidence = self.local_evidence(input, &candidate).unwrap_or(Evidence {
            fingerprint_match: None,
            feature_similarity: similarity,
        });

        Some(IdentificationResult {
            identified: true,
            confidence: self.assessor.assess(evidence).min(100),
            message: format!("Closest match: \"{}\" by {}", candidate.title, candidate.artist),
            candidate,
            source: IdentificationSource::FeatureSearch,
        })
    }

    /// Fingerprint + feature evidence when both local and reference hashes exist
    fn local_evidence(&self, input: &ChainInput<'_>, candidate: &Candidate) -> Option<Evidence> {
        let query = input.local_hashes.filter(|h| !h.is_empty())?;
        let features = candidate.provider_features.as_ref()?;
        if features.reference_hashes.is_empty() {
            return None;
        }

        let report = self.matcher.match_fingerprints(query, &features.reference_hashes);
        debug!(
            match_count = report.match_count,
            total_hashes = report.total_hashes,
            match_percentage = report.match_percentage,
            "Local fingerprint comparison"
        );

        Some(Evidence {
            fingerprint_match: Some(report.match_percentage),
            feature_similarity: feature_similarity(input.features, Some(features)),
        })
    }
}

/// Most similar candidate; the first one wins ties
fn best_by_similarity(
    features: &FeatureVector,
    candidates: Vec<Candidate>,
) -> Option<(Candidate, f64)> {
    let mut best: Option<(Candidate, f64)> = None;
    for candidate in candidates {
        let similarity = feature_similarity(features, candidate.provider_features.as_ref());
        if best.as_ref().map_or(true, |(_, s)| similarity > *s) {
            best = Some((candidate, similarity));
        }
    }
    best
}

/// Provider score (0.0-1.0) as a 0-100 confidence
pub fn provider_confidence(score: f64) -> u8 {
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_confidence() {
        assert_eq!(provider_confidence(0.954), 95);
        assert_eq!(provider_confidence(1.3), 100);
        assert_eq!(provider_confidence(-0.2), 0);
        assert_eq!(provider_confidence(f64::NAN), 0);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ChainState::Identified.is_terminal());
        assert!(ChainState::NoMatch.is_terminal());
        assert!(!ChainState::Start.is_terminal());
        assert!(!ChainState::TryFeatureSearch.is_terminal());
    }

    #[tokio::test]
    async fn test_no_providers_ends_in_no_match() {
        let providers = ProviderSet::default();
        let config = EngineConfig::default();
        let features = FeatureVector::new(85.0, "G", crate::types::Mode::Major);
        let fingerprint = RawFingerprint {
            duration_secs: 30.0,
            blob: "AQAA".into(),
        };

        let outcome = IdentificationChain::new(&providers, &config)
            .run(ChainInput {
                features: &features,
                fingerprint: Some(&fingerprint),
                local_hashes: None,
            })
            .await;

        assert!(outcome.identification.is_none());
        assert_eq!(
            outcome.trace,
            vec![
                ChainState::Start,
                ChainState::TryFingerprint,
                ChainState::TryFeatureSearch,
                ChainState::NoMatch
            ]
        );
    }
}
