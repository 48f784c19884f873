//! Identification chain transition tests
//!
//! Each scenario asserts the full state trace, not only the terminal state.

mod helpers;

use helpers::*;
use std::sync::Arc;
use strum_rec::providers::ProviderSet;
use strum_rec::types::{IdentificationSource, RawFingerprint};
use strum_rec::workflow::{ChainInput, ChainState, IdentificationChain};
use strum_rec::EngineConfig;

use ChainState::*;

fn fingerprint() -> RawFingerprint {
    RawFingerprint {
        duration_secs: 42.0,
        blob: "AQAAT0mUaEkSRZEGAAAA".to_string(),
    }
}

#[tokio::test]
async fn test_fingerprint_hit_identifies_directly() {
    let search = Arc::new(MockCandidates::empty());
    let providers = ProviderSet {
        fingerprint: Some(Arc::new(MockIdentifier::returning(vec![hit(
            0.954, "mbid-1", "Wonderwall", "Oasis",
        )]))),
        feature_search: vec![search.clone()],
        ..Default::default()
    };
    let config = EngineConfig::default();
    let features = reference_features();
    let fp = fingerprint();

    let outcome = IdentificationChain::new(&providers, &config)
        .run(ChainInput {
            features: &features,
            fingerprint: Some(&fp),
            local_hashes: None,
        })
        .await;

    assert_eq!(outcome.trace, vec![Start, TryFingerprint, Identified]);
    let identification = outcome.identification.expect("identified");
    assert_eq!(identification.confidence, 95);
    assert_eq!(identification.message, "Identified as \"Wonderwall\" by Oasis");
    assert_eq!(search.call_count(), 0);
}

#[tokio::test]
async fn test_empty_fingerprint_hits_fall_through() {
    let providers = ProviderSet {
        fingerprint: Some(Arc::new(MockIdentifier::returning(Vec::new()))),
        feature_search: vec![Arc::new(MockCandidates::empty())],
        ..Default::default()
    };
    let config = EngineConfig::default();
    let features = reference_features();
    let fp = fingerprint();

    let outcome = IdentificationChain::new(&providers, &config)
        .run(ChainInput {
            features: &features,
            fingerprint: Some(&fp),
            local_hashes: None,
        })
        .await;

    assert!(outcome.identification.is_none());
    assert_eq!(
        outcome.trace,
        vec![Start, TryFingerprint, TryFeatureSearch, NoMatch]
    );
}

#[tokio::test]
async fn test_fingerprint_error_advances_to_feature_search() {
    let providers = ProviderSet {
        fingerprint: Some(Arc::new(MockIdentifier::failing())),
        feature_search: vec![Arc::new(MockCandidates::returning(vec![
            candidate_with_features("Tempo Twin", "Duo", 85.0, "G"),
        ]))],
        ..Default::default()
    };
    let config = EngineConfig::default();
    let features = reference_features();
    let fp = fingerprint();

    let outcome = IdentificationChain::new(&providers, &config)
        .run(ChainInput {
            features: &features,
            fingerprint: Some(&fp),
            local_hashes: None,
        })
        .await;

    assert_eq!(
        outcome.trace,
        vec![Start, TryFingerprint, TryFeatureSearch, Identified]
    );
    let identification = outcome.identification.expect("identified");
    assert_eq!(identification.source, IdentificationSource::FeatureSearch);
    assert_eq!(identification.message, "Closest match: \"Tempo Twin\" by Duo");
}

#[tokio::test]
async fn test_without_fingerprint_starts_at_feature_search() {
    let identifier = Arc::new(MockIdentifier::returning(vec![hit(0.9, "x", "X", "Y")]));
    let providers = ProviderSet {
        fingerprint: Some(identifier.clone()),
        ..Default::default()
    };
    let config = EngineConfig::default();
    let features = reference_features();

    let outcome = IdentificationChain::new(&providers, &config)
        .run(ChainInput {
            features: &features,
            fingerprint: None,
            local_hashes: None,
        })
        .await;

    assert_eq!(outcome.trace, vec![Start, TryFeatureSearch, NoMatch]);
    assert_eq!(identifier.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_low_similarity_is_no_match() {
    // Unknown features score 50, below the default threshold of 60
    let providers = ProviderSet {
        feature_search: vec![Arc::new(MockCandidates::returning(vec![
            candidate("Mystery", "Someone", 0),
            candidate("Enigma", "Someone Else", 0),
        ]))],
        ..Default::default()
    };
    let config = EngineConfig::default();
    let features = reference_features();

    let outcome = IdentificationChain::new(&providers, &config)
        .run(ChainInput {
            features: &features,
            fingerprint: None,
            local_hashes: None,
        })
        .await;

    assert!(outcome.identification.is_none());
    assert_eq!(outcome.trace.last(), Some(&NoMatch));
}

#[tokio::test]
async fn test_failing_backend_falls_through_to_next() {
    let second = Arc::new(MockCandidates::returning(vec![candidate_with_features(
        "Backup Find",
        "Second Source",
        84.0,
        "G",
    )]));
    let providers = ProviderSet {
        feature_search: vec![Arc::new(MockCandidates::failing()), second.clone()],
        ..Default::default()
    };
    let config = EngineConfig::default();
    let features = reference_features();

    let outcome = IdentificationChain::new(&providers, &config)
        .run(ChainInput {
            features: &features,
            fingerprint: None,
            local_hashes: None,
        })
        .await;

    assert_eq!(outcome.trace, vec![Start, TryFeatureSearch, Identified]);
    assert_eq!(second.call_count(), 1);
    assert_eq!(
        outcome.identification.expect("identified").candidate.title,
        "Backup Find"
    );
}

#[tokio::test]
async fn test_raised_threshold_rejects_good_match() {
    let providers = ProviderSet {
        feature_search: vec![Arc::new(MockCandidates::returning(vec![
            candidate_with_features("Tempo Twin", "Duo", 85.0, "G"),
        ]))],
        ..Default::default()
    };
    let config = EngineConfig {
        min_usable_similarity: 90,
        ..Default::default()
    };
    let features = reference_features();

    let outcome = IdentificationChain::new(&providers, &config)
        .run(ChainInput {
            features: &features,
            fingerprint: None,
            local_hashes: None,
        })
        .await;

    assert!(outcome.identification.is_none());
}

#[tokio::test]
async fn test_unusable_backend_falls_through_to_next() {
    let featureless = Arc::new(MockCandidates::returning(vec![candidate(
        "No Data", "Someone", 0,
    )]));
    let with_features = Arc::new(MockCandidates::returning(vec![candidate_with_features(
        "Tempo Twin",
        "Duo",
        85.0,
        "G",
    )]));
    let providers = ProviderSet {
        feature_search: vec![featureless.clone(), with_features.clone()],
        ..Default::default()
    };
    let config = EngineConfig::default();
    let features = reference_features();

    let outcome = IdentificationChain::new(&providers, &config)
        .run(ChainInput {
            features: &features,
            fingerprint: None,
            local_hashes: None,
        })
        .await;

    assert_eq!(outcome.trace, vec![Start, TryFeatureSearch, Identified]);
    assert_eq!(featureless.call_count(), 1);
    assert_eq!(with_features.call_count(), 1);
    let identification = outcome.identification.expect("identified");
    assert_eq!(identification.candidate.title, "Tempo Twin");
    assert_eq!(identification.confidence, 85);
}

#[tokio::test]
async fn test_usable_first_backend_skips_the_rest() {
    let first = Arc::new(MockCandidates::returning(vec![candidate_with_features(
        "Tempo Twin",
        "Duo",
        85.0,
        "G",
    )]));
    let second = Arc::new(MockCandidates::returning(vec![candidate_with_features(
        "Other", "Band", 85.0, "G",
    )]));
    let providers = ProviderSet {
        feature_search: vec![first, second.clone()],
        ..Default::default()
    };
    let config = EngineConfig::default();
    let features = reference_features();

    let outcome = IdentificationChain::new(&providers, &config)
        .run(ChainInput {
            features: &features,
            fingerprint: None,
            local_hashes: None,
        })
        .await;

    assert_eq!(
        outcome.identification.expect("identified").candidate.title,
        "Tempo Twin"
    );
    assert_eq!(second.call_count(), 0);
}
