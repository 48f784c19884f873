//! Test Helper Utilities
//!
//! Shared fixtures and scripted providers for testing strum-rec

#![allow(dead_code)]

pub mod mock_providers;

pub use mock_providers::{
    MockCandidates, MockEnricher, MockIdentifier, MockMetadata, MockProfiles,
};

use std::sync::Arc;
use strum_rec::providers::ProviderSet;
use strum_rec::types::{
    Candidate, FeatureVector, FingerprintHit, Mode, ProviderFeatures, TrackEnrichment, TrackRef,
};

/// The reference performance: G major, 85 bpm, mellow and nostalgic
pub fn reference_features() -> FeatureVector {
    let mut features = FeatureVector::new(85.0, "G", Mode::Major);
    features.chord_set = vec!["Em7".into(), "G".into(), "D".into(), "A7sus4".into()];
    features.vibe_tags = vec!["mellow".into(), "nostalgic".into()];
    features
}

/// Candidate with a popularity signal and no musical data
pub fn candidate(title: &str, artist: &str, popularity: u64) -> Candidate {
    let mut candidate = Candidate::new(title, artist, format!("{}-{}", artist, title));
    candidate.popularity_signal = popularity;
    candidate
}

/// Candidate with provider-reported tempo and key
pub fn candidate_with_features(title: &str, artist: &str, tempo: f64, key: &str) -> Candidate {
    let mut c = candidate(title, artist, 0);
    c.provider_features = Some(ProviderFeatures {
        tempo: Some(tempo),
        key: Some(key.to_string()),
        ..Default::default()
    });
    c
}

/// `n` distinct candidates named "<prefix> N"
pub fn candidates(prefix: &str, n: usize, popularity: u64) -> Vec<Candidate> {
    (0..n)
        .map(|i| candidate(&format!("{} {}", prefix, i), &format!("{} Artist {}", prefix, i), popularity))
        .collect()
}

pub fn hit(score: f64, id: &str, title: &str, artist: &str) -> FingerprintHit {
    FingerprintHit {
        score,
        track: TrackRef {
            id: id.to_string(),
            title: Some(title.to_string()),
            artist: Some(artist.to_string()),
        },
    }
}

/// Enrichment carrying artwork, a genre and descriptive tags
pub fn enrichment(genre: &str, tags: &[&str]) -> TrackEnrichment {
    TrackEnrichment {
        artwork_url: Some("https://img.example/cover.jpg".to_string()),
        genre: Some(genre.to_string()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        popularity: Some(250_000),
    }
}

/// Every capability wired to a provider that always fails
pub fn failing_provider_set() -> ProviderSet {
    let lists = Arc::new(MockCandidates::failing());
    ProviderSet {
        fingerprint: Some(Arc::new(MockIdentifier::failing())),
        metadata: Some(Arc::new(MockMetadata::failing())),
        feature_search: vec![lists.clone()],
        relatedness: Some(lists.clone()),
        genre_popularity: vec![lists],
        enricher: Some(Arc::new(MockEnricher::failing())),
        profiles: Some(Arc::new(MockProfiles::failing())),
    }
}
