//! Scripted provider doubles
//!
//! Each mock returns a fixed response (success, empty or failure) and counts calls so
//! tests can assert which capabilities the engine reached.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use strum_rec::providers::{
    FeatureSearchProvider, FingerprintIdentifier, GenrePopularityProvider, MetadataProvider,
    RelatednessProvider, TrackEnricher, UserProfileStore,
};
use strum_rec::types::{
    Candidate, FeatureVector, FingerprintHit, ProviderError, TrackEnrichment, TrackRef,
    UserProfile,
};

pub fn unavailable() -> ProviderError {
    ProviderError::Unavailable("scripted outage".to_string())
}

// ============================================================================
// Fingerprint identification
// ============================================================================

pub struct MockIdentifier {
    response: Result<Vec<FingerprintHit>, ProviderError>,
    pub calls: AtomicUsize,
}

impl MockIdentifier {
    pub fn returning(hits: Vec<FingerprintHit>) -> Self {
        Self {
            response: Ok(hits),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(unavailable()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FingerprintIdentifier for MockIdentifier {
    fn name(&self) -> &'static str {
        "mock-identifier"
    }

    async fn identify_by_fingerprint(
        &self,
        _duration_secs: f64,
        _fingerprint: &str,
    ) -> Result<Vec<FingerprintHit>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

// ============================================================================
// Metadata
// ============================================================================

pub struct MockMetadata {
    response: Result<Candidate, ProviderError>,
    pub calls: AtomicUsize,
    pub requested: Mutex<Vec<TrackRef>>,
}

impl MockMetadata {
    pub fn returning(candidate: Candidate) -> Self {
        Self {
            response: Ok(candidate),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(unavailable()),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MetadataProvider for MockMetadata {
    fn name(&self) -> &'static str {
        "mock-metadata"
    }

    async fn fetch_track_metadata(&self, track: &TrackRef) -> Result<Candidate, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(track.clone());
        self.response.clone()
    }
}

// ============================================================================
// Candidate lists (feature search, relatedness, genre popularity)
// ============================================================================

/// One scripted candidate-list provider implementing every list capability
pub struct MockCandidates {
    response: Result<Vec<Candidate>, ProviderError>,
    pub calls: AtomicUsize,
    /// Genres or "artist|title" seeds requested, in call order
    pub queries: Mutex<Vec<String>>,
}

impl MockCandidates {
    pub fn returning(candidates: Vec<Candidate>) -> Self {
        Self {
            response: Ok(candidates),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            response: Err(unavailable()),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn respond(&self, query: String, limit: usize) -> Result<Vec<Candidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query);
        self.response
            .clone()
            .map(|candidates| candidates.into_iter().take(limit).collect())
    }
}

#[async_trait]
impl FeatureSearchProvider for MockCandidates {
    fn name(&self) -> &'static str {
        "mock-feature-search"
    }

    async fn search_by_feature_vector(
        &self,
        features: &FeatureVector,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        self.respond(format!("features:{}", features.tempo), limit)
    }
}

#[async_trait]
impl RelatednessProvider for MockCandidates {
    fn name(&self) -> &'static str {
        "mock-relatedness"
    }

    async fn search_similar_tracks(
        &self,
        artist: &str,
        title: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        self.respond(format!("{}|{}", artist, title), limit)
    }
}

#[async_trait]
impl GenrePopularityProvider for MockCandidates {
    fn name(&self) -> &'static str {
        "mock-genre"
    }

    async fn search_popular_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        self.respond(genre.to_string(), limit)
    }
}

// ============================================================================
// Enrichment
// ============================================================================

pub struct MockEnricher {
    default: Option<TrackEnrichment>,
    by_title: HashMap<String, TrackEnrichment>,
    failing_titles: HashSet<String>,
    pub calls: AtomicUsize,
}

impl MockEnricher {
    /// Every candidate receives the same enrichment
    pub fn uniform(enrichment: TrackEnrichment) -> Self {
        Self {
            default: Some(enrichment),
            by_title: HashMap::new(),
            failing_titles: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every enrichment fails
    pub fn failing() -> Self {
        Self {
            default: None,
            by_title: HashMap::new(),
            failing_titles: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_title(mut self, title: &str, enrichment: TrackEnrichment) -> Self {
        self.by_title.insert(title.to_string(), enrichment);
        self
    }

    pub fn failing_for(mut self, title: &str) -> Self {
        self.failing_titles.insert(title.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackEnricher for MockEnricher {
    fn name(&self) -> &'static str {
        "mock-enricher"
    }

    async fn enrich_track(&self, candidate: &Candidate) -> Result<TrackEnrichment, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_titles.contains(&candidate.title) {
            return Err(unavailable());
        }
        self.by_title
            .get(&candidate.title)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(unavailable)
    }
}

// ============================================================================
// Profiles
// ============================================================================

pub struct MockProfiles {
    profiles: HashMap<String, UserProfile>,
    fail: bool,
}

impl MockProfiles {
    pub fn with(user_id: &str, profile: UserProfile) -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(user_id.to_string(), profile);
        Self {
            profiles,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            profiles: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl UserProfileStore for MockProfiles {
    async fn read_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, ProviderError> {
        if self.fail {
            return Err(unavailable());
        }
        Ok(self.profiles.get(user_id).cloned())
    }
}
