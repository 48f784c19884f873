//! Provider capabilities and adapters
//!
//! The core consumes providers only through the capability traits below. Each adapter
//! normalizes its payloads into `Candidate` / `ProviderFeatures` / `TrackEnrichment` and
//! maps every failure into `ProviderError`, so nothing downstream branches on
//! provider-specific field names.
//!
//! # Capabilities
//! - `FingerprintIdentifier` → AcoustID
//! - `MetadataProvider` → MusicBrainz
//! - `FeatureSearchProvider` → MusicBrainz, Spotify, local catalog
//! - `GenrePopularityProvider` → local catalog, Last.fm
//! - `RelatednessProvider`, `TrackEnricher` → Last.fm
//! - `UserProfileStore` → JSON profile file

pub mod acoustid_client;
pub mod lastfm_client;
pub mod local_catalog;
pub mod musicbrainz_client;
pub mod profile_store;
pub mod spotify_client;

pub use acoustid_client::AcoustIdClient;
pub use lastfm_client::LastFmClient;
pub use local_catalog::LocalCatalog;
pub use musicbrainz_client::MusicBrainzClient;
pub use profile_store::JsonProfileStore;
pub use spotify_client::{SpotifyClient, TokenCache};

use crate::types::{
    Candidate, FeatureVector, FingerprintHit, ProviderError, TrackEnrichment, TrackRef,
    UserProfile,
};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use strum_common::config::ResolvedKeys;
use tracing::{info, warn};

// ============================================================================
// Capability Traits
// ============================================================================

/// Identify a recording from a raw fingerprint
#[async_trait]
pub trait FingerprintIdentifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Hits sorted by provider score, best first
    async fn identify_by_fingerprint(
        &self,
        duration_secs: f64,
        fingerprint: &str,
    ) -> Result<Vec<FingerprintHit>, ProviderError>;
}

/// Full metadata for an identified track
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_track_metadata(&self, track: &TrackRef) -> Result<Candidate, ProviderError>;
}

/// Catalog search driven only by a performance's features
#[async_trait]
pub trait FeatureSearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search_by_feature_vector(
        &self,
        features: &FeatureVector,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError>;
}

/// Tracks similar to a known (artist, title)
#[async_trait]
pub trait RelatednessProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search_similar_tracks(
        &self,
        artist: &str,
        title: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError>;
}

/// Popular tracks for a genre tag
#[async_trait]
pub trait GenrePopularityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search_popular_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError>;
}

/// Per-candidate artwork, genre and tag enrichment
#[async_trait]
pub trait TrackEnricher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn enrich_track(&self, candidate: &Candidate) -> Result<TrackEnrichment, ProviderError>;
}

/// Read-only access to listener history
#[async_trait]
pub trait UserProfileStore: Send + Sync {
    /// `Ok(None)` when the user has no history
    async fn read_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, ProviderError>;
}

// ============================================================================
// Provider Set
// ============================================================================

/// Providers wired into one engine
///
/// A capability left as `None` behaves as permanently unavailable.
#[derive(Clone, Default)]
pub struct ProviderSet {
    pub fingerprint: Option<Arc<dyn FingerprintIdentifier>>,
    pub metadata: Option<Arc<dyn MetadataProvider>>,
    /// Tried in order; the first backend whose best match is usable wins
    pub feature_search: Vec<Arc<dyn FeatureSearchProvider>>,
    pub relatedness: Option<Arc<dyn RelatednessProvider>>,
    /// Asked in order while the candidate pool is below the floor
    pub genre_popularity: Vec<Arc<dyn GenrePopularityProvider>>,
    pub enricher: Option<Arc<dyn TrackEnricher>>,
    pub profiles: Option<Arc<dyn UserProfileStore>>,
}

impl ProviderSet {
    /// Wire the real HTTP adapters for whichever credentials are present
    ///
    /// MusicBrainz and the local catalog need no key and are always wired; `catalog`
    /// replaces the bundled one. A client that fails to build is skipped with a warning.
    pub fn from_keys(
        keys: &ResolvedKeys,
        profiles_path: Option<&Path>,
        catalog: Option<LocalCatalog>,
    ) -> Self {
        let mut set = ProviderSet::default();

        let catalog = match catalog {
            Some(catalog) => Some(Arc::new(catalog)),
            None => match LocalCatalog::bundled() {
                Ok(catalog) => Some(Arc::new(catalog)),
                Err(e) => {
                    warn!(provider = "Local catalog", error = %e, "Catalog unavailable");
                    None
                }
            },
        };
        if let Some(catalog) = catalog.as_ref() {
            set.genre_popularity.push(catalog.clone());
        }

        match MusicBrainzClient::new() {
            Ok(client) => {
                let client = Arc::new(client);
                set.metadata = Some(client.clone());
                set.feature_search.push(client);
            }
            Err(e) => warn!(provider = "MusicBrainz", error = %e, "Client unavailable"),
        }

        if let Some(key) = keys.acoustid.as_deref() {
            match AcoustIdClient::new(key) {
                Ok(client) => set.fingerprint = Some(Arc::new(client)),
                Err(e) => warn!(provider = "AcoustID", error = %e, "Client unavailable"),
            }
        } else {
            info!("No AcoustID API key configured, fingerprint identification disabled");
        }

        if let (Some(id), Some(secret)) = (
            keys.spotify_client_id.as_deref(),
            keys.spotify_client_secret.as_deref(),
        ) {
            match SpotifyClient::new(TokenCache::new(id, secret)) {
                Ok(client) => set.feature_search.push(Arc::new(client)),
                Err(e) => warn!(provider = "Spotify", error = %e, "Client unavailable"),
            }
        }

        if let Some(key) = keys.lastfm.as_deref() {
            match LastFmClient::new(key) {
                Ok(client) => {
                    let client = Arc::new(client);
                    set.relatedness = Some(client.clone());
                    set.genre_popularity.push(client.clone());
                    set.enricher = Some(client);
                }
                Err(e) => warn!(provider = "Last.fm", error = %e, "Client unavailable"),
            }
        } else {
            info!("No Last.fm API key configured, candidate aggregation disabled");
        }

        if let Some(catalog) = catalog {
            set.feature_search.push(catalog);
        }

        if let Some(path) = profiles_path {
            set.profiles = Some(Arc::new(JsonProfileStore::new(path)));
        }

        set
    }
}

// ============================================================================
// Shared HTTP plumbing
// ============================================================================

/// Default timeout for provider requests
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Direct (unkeyed) rate limiter shared by the HTTP adapters
pub type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter allowing `per_second` requests per second (at least 1)
pub(crate) fn rate_limiter(per_second: u32) -> DirectRateLimiter {
    let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(rate))
}

/// HTTP client with the adapter timeout and an optional User-Agent
pub(crate) fn http_client(user_agent: Option<&str>) -> Result<Client, ProviderError> {
    let mut builder = Client::builder().timeout(DEFAULT_TIMEOUT);
    if let Some(user_agent) = user_agent {
        builder = builder.user_agent(user_agent);
    }
    builder
        .build()
        .map_err(|e| ProviderError::Unavailable(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport-level error
pub(crate) fn transport_error(provider: &str, e: reqwest::Error) -> ProviderError {
    if e.is_decode() {
        ProviderError::Malformed(format!("{} response decode failed: {}", provider, e))
    } else {
        ProviderError::Unavailable(format!("{} request failed: {}", provider, e))
    }
}

/// Map an HTTP status to the error taxonomy
pub(crate) fn status_error(provider: &str, status: StatusCode) -> ProviderError {
    if status == StatusCode::NOT_FOUND {
        ProviderError::Empty(format!("{} returned 404", provider))
    } else {
        ProviderError::Unavailable(format!("{} returned HTTP {}", provider, status))
    }
}

/// Pass successful responses through, classify the rest
pub(crate) fn check_status(provider: &str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(status_error(provider, status))
    }
}

/// Decode a JSON body into `T`, shape mismatches become `Malformed`
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    provider: &str,
    response: Response,
) -> Result<T, ProviderError> {
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;
    serde_json::from_str(&body)
        .map_err(|e| ProviderError::Malformed(format!("{} payload: {}", provider, e)))
}
