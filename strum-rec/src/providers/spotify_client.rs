//! Spotify Client
//!
//! Second feature-search backend: catalog search plus audio features for the hits.
//!
//! Client-credentials tokens are owned by an explicit [`TokenCache`] injected into the
//! client, refreshed 60 s before the provider-declared expiry.
//!
//! # API Reference
//! - Token: https://accounts.spotify.com/api/token
//! - Search: https://api.spotify.com/v1/search
//! - Audio features: https://api.spotify.com/v1/audio-features

use crate::providers::{
    check_status, decode_json, http_client, rate_limiter, transport_error, DirectRateLimiter,
    FeatureSearchProvider,
};
use crate::services::genre_mapper::resolve_fallback_genre;
use crate::services::key_relations::pitch_name;
use crate::types::{Candidate, FeatureVector, Mode, ProviderError, ProviderFeatures};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_URL: &str = "https://api.spotify.com/v1";

/// Tokens are treated as expired this long before the declared expiry
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Spotify allows at most 50 search results per page
const MAX_SEARCH_LIMIT: usize = 50;

const REQUESTS_PER_SECOND: u32 = 5;

const PROVIDER: &str = "Spotify";

// ============================================================================
// Token Cache
// ============================================================================

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Client-credentials token cache
///
/// Owns the credentials and the current token. Concurrent callers serialize on the
/// refresh so only one token request is in flight.
pub struct TokenCache {
    client_id: String,
    client_secret: String,
    token_url: String,
    current: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: TOKEN_URL.to_string(),
            current: Mutex::new(None),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Valid access token, fetching a new one when missing or about to expire
    pub async fn access_token(&self, http: &Client) -> Result<String, ProviderError> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting new Spotify access token");
        let credentials = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));

        let response = http
            .post(&self.token_url)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", credentials))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response)
            .map_err(|e| ProviderError::Unavailable(format!("Spotify auth failed: {}", e)))?;
        let body: TokenResponse = decode_json(PROVIDER, response).await?;

        let token = store_token(body, Instant::now());
        let access_token = token.access_token.clone();
        *current = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token (e.g. after a 401)
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}

fn store_token(response: TokenResponse, now: Instant) -> CachedToken {
    let lifetime = Duration::from_secs(response.expires_in).saturating_sub(REFRESH_MARGIN);
    CachedToken {
        access_token: response.access_token,
        refresh_at: now + lifetime,
    }
}

// ============================================================================
// Client
// ============================================================================

/// Spotify Client
pub struct SpotifyClient {
    http_client: Client,
    tokens: TokenCache,
    rate_limiter: DirectRateLimiter,
    base_url: String,
}

impl SpotifyClient {
    pub fn new(tokens: TokenCache) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client(None)?,
            tokens,
            rate_limiter: rate_limiter(REQUESTS_PER_SECOND),
            base_url: API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let token = self.tokens.access_token(&self.http_client).await?;
        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        let response = check_status(PROVIDER, response)?;
        decode_json(PROVIDER, response).await
    }
}

#[async_trait]
impl FeatureSearchProvider for SpotifyClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn search_by_feature_vector(
        &self,
        features: &FeatureVector,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        let genre = resolve_fallback_genre(features.mood_tag.as_deref(), features);
        let query = format!("genre:{}", genre);
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT).to_string();

        debug!(query = %query, "Searching Spotify tracks");
        let search: SearchResponse = self
            .get("/search", &[("q", query.as_str()), ("type", "track"), ("limit", limit.as_str())])
            .await?;

        let tracks = search.tracks.items;
        if tracks.is_empty() {
            return Err(ProviderError::Empty(format!("Spotify search for {} returned nothing", genre)));
        }

        let ids = tracks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>().join(",");
        let audio_features = match self
            .get::<AudioFeaturesResponse>("/audio-features", &[("ids", ids.as_str())])
            .await
        {
            Ok(response) => response.audio_features.into_iter().flatten().collect(),
            Err(e) => {
                warn!(provider = PROVIDER, error = %e, "Audio features unavailable, features stay unknown");
                Vec::new()
            }
        };

        Ok(normalize_tracks(tracks, audio_features))
    }
}

/// Join search hits with their audio features
fn normalize_tracks(tracks: Vec<SpotifyTrack>, features: Vec<AudioFeatures>) -> Vec<Candidate> {
    let mut by_id: HashMap<String, AudioFeatures> =
        features.into_iter().map(|f| (f.id.clone(), f)).collect();

    tracks
        .into_iter()
        .map(|track| {
            let artist = if track.artists.is_empty() {
                "Unknown Artist".to_string()
            } else {
                track
                    .artists
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let mut candidate = Candidate::new(track.name, artist, track.id.clone());
            candidate.album = track.album.as_ref().map(|a| a.name.clone());
            candidate.artwork_url = track
                .album
                .as_ref()
                .and_then(|a| a.images.first())
                .map(|img| img.url.clone());
            candidate.popularity_signal = track.popularity.unwrap_or(0);
            candidate.provider_features = by_id.remove(&track.id).map(to_provider_features);
            candidate
        })
        .collect()
}

fn to_provider_features(features: AudioFeatures) -> ProviderFeatures {
    ProviderFeatures {
        tempo: features.tempo.filter(|t| *t > 0.0),
        // -1 means no key detected
        key: features.key.and_then(pitch_name).map(str::to_string),
        mode: features.mode.map(|m| if m == 1 { Mode::Major } else { Mode::Minor }),
        energy: features.energy,
        valence: features.valence,
        acousticness: features.acousticness,
        danceability: features.danceability,
        ..Default::default()
    }
}

// ============================================================================
// Spotify API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    album: Option<SpotifyAlbum>,
    popularity: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    name: String,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct AudioFeaturesResponse {
    #[serde(default)]
    audio_features: Vec<Option<AudioFeatures>>,
}

#[derive(Debug, Deserialize)]
struct AudioFeatures {
    id: String,
    tempo: Option<f64>,
    key: Option<i64>,
    mode: Option<i64>,
    energy: Option<f64>,
    valence: Option<f64>,
    acousticness: Option<f64>,
    danceability: Option<f64>,
}
