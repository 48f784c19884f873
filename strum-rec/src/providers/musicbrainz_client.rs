//! MusicBrainz Client
//!
//! Recording metadata by MBID and tag-based recording search.
//!
//! # API Reference
//! - Endpoint: https://musicbrainz.org/ws/2/recording
//! - Documentation: https://musicbrainz.org/doc/MusicBrainz_API
//! - Rate Limit: 1 request/second (as per MusicBrainz Terms of Service)
//!
//! MusicBrainz carries no audio features. Key and tempo are only reported when community
//! tags spell them out ("C major", "120 bpm"); otherwise they stay unknown.

use crate::providers::{
    check_status, decode_json, http_client, rate_limiter, transport_error, DirectRateLimiter,
    FeatureSearchProvider, MetadataProvider,
};
use crate::services::genre_mapper::resolve_fallback_genre;
use crate::services::key_relations::pitch_class;
use crate::types::{Candidate, FeatureVector, Mode, ProviderError, ProviderFeatures, TrackRef};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// MusicBrainz API base URL
const MUSICBRAINZ_API_URL: &str = "https://musicbrainz.org/ws/2";

/// Cover Art Archive base URL
const COVER_ART_URL: &str = "https://coverartarchive.org/release";

/// User-Agent header (required by MusicBrainz)
const USER_AGENT: &str = concat!(
    "StrumSense/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/strumsense/strumsense)"
);

/// Search results below this score are discarded
const MIN_SEARCH_SCORE: u64 = 85;

/// Search page size requested before filtering
const SEARCH_PAGE_SIZE: usize = 100;

const PROVIDER: &str = "MusicBrainz";

/// MusicBrainz Client
pub struct MusicBrainzClient {
    http_client: Client,
    /// 1 request/second
    rate_limiter: DirectRateLimiter,
    base_url: String,
}

impl MusicBrainzClient {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client(Some(USER_AGENT))?,
            rate_limiter: rate_limiter(1),
            base_url: MUSICBRAINZ_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response)?;
        decode_json(PROVIDER, response).await
    }
}

#[async_trait]
impl MetadataProvider for MusicBrainzClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_track_metadata(&self, track: &TrackRef) -> Result<Candidate, ProviderError> {
        debug!(recording_mbid = %track.id, "Querying MusicBrainz recording");

        let url = format!("{}/recording/{}", self.base_url, track.id);
        let recording: MbRecording = self
            .get(&url, &[("fmt", "json"), ("inc", "artists+releases+tags")])
            .await?;

        Ok(recording_to_candidate(recording))
    }
}

#[async_trait]
impl FeatureSearchProvider for MusicBrainzClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn search_by_feature_vector(
        &self,
        features: &FeatureVector,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        let genre = resolve_fallback_genre(features.mood_tag.as_deref(), features);
        let query = format!("tag:\"{}\"", genre);
        let page_size = SEARCH_PAGE_SIZE.to_string();

        debug!(query = %query, "Searching MusicBrainz recordings");

        let url = format!("{}/recording", self.base_url);
        let response: MbSearchResponse = self
            .get(&url, &[("query", query.as_str()), ("fmt", "json"), ("limit", page_size.as_str())])
            .await?;

        let candidates = filter_search_results(response, limit);
        if candidates.is_empty() {
            return Err(ProviderError::Empty(format!(
                "MusicBrainz search for {} returned no usable recordings",
                genre
            )));
        }
        Ok(candidates)
    }
}

/// Keep released, high-scoring recordings, best first
fn filter_search_results(response: MbSearchResponse, limit: usize) -> Vec<Candidate> {
    let mut recordings: Vec<MbRecording> = response
        .recordings
        .into_iter()
        .filter(|r| !r.releases.is_empty() && r.score.unwrap_or(0) >= MIN_SEARCH_SCORE)
        .collect();

    recordings.sort_by(|a, b| b.score.unwrap_or(0).cmp(&a.score.unwrap_or(0)));

    recordings
        .into_iter()
        .take(limit)
        .map(recording_to_candidate)
        .collect()
}

/// Normalize one recording
fn recording_to_candidate(recording: MbRecording) -> Candidate {
    let artist = if recording.artist_credit.is_empty() {
        "Unknown Artist".to_string()
    } else {
        recording
            .artist_credit
            .iter()
            .map(|credit| credit.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut candidate = Candidate::new(
        recording.title.unwrap_or_else(|| "Unknown Title".to_string()),
        artist,
        recording.id,
    );

    if let Some(release) = recording.releases.first() {
        candidate.album = release.title.clone();
        candidate.artwork_url = Some(format!("{}/{}/front", COVER_ART_URL, release.id));
    }

    let tag_names: Vec<&str> = recording.tags.iter().map(|t| t.name.as_str()).collect();
    let (key, mode) = key_from_tags(&tag_names).unzip();
    let tempo = tempo_from_tags(&tag_names);
    if key.is_some() || tempo.is_some() {
        candidate.provider_features = Some(ProviderFeatures {
            tempo,
            key,
            mode,
            ..Default::default()
        });
    }

    candidate.popularity_signal = recording.score.unwrap_or(0);
    candidate
}

/// First tag spelling a key ("C major", "f# minor")
fn key_from_tags(tags: &[&str]) -> Option<(String, Mode)> {
    tags.iter().find_map(|tag| {
        let lowered = tag.to_lowercase();
        let mode = if lowered.contains("minor") {
            Mode::Minor
        } else if lowered.contains("major") {
            Mode::Major
        } else {
            return None;
        };

        let spelled = lowered.trim_start_matches("key:").trim();
        let token = spelled.split_whitespace().next()?;
        pitch_class(token)?;

        let mut chars = token.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        let accidental: String = chars.take_while(|c| matches!(c, '#' | 'b')).take(1).collect();
        Some((format!("{}{}", letter, accidental), mode))
    })
}

/// First tag carrying a tempo ("120 bpm", "tempo: 96")
fn tempo_from_tags(tags: &[&str]) -> Option<f64> {
    tags.iter().find_map(|tag| {
        let lowered = tag.to_lowercase();
        if !(lowered.contains("bpm") || lowered.contains("tempo")) {
            return None;
        }
        let digits: String = lowered
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<f64>().ok().filter(|t| *t > 0.0)
    })
}

// ============================================================================
// MusicBrainz API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct MbSearchResponse {
    #[serde(default)]
    recordings: Vec<MbRecording>,
}

#[derive(Debug, Deserialize)]
struct MbRecording {
    id: String,
    title: Option<String>,
    /// Search relevance (search results only)
    score: Option<u64>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<MbArtistCredit>,
    #[serde(default)]
    releases: Vec<MbRelease>,
    #[serde(default)]
    tags: Vec<MbTag>,
}

#[derive(Debug, Deserialize)]
struct MbArtistCredit {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MbRelease {
    id: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MbTag {
    name: String,
}
