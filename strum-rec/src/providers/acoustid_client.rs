//! AcoustID Client
//!
//! Resolves a raw Chromaprint fingerprint to MusicBrainz recordings.
//!
//! # API Reference
//! - Endpoint: https://api.acoustid.org/v2/lookup
//! - Documentation: https://acoustid.org/webservice
//! - Rate limit: 3 requests/second

use crate::providers::{
    check_status, decode_json, http_client, rate_limiter, transport_error, DirectRateLimiter,
    FingerprintIdentifier,
};
use crate::types::{FingerprintHit, ProviderError, TrackRef};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// AcoustID API endpoint
const ACOUSTID_API_URL: &str = "https://api.acoustid.org/v2/lookup";

/// AcoustID requests per second
const REQUESTS_PER_SECOND: u32 = 3;

const PROVIDER: &str = "AcoustID";

/// AcoustID Client
pub struct AcoustIdClient {
    http_client: Client,
    api_key: String,
    rate_limiter: DirectRateLimiter,
    base_url: String,
}

impl AcoustIdClient {
    /// Create new AcoustID client for an application API key
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client(None)?,
            api_key: api_key.into(),
            rate_limiter: rate_limiter(REQUESTS_PER_SECOND),
            base_url: ACOUSTID_API_URL.to_string(),
        })
    }

    /// Point the client at a different lookup endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl FingerprintIdentifier for AcoustIdClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn identify_by_fingerprint(
        &self,
        duration_secs: f64,
        fingerprint: &str,
    ) -> Result<Vec<FingerprintHit>, ProviderError> {
        // AcoustID requires an integer duration
        let duration = (duration_secs.round() as i64).to_string();

        debug!(
            fingerprint_length = fingerprint.len(),
            duration = %duration,
            "Querying AcoustID API"
        );

        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .post(&self.base_url)
            .form(&[
                ("client", self.api_key.as_str()),
                ("duration", duration.as_str()),
                ("fingerprint", fingerprint),
                ("meta", "recordings"),
            ])
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response)?;
        let body: AcoustIdResponse = decode_json(PROVIDER, response).await?;
        parse_lookup(body)
    }
}

/// Normalize a lookup response into hits sorted by score, best first
fn parse_lookup(response: AcoustIdResponse) -> Result<Vec<FingerprintHit>, ProviderError> {
    if response.status != "ok" {
        return Err(ProviderError::Unavailable(format!(
            "AcoustID API error: {}",
            response
                .error
                .map_or("Unknown error".to_string(), |e| e.message)
        )));
    }

    let mut hits: Vec<FingerprintHit> = response
        .results
        .into_iter()
        .filter_map(|result| {
            let recording = result.recordings?.into_iter().next()?;
            Some(FingerprintHit {
                score: result.score,
                track: TrackRef {
                    id: recording.id,
                    title: recording.title,
                    artist: recording
                        .artists
                        .and_then(|artists| artists.into_iter().next())
                        .map(|a| a.name),
                },
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if hits.is_empty() {
        return Err(ProviderError::Empty(
            "AcoustID returned no recordings".to_string(),
        ));
    }

    debug!(
        best_score = hits[0].score,
        recording_mbid = %hits[0].track.id,
        "AcoustID match found"
    );

    Ok(hits)
}

// ============================================================================
// AcoustID API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct AcoustIdResponse {
    status: String,
    #[serde(default)]
    results: Vec<AcoustIdResult>,
    error: Option<AcoustIdError>,
}

#[derive(Debug, Deserialize)]
struct AcoustIdResult {
    score: f64,
    recordings: Option<Vec<AcoustIdRecording>>,
}

#[derive(Debug, Deserialize)]
struct AcoustIdRecording {
    id: String,
    title: Option<String>,
    artists: Option<Vec<AcoustIdArtist>>,
}

#[derive(Debug, Deserialize)]
struct AcoustIdArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AcoustIdError {
    message: String,
}
