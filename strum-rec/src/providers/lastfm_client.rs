//! Last.fm Client
//!
//! Relatedness (`track.getSimilar`), genre popularity (`tag.getTopTracks`) and
//! per-candidate enrichment (`track.getInfo`).
//!
//! # API Reference
//! - Endpoint: https://ws.audioscrobbler.com/2.0/
//! - Documentation: https://www.last.fm/api
//!
//! Last.fm payloads are loosely typed: play counts arrive as strings or numbers, `artist`
//! is sometimes an object and sometimes a bare string, and errors can come back with
//! HTTP 200. Everything is normalized here.

use crate::providers::{
    check_status, decode_json, http_client, rate_limiter, transport_error, DirectRateLimiter,
    GenrePopularityProvider, RelatednessProvider, TrackEnricher,
};
use crate::types::{Candidate, ProviderError, TrackEnrichment};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Last.fm API endpoint
const LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Last.fm requests per second
const REQUESTS_PER_SECOND: u32 = 5;

/// Image sizes in order of preference
const IMAGE_PREFERENCE: [&str; 3] = ["extralarge", "large", "medium"];

/// Tag fragments that describe charts and playlists rather than music
const NOISE_TAG_FRAGMENTS: [&str; 5] = ["spotify", "playlist", "top 100", "charts", "billboard"];

/// Last.fm error code for unknown tracks/tags
const ERROR_NOT_FOUND: i64 = 6;

const PROVIDER: &str = "Last.fm";

/// Last.fm Client
pub struct LastFmClient {
    http_client: Client,
    api_key: String,
    rate_limiter: DirectRateLimiter,
    base_url: String,
}

impl LastFmClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client(None)?,
            api_key: api_key.into(),
            rate_limiter: rate_limiter(REQUESTS_PER_SECOND),
            base_url: LASTFM_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Call one API method, returning the raw JSON document
    async fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<Value, ProviderError> {
        self.rate_limiter.until_ready().await;

        let mut query: Vec<(&str, &str)> = vec![
            ("method", method),
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
        ];
        query.extend_from_slice(params);

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response)?;
        let body: Value = decode_json(PROVIDER, response).await?;
        check_api_error(method, body)
    }
}

#[async_trait]
impl RelatednessProvider for LastFmClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn search_similar_tracks(
        &self,
        artist: &str,
        title: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        debug!(artist = %artist, title = %title, "Fetching Last.fm similar tracks");
        let limit = limit.to_string();
        let body = self
            .call(
                "track.getsimilar",
                &[("artist", artist), ("track", title), ("limit", limit.as_str())],
            )
            .await?;
        parse_track_list(body, "similartracks")
    }
}

#[async_trait]
impl GenrePopularityProvider for LastFmClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn search_popular_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        debug!(genre = %genre, "Fetching Last.fm top tracks for tag");
        let limit_param = limit.to_string();
        let body = self
            .call("tag.gettoptracks", &[("tag", genre), ("limit", limit_param.as_str())])
            .await?;
        let mut candidates = parse_track_list(body, "tracks")?;
        candidates.truncate(limit);
        Ok(candidates)
    }
}

#[async_trait]
impl TrackEnricher for LastFmClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn enrich_track(&self, candidate: &Candidate) -> Result<TrackEnrichment, ProviderError> {
        let body = self
            .call(
                "track.getinfo",
                &[("artist", candidate.artist.as_str()), ("track", candidate.title.as_str())],
            )
            .await?;
        parse_track_info(body)
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Surface in-band API errors (`{"error": 6, "message": ...}`)
fn check_api_error(method: &str, body: Value) -> Result<Value, ProviderError> {
    let Some(code) = body.get("error").and_then(Value::as_i64) else {
        return Ok(body);
    };
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    if code == ERROR_NOT_FOUND {
        Err(ProviderError::Empty(format!("Last.fm {}: {}", method, message)))
    } else {
        Err(ProviderError::Unavailable(format!(
            "Last.fm {} error {}: {}",
            method, code, message
        )))
    }
}

/// Parse `{<wrapper>: {track: [...]}}` into candidates, keeping provider order
fn parse_track_list(body: Value, wrapper: &str) -> Result<Vec<Candidate>, ProviderError> {
    let tracks = body
        .get(wrapper)
        .and_then(|w| w.get("track"))
        .cloned()
        .ok_or_else(|| ProviderError::Malformed(format!("Last.fm response missing {}.track", wrapper)))?;

    // A single result may come back as a bare object
    let tracks: Vec<LfmTrack> = match tracks {
        Value::Array(_) => serde_json::from_value(tracks),
        Value::Object(_) => serde_json::from_value(tracks).map(|t| vec![t]),
        _ => Ok(Vec::new()),
    }
    .map_err(|e| ProviderError::Malformed(format!("Last.fm track list: {}", e)))?;

    Ok(tracks.into_iter().map(track_to_candidate).collect())
}

fn track_to_candidate(track: LfmTrack) -> Candidate {
    let id = track
        .mbid
        .filter(|m| !m.is_empty())
        .or(track.url.clone())
        .unwrap_or_else(|| format!("{} - {}", track.artist.name(), track.name));

    let mut candidate = Candidate::new(track.name, track.artist.name(), id);
    candidate.artwork_url = pick_image(&track.image);
    candidate.popularity_signal = track.playcount.unwrap_or(0);
    candidate
}

/// Parse `track.getInfo` into an enrichment record
fn parse_track_info(body: Value) -> Result<TrackEnrichment, ProviderError> {
    let track = body
        .get("track")
        .cloned()
        .ok_or_else(|| ProviderError::Empty("Last.fm track.getInfo returned no track".to_string()))?;
    let info: LfmTrackInfo = serde_json::from_value(track)
        .map_err(|e| ProviderError::Malformed(format!("Last.fm track info: {}", e)))?;

    let tags: Vec<String> = info
        .toptags
        .map(|t| t.tag)
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.name.trim().to_lowercase())
        .filter(|name| is_genre_tag(name))
        .collect();

    Ok(TrackEnrichment {
        artwork_url: info.album.as_ref().and_then(|a| pick_image(&a.image)),
        genre: tags.first().cloned(),
        tags,
        popularity: info.playcount,
    })
}

/// Largest usable image: extralarge → large → medium, absolute http(s) URLs only
fn pick_image(images: &[LfmImage]) -> Option<String> {
    IMAGE_PREFERENCE.iter().find_map(|size| {
        images
            .iter()
            .find(|img| img.size == *size)
            .map(|img| img.url.trim())
            .filter(|url| url.starts_with("http"))
            .map(str::to_string)
    })
}

/// Reject chart, playlist and year tags
fn is_genre_tag(name: &str) -> bool {
    if name.is_empty() || NOISE_TAG_FRAGMENTS.iter().any(|f| name.contains(f)) {
        return false;
    }
    // Four consecutive digits look like a year ("2010", "1990s")
    let mut run = 0;
    for c in name.chars() {
        run = if c.is_ascii_digit() { run + 1 } else { 0 };
        if run == 4 {
            return false;
        }
    }
    true
}

/// Counts arrive as `"12345"` or `12345`
fn de_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// ============================================================================
// Last.fm API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct LfmTrack {
    name: String,
    #[serde(default)]
    mbid: Option<String>,
    #[serde(default)]
    url: Option<String>,
    artist: LfmArtist,
    #[serde(default, deserialize_with = "de_count")]
    playcount: Option<u64>,
    #[serde(default)]
    image: Vec<LfmImage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LfmArtist {
    Object { name: String },
    Text(String),
}

impl LfmArtist {
    fn name(&self) -> String {
        match self {
            LfmArtist::Object { name } | LfmArtist::Text(name) => name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LfmImage {
    #[serde(rename = "#text", default)]
    url: String,
    #[serde(default)]
    size: String,
}

#[derive(Debug, Deserialize)]
struct LfmTrackInfo {
    #[serde(default, deserialize_with = "de_count")]
    playcount: Option<u64>,
    album: Option<LfmAlbum>,
    toptags: Option<LfmTopTags>,
}

#[derive(Debug, Deserialize)]
struct LfmAlbum {
    #[serde(default)]
    image: Vec<LfmImage>,
}

#[derive(Debug, Deserialize)]
struct LfmTopTags {
    #[serde(default)]
    tag: Vec<LfmTag>,
}

#[derive(Debug, Deserialize)]
struct LfmTag {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_similar_tracks_parsed() {
        let body = json!({
            "similartracks": {"track": [
                {
                    "name": "Dust in the Wind",
                    "playcount": 2500000,
                    "mbid": "mb-1",
                    "artist": {"name": "Kansas"},
                    "image": [
                        {"#text": "https://img/s.png", "size": "small"},
                        {"#text": "https://img/l.png", "size": "large"}
                    ]
                },
                {
                    "name": "Obscure",
                    "playcount": "120",
                    "artist": {"name": "Nobody"},
                    "url": "https://www.last.fm/music/Nobody/_/Obscure"
                }
            ]}
        });

        let candidates = parse_track_list(body, "similartracks").unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].artist, "Kansas");
        assert_eq!(candidates[0].popularity_signal, 2_500_000);
        assert_eq!(candidates[0].artwork_url.as_deref(), Some("https://img/l.png"));
        assert_eq!(candidates[1].popularity_signal, 120);
        assert_eq!(
            candidates[1].provider_track_id,
            "https://www.last.fm/music/Nobody/_/Obscure"
        );
    }

    #[test]
    fn test_single_track_object_accepted() {
        let body = json!({"tracks": {"track": {"name": "Solo", "artist": "Someone"}}});
        let candidates = parse_track_list(body, "tracks").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].artist, "Someone");
    }

    #[test]
    fn test_missing_wrapper_is_malformed() {
        let result = parse_track_list(json!({"unexpected": {}}), "tracks");
        assert!(matches!(result, Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_in_band_errors() {
        let not_found = check_api_error("track.getinfo", json!({"error": 6, "message": "Track not found"}));
        assert!(matches!(not_found, Err(ProviderError::Empty(_))));

        let bad_key = check_api_error("track.getinfo", json!({"error": 10, "message": "Invalid API key"}));
        assert!(matches!(bad_key, Err(ProviderError::Unavailable(_))));

        assert!(check_api_error("x", json!({"track": {}})).is_ok());
    }

    #[test]
    fn test_track_info_enrichment() {
        let body = json!({"track": {
            "name": "Blackbird",
            "playcount": "9876543",
            "album": {"image": [
                {"#text": "", "size": "extralarge"},
                {"#text": "https://img/large.png", "size": "large"}
            ]},
            "toptags": {"tag": [
                {"name": "Spotify Favorites"},
                {"name": "1968"},
                {"name": "Folk"},
                {"name": "acoustic"},
                {"name": "mellow"}
            ]}
        }});

        let enrichment = parse_track_info(body).unwrap();
        assert_eq!(enrichment.genre.as_deref(), Some("folk"));
        assert_eq!(enrichment.tags, vec!["folk", "acoustic", "mellow"]);
        assert_eq!(enrichment.popularity, Some(9_876_543));
        assert_eq!(enrichment.artwork_url.as_deref(), Some("https://img/large.png"));
    }

    #[test]
    fn test_relative_image_urls_rejected() {
        let images = vec![LfmImage {
            url: "/static/noimage.png".into(),
            size: "extralarge".into(),
        }];
        assert_eq!(pick_image(&images), None);
    }

    #[test]
    fn test_genre_tag_filter() {
        assert!(is_genre_tag("indie folk"));
        assert!(!is_genre_tag("90s billboard hits"));
        assert!(!is_genre_tag("best of 2010"));
        assert!(!is_genre_tag("top 100 songs"));
        assert!(is_genre_tag("90s"));
    }
}
