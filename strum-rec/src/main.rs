//! strum-rec - StrumSense recommendation CLI
//!
//! Runs one `Recommend` invocation against the configured providers and prints
//! `{request_id, identification, recommendations}` as pretty JSON on stdout. Logs go to
//! stderr.
//!
//! Inputs are the external analyzer's documents:
//! - `--features`: FeatureVector JSON (required)
//! - `--fingerprint`: `{ "durationSecs", "blob", "hashes": [{freq1, freq2, timeDelta}] }`
//! - `--catalog`: song catalog replacing the bundled one

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use strum_common::config::load_or_default;
use strum_common::logging::init_tracing;
use strum_rec::types::{FeatureVector, FingerprintHashSet, RawFingerprint, RecommendRequest};
use strum_rec::providers::LocalCatalog;
use strum_rec::{EngineConfig, ProviderSet, RecommendationEngine};

/// Command-line arguments for strum-rec
#[derive(Parser, Debug)]
#[command(name = "strum-rec")]
#[command(about = "Identify a guitar performance and recommend songs to learn")]
#[command(version)]
struct Args {
    /// Feature vector JSON produced by the audio analyzer
    #[arg(short, long)]
    features: PathBuf,

    /// Fingerprint JSON (raw blob and/or local constellation hashes)
    #[arg(long)]
    fingerprint: Option<PathBuf>,

    /// Requested mood (happy, sad, chill, romantic, energetic, nostalgic, inspiring)
    #[arg(short, long)]
    mood: Option<String>,

    /// User id to look up in the profile file
    #[arg(short, long)]
    user: Option<String>,

    /// JSON file mapping user id to listening profile
    #[arg(long, env = "STRUMSENSE_PROFILES")]
    profiles: Option<PathBuf>,

    /// Song catalog JSON replacing the bundled acoustic catalog
    #[arg(long, env = "STRUMSENSE_CATALOG")]
    catalog: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Fingerprint document written by the analyzer
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintFile {
    duration_secs: Option<f64>,
    blob: Option<String>,
    #[serde(default)]
    hashes: FingerprintHashSet,
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file {}", what, path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} file {}", what, path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (toml_config, origin) = load_or_default(args.config.as_deref());
    init_tracing(&toml_config.logging)?;

    info!("Starting strum-rec v{}", env!("CARGO_PKG_VERSION"));
    origin.log();

    let features: FeatureVector = read_json(&args.features, "features")?;

    let mut request = RecommendRequest::for_features(features);
    request.mood = args.mood;
    request.user_id = args.user;

    if let Some(path) = &args.fingerprint {
        let fingerprint: FingerprintFile = read_json(path, "fingerprint")?;
        if let (Some(duration_secs), Some(blob)) = (fingerprint.duration_secs, fingerprint.blob) {
            request.fingerprint = Some(RawFingerprint { duration_secs, blob });
        }
        if !fingerprint.hashes.is_empty() {
            request.local_hashes = Some(fingerprint.hashes);
        }
    }

    let keys = toml_config.resolve_keys();
    let catalog = match &args.catalog {
        Some(path) => Some(
            LocalCatalog::load(path)
                .await
                .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        ),
        None => None,
    };
    let providers = ProviderSet::from_keys(&keys, args.profiles.as_deref(), catalog);
    let engine = RecommendationEngine::new(providers, EngineConfig::from_toml(&toml_config.engine));

    let recommendation = engine
        .recommend(request)
        .await
        .context("Recommendation failed")?;

    println!("{}", serde_json::to_string_pretty(&recommendation)?);
    Ok(())
}
