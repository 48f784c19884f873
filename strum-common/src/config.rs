//! Configuration file loading and API key resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `STRUMSENSE_CONFIG` environment variable
//! 3. Per-user config file (`~/.config/strumsense/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable config file never terminates the process: callers get a
//! warning and the compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "STRUMSENSE_CONFIG";

/// Environment variable names for provider credentials
pub const ACOUSTID_KEY_ENV: &str = "STRUMSENSE_ACOUSTID_API_KEY";
pub const LASTFM_KEY_ENV: &str = "STRUMSENSE_LASTFM_API_KEY";
pub const SPOTIFY_CLIENT_ID_ENV: &str = "STRUMSENSE_SPOTIFY_CLIENT_ID";
pub const SPOTIFY_CLIENT_SECRET_ENV: &str = "STRUMSENSE_SPOTIFY_CLIENT_SECRET";

/// Top-level TOML configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Recommendation engine tunables; absent fields keep compiled defaults
    #[serde(default)]
    pub engine: EngineToml,
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by `RUST_LOG`)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Engine overrides as they appear on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineToml {
    pub max_results: Option<usize>,
    pub similar_limit: Option<usize>,
    pub popularity_floor: Option<u64>,
    pub min_candidates: Option<usize>,
    pub genre_limit: Option<usize>,
    pub feature_search_limit: Option<usize>,
    pub min_usable_similarity: Option<u8>,
    pub enrichment_batch_size: Option<usize>,
    pub fingerprint_time_window: Option<i32>,
    pub max_query_hashes: Option<usize>,
}

/// Provider credentials section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    pub acoustid: Option<String>,
    pub lastfm: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
}

/// Resolved provider credentials (ENV → TOML)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedKeys {
    pub acoustid: Option<String>,
    pub lastfm: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
}

impl TomlConfig {
    /// Resolve every provider credential from environment, then TOML
    pub fn resolve_keys(&self) -> ResolvedKeys {
        ResolvedKeys {
            acoustid: resolve_api_key("AcoustID", ACOUSTID_KEY_ENV, self.api_keys.acoustid.as_deref()),
            lastfm: resolve_api_key("Last.fm", LASTFM_KEY_ENV, self.api_keys.lastfm.as_deref()),
            spotify_client_id: resolve_api_key(
                "Spotify client id",
                SPOTIFY_CLIENT_ID_ENV,
                self.api_keys.spotify_client_id.as_deref(),
            ),
            spotify_client_secret: resolve_api_key(
                "Spotify client secret",
                SPOTIFY_CLIENT_SECRET_ENV,
                self.api_keys.spotify_client_secret.as_deref(),
            ),
        }
    }
}

/// Locate the config file to use, if any
pub fn locate_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("strumsense").join("config.toml"))
        .filter(|p| p.exists())
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    /// No config file was found
    Defaults,
    File(PathBuf),
    /// A file was found but could not be used
    Rejected { path: PathBuf, reason: String },
}

impl ConfigOrigin {
    /// Report the outcome; call once the subscriber is installed
    pub fn log(&self) {
        match self {
            ConfigOrigin::Defaults => info!("No config file found, using compiled defaults"),
            ConfigOrigin::File(path) => info!("Loaded config from {}", path.display()),
            ConfigOrigin::Rejected { path, reason } => {
                warn!("Ignoring config file {}: {}", path.display(), reason)
            }
        }
    }
}

/// Load configuration with graceful degradation
///
/// Missing file → defaults. Unreadable or malformed file → defaults, reported through the
/// returned origin. Nothing is logged here since the subscriber depends on the result.
pub fn load_or_default(cli_arg: Option<&Path>) -> (TomlConfig, ConfigOrigin) {
    let Some(path) = locate_config_file(cli_arg) else {
        return (TomlConfig::default(), ConfigOrigin::Defaults);
    };

    match load_toml_config(&path) {
        Ok(config) => (config, ConfigOrigin::File(path)),
        Err(e) => (
            TomlConfig::default(),
            ConfigOrigin::Rejected {
                path,
                reason: e.to_string(),
            },
        ),
    }
}

/// Resolve one API key
///
/// **Priority:** ENV → TOML. Blank values are treated as absent.
pub fn resolve_api_key(label: &str, env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} key found in both environment and TOML. Using environment (highest priority).",
            label
        );
    }

    if let Some(key) = env_key {
        info!("{} key loaded from environment variable", label);
        return Some(key);
    }

    toml_key.map(|key| {
        info!("{} key loaded from TOML config", label);
        key.to_string()
    })
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.engine.max_results.is_none());
        assert!(config.api_keys.lastfm.is_none());
    }

    #[test]
    fn test_engine_section_parses() {
        let config: TomlConfig = toml::from_str(
            r#"
            [engine]
            max_results = 5
            popularity_floor = 2500
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.max_results, Some(5));
        assert_eq!(config.engine.popularity_floor, Some(2500));
        assert!(config.engine.genre_limit.is_none());
    }
}
