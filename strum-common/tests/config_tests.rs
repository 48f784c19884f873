//! Unit tests for configuration loading and graceful degradation
//!
//! Tests the implementation of:
//! - Missing TOML files SHALL NOT cause termination
//! - Malformed TOML files → warning + defaults
//! - API key priority order (ENV → TOML)
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate STRUMSENSE_* variables are marked with #[serial].

use serial_test::serial;
use std::env;
use std::fs;
use strum_common::config::{
    load_or_default, load_toml_config, locate_config_file, resolve_api_key, ConfigOrigin,
    TomlConfig, CONFIG_ENV_VAR, LASTFM_KEY_ENV,
};
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_path_has_highest_priority() {
    let dir = TempDir::new().unwrap();
    let cli_path = dir.path().join("cli.toml");
    env::set_var(CONFIG_ENV_VAR, "/nonexistent/env.toml");

    let located = locate_config_file(Some(&cli_path));
    assert_eq!(located, Some(cli_path));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/strumsense-env.toml");

    let located = locate_config_file(None);
    assert_eq!(
        located.as_deref().map(|p| p.to_string_lossy().to_string()),
        Some("/tmp/strumsense-env.toml".to_string())
    );

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let (config, origin) = load_or_default(Some(&missing));
    assert_eq!(config.logging.level, "info");
    assert!(config.engine.max_results.is_none());
    assert!(matches!(origin, ConfigOrigin::Rejected { path, .. } if path == missing));
}

#[test]
fn test_malformed_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[engine\nmax_results = ").unwrap();

    assert!(load_toml_config(&path).is_err());

    let (config, origin) = load_or_default(Some(&path));
    assert!(config.engine.max_results.is_none());
    match origin {
        ConfigOrigin::Rejected { reason, .. } => assert!(!reason.is_empty()),
        other => panic!("expected rejected origin, got {:?}", other),
    }
}

#[test]
fn test_full_document_round_trips_sections() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("strumsense.toml");
    fs::write(
        &path,
        r#"
[logging]
level = "debug"

[engine]
max_results = 7
enrichment_batch_size = 4

[api_keys]
lastfm = "lfm-key"
"#,
    )
    .unwrap();

    let config: TomlConfig = load_toml_config(&path).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.engine.max_results, Some(7));
    assert_eq!(config.engine.enrichment_batch_size, Some(4));
    assert_eq!(config.api_keys.lastfm.as_deref(), Some("lfm-key"));

    let (loaded, origin) = load_or_default(Some(&path));
    assert_eq!(loaded.engine.max_results, Some(7));
    assert_eq!(origin, ConfigOrigin::File(path));
}

#[test]
#[serial]
fn test_env_key_wins_over_toml() {
    env::set_var(LASTFM_KEY_ENV, "from-env");

    let key = resolve_api_key("Last.fm", LASTFM_KEY_ENV, Some("from-toml"));
    assert_eq!(key.as_deref(), Some("from-env"));

    env::remove_var(LASTFM_KEY_ENV);
}

#[test]
#[serial]
fn test_blank_env_key_falls_through_to_toml() {
    env::set_var(LASTFM_KEY_ENV, "   ");

    let key = resolve_api_key("Last.fm", LASTFM_KEY_ENV, Some("from-toml"));
    assert_eq!(key.as_deref(), Some("from-toml"));

    env::remove_var(LASTFM_KEY_ENV);
}

#[test]
#[serial]
fn test_no_key_anywhere_is_absent() {
    env::remove_var(LASTFM_KEY_ENV);

    assert!(resolve_api_key("Last.fm", LASTFM_KEY_ENV, None).is_none());
    assert!(resolve_api_key("Last.fm", LASTFM_KEY_ENV, Some("")).is_none());
}
