//! Engine construction from resolved configuration (TOML + BEANLENS_* environment)
//!
//! Tests that manipulate BEANLENS_* variables are marked with #[serial].

use beanlens_common::config::{resolve_config, ConfigOverrides};
use beanlens_norm::{Domain, Error, FlavorNoteMode, Method, NormalizationEngine};
use serial_test::serial;
use std::env;

const ENV_VARS: &[&str] = &[
    "BEANLENS_FLAVOR_NOTE_MODE",
    "BEANLENS_UNKNOWN_QUEUE_PATH",
    "BEANLENS_DICTIONARY_VERSION",
];

fn clear_env() {
    for name in ENV_VARS {
        env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_environment_configures_engine() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let toml_path = dir.path().join("config.toml");
    std::fs::write(&toml_path, "[normalization]\nflavor_note_mode = \"strict\"\n").unwrap();
    let queue_path = dir.path().join("queue.jsonl");

    env::set_var("BEANLENS_FLAVOR_NOTE_MODE", "legacy");
    env::set_var("BEANLENS_UNKNOWN_QUEUE_PATH", &queue_path);
    let resolved = resolve_config(Some(&toml_path), &ConfigOverrides::default());
    clear_env();

    let config = resolved.unwrap().normalization;
    assert_eq!(config.flavor_note_mode, FlavorNoteMode::Legacy);

    let engine = NormalizationEngine::new(config).unwrap();
    let item = engine.normalize_one(Domain::FlavorNote, "Welch's");
    assert_eq!(item.normalized_key.as_deref(), Some("grape"));

    engine.normalize_one(Domain::Process, "Mystery Process");
    let content = std::fs::read_to_string(&queue_path).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[test]
#[serial]
fn test_cli_override_selects_missing_version() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let toml_path = dir.path().join("config.toml");
    std::fs::write(&toml_path, "").unwrap();

    env::set_var("BEANLENS_DICTIONARY_VERSION", "v1");
    let overrides = ConfigOverrides {
        dictionary_version: Some("v77".to_string()),
        ..Default::default()
    };
    let resolved = resolve_config(Some(&toml_path), &overrides);
    clear_env();

    let config = resolved.unwrap().normalization;
    assert_eq!(config.dictionary_version, "v77");
    assert!(matches!(NormalizationEngine::new(config), Err(Error::DictionaryNotFound(_))));
}

#[test]
#[serial]
fn test_invalid_environment_value_is_config_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let toml_path = dir.path().join("config.toml");
    std::fs::write(&toml_path, "").unwrap();

    env::set_var("BEANLENS_FLAVOR_NOTE_MODE", "loose");
    let resolved = resolve_config(Some(&toml_path), &ConfigOverrides::default());
    clear_env();

    assert!(matches!(resolved, Err(Error::Config(_))));
}
