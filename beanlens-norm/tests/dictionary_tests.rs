//! Dictionary loading from directories and version swapping

use beanlens_norm::{
    validate_dictionary, DictionaryIssue, DictionaryRepository, Domain, Error, Method, NormalizationConfig,
    NormalizationEngine,
};
use std::path::Path;

const V2_TERMS: &str = r#"[
  {"domain": "process", "key": "washed", "label_en": "Washed", "label_ko": "워시드"},
  {"domain": "process", "key": "koji", "label_en": "Koji Fermentation", "label_ko": "코지 발효"}
]"#;

const V2_ALIASES: &str = r#"[
  {"domain": "process", "key": "koji", "alias": "koji", "match_type": "contains", "priority": 10},
  {"domain": "process", "key": "koji", "alias": "aspergillus", "match_type": "exact", "priority": 10, "alias_kind": "semantic"},
  {"domain": "process", "key": "missing", "alias": "ghost", "match_type": "exact", "priority": 10}
]"#;

fn write_version(dir: &Path, version: &str, terms: &str, aliases: &str) {
    let version_dir = dir.join(version);
    std::fs::create_dir_all(&version_dir).unwrap();
    std::fs::write(version_dir.join("terms.json"), terms).unwrap();
    std::fs::write(version_dir.join("aliases.json"), aliases).unwrap();
}

#[test]
fn test_directory_version_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    write_version(dir.path(), "v2", V2_TERMS, V2_ALIASES);

    let repo = DictionaryRepository::load_from("v2", Some(dir.path())).unwrap();
    assert_eq!(repo.version(), "v2");
    assert_eq!(repo.terms_by_domain(Domain::Process).len(), 2);
    assert_eq!(repo.aliases_by_domain(Domain::Process).len(), 3);
    assert!(repo.terms_by_domain(Domain::Country).is_empty());
}

#[test]
fn test_embedded_version_used_when_directory_lacks_it() {
    let dir = tempfile::tempdir().unwrap();
    let repo = DictionaryRepository::load_from("v1", Some(dir.path())).unwrap();
    assert_eq!(repo.version(), "v1");
    assert!(!repo.terms_by_domain(Domain::Country).is_empty());
}

#[test]
fn test_unknown_version_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let config = NormalizationConfig {
        dictionary_version: "v9".to_string(),
        dictionary_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    assert!(matches!(NormalizationEngine::new(config), Err(Error::DictionaryNotFound(_))));
}

#[test]
fn test_incomplete_version_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let version_dir = dir.path().join("v3");
    std::fs::create_dir_all(&version_dir).unwrap();
    std::fs::write(version_dir.join("terms.json"), "[]").unwrap();

    let result = DictionaryRepository::load_from("v3", Some(dir.path()));
    assert!(matches!(result, Err(Error::DictionaryNotFound(_))));
}

#[test]
fn test_engine_uses_configured_version() {
    let dir = tempfile::tempdir().unwrap();
    write_version(dir.path(), "v2", V2_TERMS, V2_ALIASES);

    let engine = NormalizationEngine::new(NormalizationConfig {
        dictionary_version: "v2".to_string(),
        dictionary_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(engine.dictionary_version(), "v2");

    let item = engine.normalize_one(Domain::Process, "Koji Natural");
    assert_eq!(item.normalized_key.as_deref(), Some("koji"));
    assert_eq!(item.method, Method::Alias);

    // Dangling alias is tolerated at load time and never matches
    let item = engine.normalize_one(Domain::Process, "ghost");
    assert_eq!(item.method, Method::Unmapped);

    // Terms absent from this version are unmapped, not errors
    let item = engine.normalize_one(Domain::Country, "Ethiopia");
    assert_eq!(item.method, Method::Unmapped);
}

#[test]
fn test_validation_reports_dangling_alias() {
    let dir = tempfile::tempdir().unwrap();
    write_version(dir.path(), "v2", V2_TERMS, V2_ALIASES);

    let repo = DictionaryRepository::load_from("v2", Some(dir.path())).unwrap();
    let issues = validate_dictionary(&repo);
    assert_eq!(
        issues,
        vec![DictionaryIssue::DanglingAlias {
            domain: Domain::Process,
            key: "missing".to_string(),
            alias: "ghost".to_string(),
        }]
    );
}

#[test]
fn test_available_versions_lists_directory_and_embedded() {
    let dir = tempfile::tempdir().unwrap();
    write_version(dir.path(), "v2", V2_TERMS, V2_ALIASES);
    std::fs::create_dir_all(dir.path().join("scratch")).unwrap();

    let versions = DictionaryRepository::available_versions(Some(dir.path()));
    assert_eq!(versions, vec!["v1".to_string(), "v2".to_string()]);
}
