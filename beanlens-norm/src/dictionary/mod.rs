//! Dictionary repository
//!
//! An immutable (Term, Alias) snapshot for one dictionary version, indexed by
//! domain. Snapshots come from a dictionary directory
//! (`<dir>/<version>/{terms,aliases}.json`) or from the versions embedded at
//! build time. No I/O happens after construction, so a repository can be
//! shared behind an `Arc` by any number of readers.
//!
//! Alias references are not checked here; see [`validation`].

pub mod validation;

use crate::types::{Alias, Domain, Term};
use beanlens_common::{Error, NormalizationConfig, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub use validation::{validate_dictionary, DictionaryIssue};

const TERMS_FILE: &str = "terms.json";
const ALIASES_FILE: &str = "aliases.json";

/// Snapshots compiled into the binary: (version, terms JSON, aliases JSON)
const EMBEDDED_VERSIONS: &[(&str, &str, &str)] = &[(
    "v1",
    include_str!("../../data/v1/terms.json"),
    include_str!("../../data/v1/aliases.json"),
)];

/// Immutable dictionary snapshot
///
/// Term and alias order within a domain is the snapshot file order; matchers
/// rely on it for deterministic tie-breaking.
#[derive(Debug, Clone)]
pub struct DictionaryRepository {
    version: String,
    terms: HashMap<Domain, Vec<Term>>,
    aliases: HashMap<Domain, Vec<Alias>>,
    term_index: HashMap<Domain, HashMap<String, usize>>,
}

impl DictionaryRepository {
    /// Load an embedded dictionary version
    pub fn load(version: &str) -> Result<Self> {
        Self::load_from(version, None)
    }

    /// Load the version named by the configuration
    pub fn from_config(config: &NormalizationConfig) -> Result<Self> {
        Self::load_from(&config.dictionary_version, config.dictionary_dir.as_deref())
    }

    /// Load a version, preferring `dir` over the embedded snapshots
    ///
    /// Fails with `DictionaryNotFound` when neither source has the version or
    /// its files cannot be read or parsed.
    pub fn load_from(version: &str, dir: Option<&Path>) -> Result<Self> {
        if version.is_empty() || version.contains(['/', '\\']) || version.contains("..") {
            return Err(Error::DictionaryNotFound(format!(
                "invalid dictionary version '{}'",
                version
            )));
        }

        if let Some(dir) = dir {
            let version_dir = dir.join(version);
            if version_dir.is_dir() {
                let terms = read_snapshot_file(&version_dir.join(TERMS_FILE), version)?;
                let aliases = read_snapshot_file(&version_dir.join(ALIASES_FILE), version)?;
                let repo = Self::from_json(version, &terms, &aliases)?;
                info!(
                    version = %version,
                    path = %version_dir.display(),
                    terms = repo.term_count(),
                    aliases = repo.alias_count(),
                    "Loaded dictionary from directory"
                );
                return Ok(repo);
            }
            debug!(
                version = %version,
                path = %version_dir.display(),
                "Dictionary version not in directory, trying embedded snapshots"
            );
        }

        let (_, terms, aliases) = EMBEDDED_VERSIONS
            .iter()
            .find(|(v, _, _)| *v == version)
            .ok_or_else(|| {
                Error::DictionaryNotFound(format!("dictionary version '{}' is not available", version))
            })?;

        let repo = Self::from_json(version, terms, aliases)?;
        info!(
            version = %version,
            terms = repo.term_count(),
            aliases = repo.alias_count(),
            "Loaded embedded dictionary"
        );
        Ok(repo)
    }

    /// Parse snapshot JSON (two ordered arrays)
    pub fn from_json(version: &str, terms_json: &str, aliases_json: &str) -> Result<Self> {
        let terms: Vec<Term> = serde_json::from_str(terms_json).map_err(|e| {
            Error::DictionaryNotFound(format!("{}/{} unreadable: {}", version, TERMS_FILE, e))
        })?;
        let aliases: Vec<Alias> = serde_json::from_str(aliases_json).map_err(|e| {
            Error::DictionaryNotFound(format!("{}/{} unreadable: {}", version, ALIASES_FILE, e))
        })?;
        Ok(Self::from_parts(version, terms, aliases))
    }

    /// Build a repository from in-memory entries, keeping their order
    pub fn from_parts(version: &str, terms: Vec<Term>, aliases: Vec<Alias>) -> Self {
        let mut by_domain: HashMap<Domain, Vec<Term>> = HashMap::new();
        let mut term_index: HashMap<Domain, HashMap<String, usize>> = HashMap::new();

        for term in terms {
            let bucket = by_domain.entry(term.domain).or_default();
            // First occurrence wins for key lookups; duplicates stay visible to validation
            term_index
                .entry(term.domain)
                .or_default()
                .entry(term.key.clone())
                .or_insert(bucket.len());
            bucket.push(term);
        }

        let mut alias_map: HashMap<Domain, Vec<Alias>> = HashMap::new();
        for alias in aliases {
            alias_map.entry(alias.domain).or_default().push(alias);
        }

        Self {
            version: version.to_string(),
            terms: by_domain,
            aliases: alias_map,
            term_index,
        }
    }

    /// Versions available from `dir` and the embedded set, sorted and deduplicated
    pub fn available_versions(dir: Option<&Path>) -> Vec<String> {
        let mut versions: Vec<String> = EMBEDDED_VERSIONS
            .iter()
            .map(|(v, _, _)| v.to_string())
            .collect();

        if let Some(dir) = dir {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.join(TERMS_FILE).is_file() && path.join(ALIASES_FILE).is_file() {
                        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                            versions.push(name.to_string());
                        }
                    }
                }
            }
        }

        versions.sort();
        versions.dedup();
        versions
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Terms of a domain in snapshot order
    pub fn terms_by_domain(&self, domain: Domain) -> &[Term] {
        self.terms.get(&domain).map(Vec::as_slice).unwrap_or_default()
    }

    /// Aliases of a domain in snapshot order
    pub fn aliases_by_domain(&self, domain: Domain) -> &[Alias] {
        self.aliases.get(&domain).map(Vec::as_slice).unwrap_or_default()
    }

    /// Term referenced by (domain, key)
    pub fn term(&self, domain: Domain, key: &str) -> Option<&Term> {
        let idx = *self.term_index.get(&domain)?.get(key)?;
        self.terms.get(&domain)?.get(idx)
    }

    pub fn term_count(&self) -> usize {
        self.terms.values().map(Vec::len).sum()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.values().map(Vec::len).sum()
    }
}

fn read_snapshot_file(path: &Path, version: &str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::DictionaryNotFound(format!(
            "dictionary version '{}': cannot read {}: {}",
            version,
            path.display(),
            e
        ))
    })
}
