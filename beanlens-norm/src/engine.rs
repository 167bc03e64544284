//! Normalization engine
//!
//! Ties the dictionary, matcher and unknown-queue reporter together:
//! - [`NormalizationEngine::normalize_one`]: one raw value of one domain
//! - [`NormalizationEngine::normalize_list`]: split, match and deduplicate list values
//! - [`NormalizationEngine::normalize_bean_info`]: a whole extracted record plus warnings
//!
//! The engine is immutable after construction and can be shared across
//! threads; only the reporter's sinks touch shared resources.

use crate::dictionary::DictionaryRepository;
use crate::matcher::{MatchOutcome, MatchPolicy, Matcher};
use crate::text::{normalize_text, split_multi_value};
use crate::types::{
    BeanRecord, Domain, Method, NormalizedBeanInfo, NormalizedItem, REASON_LOW_CONFIDENCE,
    REASON_NO_DICTIONARY_MATCH,
};
use crate::unknown_queue::{UnknownQueueEvent, UnknownQueueReporter};
use beanlens_common::{FlavorNoteMode, NormalizationConfig, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Dictionary-backed normalizer
#[derive(Debug)]
pub struct NormalizationEngine {
    config: NormalizationConfig,
    repo: Arc<DictionaryRepository>,
    matcher: Matcher,
    reporter: UnknownQueueReporter,
}

/// Identity used to drop duplicate list items
#[derive(Debug, PartialEq, Eq, Hash)]
enum DedupKey {
    Key(String),
    Raw(String),
}

impl DedupKey {
    fn of(item: &NormalizedItem) -> Self {
        match &item.normalized_key {
            Some(key) => DedupKey::Key(key.clone()),
            None => DedupKey::Raw(normalize_text(&item.raw)),
        }
    }
}

impl NormalizationEngine {
    /// Validate the configuration, load its dictionary and start its sinks
    ///
    /// Fails with `Config` for out-of-range settings and `DictionaryNotFound`
    /// when the version cannot be loaded.
    pub fn new(config: NormalizationConfig) -> Result<Self> {
        config.validate()?;
        let repo = Arc::new(DictionaryRepository::from_config(&config)?);
        let reporter = UnknownQueueReporter::from_config(&config);
        Self::assemble(config, repo, reporter)
    }

    /// Build around an already loaded dictionary
    ///
    /// `dictionary_version` in the returned engine's config reflects `repo`.
    pub fn with_repository(config: NormalizationConfig, repo: Arc<DictionaryRepository>) -> Result<Self> {
        config.validate()?;
        let reporter = UnknownQueueReporter::from_config(&config);
        Self::assemble(config, repo, reporter)
    }

    /// Replace the reporter built from configuration
    pub fn with_reporter(mut self, reporter: UnknownQueueReporter) -> Self {
        self.reporter = reporter;
        self
    }

    fn assemble(
        mut config: NormalizationConfig,
        repo: Arc<DictionaryRepository>,
        reporter: UnknownQueueReporter,
    ) -> Result<Self> {
        config.dictionary_version = repo.version().to_string();
        let matcher = Matcher::new(&repo);

        info!(
            dictionary_version = %repo.version(),
            terms = repo.term_count(),
            aliases = repo.alias_count(),
            flavor_note_mode = %config.flavor_note_mode,
            fuzzy_threshold = config.fuzzy_threshold,
            unknown_queue = ?reporter.sink_names(),
            "Normalization engine ready"
        );

        Ok(Self {
            config,
            repo,
            matcher,
            reporter,
        })
    }

    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    pub fn dictionary_version(&self) -> &str {
        self.repo.version()
    }

    /// Normalize one raw value with the configured flavor-note mode
    pub fn normalize_one(&self, domain: Domain, raw: &str) -> NormalizedItem {
        self.normalize_one_with_mode(domain, raw, self.config.flavor_note_mode)
    }

    /// Normalize one raw value
    ///
    /// Matching runs on the trimmed value; `raw` is kept as given in the item
    /// and in reported events. Blank input yields an `empty_input` item without
    /// reporting. Unmatched input yields an `unmapped` item and a
    /// `no_dictionary_match` event; a match below `unknown_min_confidence` is
    /// returned and also reported.
    pub fn normalize_one_with_mode(&self, domain: Domain, raw: &str, mode: FlavorNoteMode) -> NormalizedItem {
        let value = raw.trim();
        if value.is_empty() {
            return NormalizedItem::empty_input(domain, raw);
        }

        let policy = self.policy(domain, mode);
        let Some(outcome) = self.matcher.match_token(domain, value, &policy) else {
            debug!(domain = %domain, raw = %raw, "No dictionary match");
            self.report(UnknownQueueEvent::new(
                domain,
                raw,
                0.0,
                REASON_NO_DICTIONARY_MATCH,
                Method::Unmapped,
                None,
                self.repo.version(),
            ));
            return NormalizedItem::unmapped(domain, raw);
        };

        let item = into_item(domain, raw, outcome);
        if let Some(floor) = self.config.unknown_min_confidence {
            if item.confidence < floor {
                self.report(UnknownQueueEvent::new(
                    domain,
                    raw,
                    item.confidence,
                    REASON_LOW_CONFIDENCE,
                    item.method,
                    item.normalized_key.as_deref(),
                    self.repo.version(),
                ));
            }
        }
        item
    }

    /// Normalize list values with the configured flavor-note mode
    pub fn normalize_list<S: AsRef<str>>(&self, domain: Domain, values: &[S]) -> Vec<NormalizedItem> {
        self.normalize_list_with_mode(domain, values, self.config.flavor_note_mode)
    }

    /// Split every value, normalize each token and drop duplicates
    ///
    /// Items are deduplicated by canonical key, or by normalized raw text when
    /// unmapped; first-seen order is preserved. Blank tokens are skipped.
    pub fn normalize_list_with_mode<S: AsRef<str>>(
        &self,
        domain: Domain,
        values: &[S],
        mode: FlavorNoteMode,
    ) -> Vec<NormalizedItem> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for value in values {
            for token in split_multi_value(value.as_ref()) {
                if token.is_empty() {
                    continue;
                }
                let item = self.normalize_one_with_mode(domain, &token, mode);
                if seen.insert(DedupKey::of(&item)) {
                    items.push(item);
                }
            }
        }

        items
    }

    /// Normalize a record with the configured flavor-note mode
    pub fn normalize_bean_info(&self, record: &BeanRecord) -> NormalizedBeanInfo {
        self.normalize_bean_info_with_mode(record, self.config.flavor_note_mode)
    }

    /// Normalize the five dictionary-backed fields of a record
    ///
    /// Absent or empty single-value fields stay `None`; whitespace-only values
    /// become `empty_input` items. A warning is added for every domain with an
    /// unmapped item.
    pub fn normalize_bean_info_with_mode(&self, record: &BeanRecord, mode: FlavorNoteMode) -> NormalizedBeanInfo {
        let single = |domain: Domain, value: Option<&str>| {
            value
                .filter(|v| !v.is_empty())
                .map(|v| self.normalize_one_with_mode(domain, v, mode))
        };

        let process = single(Domain::Process, record.process.as_deref());
        let roast_level = single(Domain::RoastLevel, record.roast_level.as_deref());
        let country = single(Domain::Country, record.country());
        let varieties = self.normalize_list_with_mode(
            Domain::Variety,
            record.variety.as_deref().unwrap_or_default(),
            mode,
        );
        let flavor_notes = self.normalize_list_with_mode(
            Domain::FlavorNote,
            record.flavor_notes.as_deref().unwrap_or_default(),
            mode,
        );

        let mut warnings = Vec::new();
        for (domain, item) in [
            (Domain::Process, &process),
            (Domain::RoastLevel, &roast_level),
            (Domain::Country, &country),
        ] {
            if item.as_ref().is_some_and(NormalizedItem::is_unmapped) {
                warnings.push(domain.unmapped_warning());
            }
        }
        for (domain, items) in [(Domain::Variety, &varieties), (Domain::FlavorNote, &flavor_notes)] {
            if items.iter().any(NormalizedItem::is_unmapped) {
                warnings.push(domain.unmapped_warning());
            }
        }

        if !warnings.is_empty() {
            debug!(warnings = ?warnings, "Record has unmapped values");
        }

        NormalizedBeanInfo {
            dictionary_version: self.repo.version().to_string(),
            process,
            roast_level,
            country,
            varieties,
            flavor_notes,
            warnings,
        }
    }

    /// Wait up to `timeout` for pending unknown-queue deliveries
    pub fn flush_unknown_queue(&self, timeout: Duration) -> bool {
        self.reporter.flush(timeout)
    }

    fn policy(&self, domain: Domain, mode: FlavorNoteMode) -> MatchPolicy {
        if domain != Domain::FlavorNote {
            return MatchPolicy::standard(self.config.fuzzy_threshold);
        }
        let threshold = self.config.flavor_note_threshold(mode);
        match mode {
            FlavorNoteMode::Strict => MatchPolicy::strict_flavor(threshold),
            FlavorNoteMode::Legacy => MatchPolicy::standard(threshold),
        }
    }

    fn report(&self, event: UnknownQueueEvent) {
        if self.reporter.is_enabled() {
            self.reporter.enqueue(&event);
        }
    }
}

/// Build an engine for a single record
///
/// Loads the dictionary on every call; long-lived callers should keep a
/// [`NormalizationEngine`] instead.
pub fn normalize_bean_info(record: &BeanRecord, config: &NormalizationConfig) -> Result<NormalizedBeanInfo> {
    let engine = NormalizationEngine::new(config.clone())?;
    Ok(engine.normalize_bean_info(record))
}

fn into_item(domain: Domain, raw: &str, outcome: MatchOutcome) -> NormalizedItem {
    NormalizedItem {
        domain,
        raw: raw.to_string(),
        normalized_key: Some(outcome.key),
        normalized_label_en: Some(outcome.label_en),
        normalized_label_ko: Some(outcome.label_ko),
        confidence: outcome.confidence,
        method: outcome.method,
        candidates: outcome.candidates,
        reason: outcome.reason,
    }
}
