//! Matcher pipeline
//!
//! Resolves one raw token to a canonical term by running strategies in a
//! fixed order; the first strategy that succeeds wins:
//!
//! | # | Strategy        | Compared against                 | Confidence  | Method  |
//! |---|-----------------|----------------------------------|-------------|---------|
//! | 1 | `Exact`         | normalized key / label_en / label_ko | 0.98    | exact   |
//! | 2 | `AliasExact`    | normalized exact aliases         | 0.90        | alias   |
//! | 3 | `AliasRegex`    | raw text, case-insensitive       | 0.88        | regex   |
//! | 4 | `AliasContains` | alias substring of normalized raw | 0.86       | alias   |
//! | 5 | `Fuzzy`         | similarity ≥ threshold           | 0.70–0.85   | fuzzy   |
//!
//! A [`MatchPolicy`] restricts which strategies run, which alias kinds are
//! eligible and the fuzzy threshold. Everything is precomputed in
//! [`Matcher::new`]; matching itself is read-only.

pub mod similarity;

use crate::dictionary::DictionaryRepository;
use crate::text::normalize_text;
use crate::types::{Alias, AliasKind, Domain, MatchType, Method, Term};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use tracing::{debug, warn};

pub use similarity::{fuzzy_confidence, similarity_ratio};

pub const EXACT_CONFIDENCE: f64 = 0.98;
pub const ALIAS_CONFIDENCE: f64 = 0.90;
pub const REGEX_CONFIDENCE: f64 = 0.88;
pub const CONTAINS_CONFIDENCE: f64 = 0.86;

/// One matching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Exact,
    AliasExact,
    AliasRegex,
    AliasContains,
    Fuzzy,
}

impl Strategy {
    /// Precedence order
    pub const ORDER: [Strategy; 5] = [
        Strategy::Exact,
        Strategy::AliasExact,
        Strategy::AliasRegex,
        Strategy::AliasContains,
        Strategy::Fuzzy,
    ];

    pub fn method(&self) -> Method {
        match self {
            Strategy::Exact => Method::Exact,
            Strategy::AliasExact | Strategy::AliasContains => Method::Alias,
            Strategy::AliasRegex => Method::Regex,
            Strategy::Fuzzy => Method::Fuzzy,
        }
    }

    /// Fixed confidence; fuzzy confidence depends on the score
    pub fn fixed_confidence(&self) -> Option<f64> {
        match self {
            Strategy::Exact => Some(EXACT_CONFIDENCE),
            Strategy::AliasExact => Some(ALIAS_CONFIDENCE),
            Strategy::AliasRegex => Some(REGEX_CONFIDENCE),
            Strategy::AliasContains => Some(CONTAINS_CONFIDENCE),
            Strategy::Fuzzy => None,
        }
    }
}

/// Which strategies may resolve a value, and how
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPolicy {
    strategies: &'static [Strategy],
    /// `Some(kind)` restricts exact aliases to that kind
    alias_kind: Option<AliasKind>,
    fuzzy_threshold: f64,
}

impl MatchPolicy {
    /// All five strategies, every alias kind
    pub fn standard(fuzzy_threshold: f64) -> Self {
        Self {
            strategies: &Strategy::ORDER,
            alias_kind: None,
            fuzzy_threshold,
        }
    }

    /// Flavor-note strict mode: exact, typo aliases only, fuzzy
    pub fn strict_flavor(fuzzy_threshold: f64) -> Self {
        const STRICT: [Strategy; 3] = [Strategy::Exact, Strategy::AliasExact, Strategy::Fuzzy];
        Self {
            strategies: &STRICT,
            alias_kind: Some(AliasKind::Typo),
            fuzzy_threshold,
        }
    }

    pub fn strategies(&self) -> &[Strategy] {
        self.strategies
    }

    pub fn fuzzy_threshold(&self) -> f64 {
        self.fuzzy_threshold
    }

    fn accepts_kind(&self, kind: AliasKind) -> bool {
        self.alias_kind.map_or(true, |wanted| wanted == kind)
    }
}

/// Successful resolution of one token
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub key: String,
    pub label_en: String,
    pub label_ko: String,
    pub confidence: f64,
    pub method: Method,
    pub strategy: Strategy,
    pub candidates: Vec<String>,
    pub reason: Option<String>,
}

impl MatchOutcome {
    fn new(term: &Term, strategy: Strategy, confidence: f64, reason: Option<String>) -> Self {
        Self {
            key: term.key.clone(),
            label_en: term.label_en.clone(),
            label_ko: term.label_ko.clone(),
            confidence,
            method: strategy.method(),
            strategy,
            candidates: vec![term.key.clone()],
            reason,
        }
    }
}

/// Term with its pre-normalized comparison forms (key, label_en, label_ko)
#[derive(Debug)]
struct IndexedTerm {
    term: Term,
    forms: [String; 3],
}

#[derive(Debug)]
struct IndexedAlias {
    alias: Alias,
    normalized: String,
    term: usize,
}

#[derive(Debug)]
struct RegexAlias {
    alias: Alias,
    regex: Regex,
    term: usize,
}

/// Per-domain lookup tables; alias lists are sorted by priority
#[derive(Debug, Default)]
struct DomainIndex {
    terms: Vec<IndexedTerm>,
    exact_aliases: Vec<IndexedAlias>,
    regex_aliases: Vec<RegexAlias>,
    contains_aliases: Vec<IndexedAlias>,
}

/// Compiled matcher for one dictionary snapshot
#[derive(Debug)]
pub struct Matcher {
    domains: HashMap<Domain, DomainIndex>,
}

impl Matcher {
    /// Build lookup tables
    ///
    /// Aliases referencing a missing term and regex aliases that fail to
    /// compile are skipped with a warning; they never match.
    pub fn new(repo: &DictionaryRepository) -> Self {
        let mut domains = HashMap::new();

        for domain in Domain::ALL {
            let terms: Vec<IndexedTerm> = repo
                .terms_by_domain(domain)
                .iter()
                .map(|term| IndexedTerm {
                    forms: term.match_candidates().map(normalize_text),
                    term: term.clone(),
                })
                .collect();

            // First term per key, matching the repository lookup
            let mut positions: HashMap<&str, usize> = HashMap::new();
            for (idx, indexed) in terms.iter().enumerate() {
                positions.entry(indexed.term.key.as_str()).or_insert(idx);
            }

            let mut index = DomainIndex::default();
            for alias in repo.aliases_by_domain(domain) {
                let Some(&term) = positions.get(alias.key.as_str()) else {
                    warn!(
                        domain = %domain,
                        key = %alias.key,
                        alias = %alias.alias,
                        "Alias references unknown term, ignoring"
                    );
                    continue;
                };

                match alias.match_type {
                    MatchType::Exact => index.exact_aliases.push(IndexedAlias {
                        normalized: normalize_text(&alias.alias),
                        alias: alias.clone(),
                        term,
                    }),
                    MatchType::Contains => index.contains_aliases.push(IndexedAlias {
                        normalized: normalize_text(&alias.alias),
                        alias: alias.clone(),
                        term,
                    }),
                    MatchType::Regex => {
                        match RegexBuilder::new(&alias.alias).case_insensitive(true).build() {
                            Ok(regex) => index.regex_aliases.push(RegexAlias {
                                alias: alias.clone(),
                                regex,
                                term,
                            }),
                            Err(e) => warn!(
                                domain = %domain,
                                key = %alias.key,
                                pattern = %alias.alias,
                                error = %e,
                                "Invalid regex alias, ignoring"
                            ),
                        }
                    }
                }
            }

            // Stable sort: equal priorities keep snapshot order
            index.exact_aliases.sort_by_key(|a| a.alias.priority);
            index.regex_aliases.sort_by_key(|a| a.alias.priority);
            index.contains_aliases.sort_by_key(|a| a.alias.priority);
            index.terms = terms;

            domains.insert(domain, index);
        }

        Self { domains }
    }

    /// Resolve a trimmed, non-empty token under `policy`
    ///
    /// Returns `None` when no permitted strategy matches.
    pub fn match_token(&self, domain: Domain, raw: &str, policy: &MatchPolicy) -> Option<MatchOutcome> {
        let index = self.domains.get(&domain)?;
        let normalized = normalize_text(raw);

        let outcome = policy
            .strategies()
            .iter()
            .find_map(|strategy| self.run(*strategy, index, raw, &normalized, policy))?;

        debug!(
            domain = %domain,
            raw = %raw,
            key = %outcome.key,
            strategy = ?outcome.strategy,
            confidence = outcome.confidence,
            "Matched dictionary term"
        );
        Some(outcome)
    }

    fn run(
        &self,
        strategy: Strategy,
        index: &DomainIndex,
        raw: &str,
        normalized: &str,
        policy: &MatchPolicy,
    ) -> Option<MatchOutcome> {
        match strategy {
            Strategy::Exact => match_exact(index, normalized),
            Strategy::AliasExact => match_alias_exact(index, normalized, policy),
            Strategy::AliasRegex => match_alias_regex(index, raw, policy),
            Strategy::AliasContains => match_alias_contains(index, normalized, policy),
            Strategy::Fuzzy => match_fuzzy(index, normalized, policy.fuzzy_threshold()),
        }
    }
}

/// First term in snapshot order with an equal form (key, then label_en, then label_ko)
fn match_exact(index: &DomainIndex, normalized: &str) -> Option<MatchOutcome> {
    if normalized.is_empty() {
        return None;
    }
    index
        .terms
        .iter()
        .find(|t| t.forms.iter().any(|form| form == normalized))
        .map(|t| MatchOutcome::new(&t.term, Strategy::Exact, EXACT_CONFIDENCE, None))
}

fn match_alias_exact(index: &DomainIndex, normalized: &str, policy: &MatchPolicy) -> Option<MatchOutcome> {
    if normalized.is_empty() {
        return None;
    }
    index
        .exact_aliases
        .iter()
        .filter(|a| policy.accepts_kind(a.alias.alias_kind))
        .find(|a| a.normalized == normalized)
        .map(|a| alias_outcome(index, a.term, Strategy::AliasExact))
}

fn match_alias_regex(index: &DomainIndex, raw: &str, policy: &MatchPolicy) -> Option<MatchOutcome> {
    index
        .regex_aliases
        .iter()
        .filter(|a| policy.accepts_kind(a.alias.alias_kind))
        .find(|a| a.regex.is_match(raw))
        .map(|a| alias_outcome(index, a.term, Strategy::AliasRegex))
}

fn match_alias_contains(index: &DomainIndex, normalized: &str, policy: &MatchPolicy) -> Option<MatchOutcome> {
    if normalized.is_empty() {
        return None;
    }
    index
        .contains_aliases
        .iter()
        .filter(|a| policy.accepts_kind(a.alias.alias_kind))
        .find(|a| !a.normalized.is_empty() && normalized.contains(a.normalized.as_str()))
        .map(|a| alias_outcome(index, a.term, Strategy::AliasContains))
}

/// Best similarity over every form of every term; ties keep the earlier term
fn match_fuzzy(index: &DomainIndex, normalized: &str, threshold: f64) -> Option<MatchOutcome> {
    if normalized.is_empty() {
        return None;
    }

    let mut best: Option<(&Term, f64)> = None;
    for indexed in &index.terms {
        for form in indexed.forms.iter().filter(|f| !f.is_empty()) {
            let ratio = similarity_ratio(normalized, form);
            if best.map_or(true, |(_, score)| ratio > score) {
                best = Some((&indexed.term, ratio));
            }
        }
    }

    let (term, ratio) = best?;
    if ratio < threshold {
        debug!(
            normalized = %normalized,
            closest = %term.key,
            score = ratio,
            threshold,
            "Fuzzy score below threshold"
        );
        return None;
    }

    Some(MatchOutcome::new(
        term,
        Strategy::Fuzzy,
        fuzzy_confidence(ratio),
        Some(similarity::fuzzy_reason(ratio)),
    ))
}

fn alias_outcome(index: &DomainIndex, term: usize, strategy: Strategy) -> MatchOutcome {
    let confidence = strategy.fixed_confidence().unwrap_or(ALIAS_CONFIDENCE);
    MatchOutcome::new(&index.terms[term].term, strategy, confidence, None)
}
