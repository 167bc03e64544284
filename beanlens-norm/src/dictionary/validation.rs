//! Dictionary consistency checks
//!
//! Curation tooling runs these before publishing a snapshot. The engine itself
//! never calls them: a dangling alias degrades to "unmatchable" instead of
//! failing construction.

use super::DictionaryRepository;
use crate::text::normalize_text;
use crate::types::{Domain, MatchType};
use regex::RegexBuilder;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single consistency problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionaryIssue {
    /// Alias (domain, key) has no matching term
    DanglingAlias {
        domain: Domain,
        key: String,
        alias: String,
    },
    /// Same normalized alias text maps to two different keys
    ConflictingAlias {
        domain: Domain,
        normalized: String,
        first_key: String,
        second_key: String,
    },
    /// Term identity (domain, key) appears more than once
    DuplicateTerm { domain: Domain, key: String },
    /// Regex alias does not compile
    InvalidRegex {
        domain: Domain,
        key: String,
        alias: String,
        error: String,
    },
}

impl fmt::Display for DictionaryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictionaryIssue::DanglingAlias { domain, key, alias } => write!(
                f,
                "alias '{}' references unknown term ({}, {})",
                alias, domain, key
            ),
            DictionaryIssue::ConflictingAlias {
                domain,
                normalized,
                first_key,
                second_key,
            } => write!(
                f,
                "conflicting alias for ({}, '{}'): {} vs {}",
                domain, normalized, first_key, second_key
            ),
            DictionaryIssue::DuplicateTerm { domain, key } => {
                write!(f, "duplicate term ({}, {})", domain, key)
            }
            DictionaryIssue::InvalidRegex {
                domain,
                key,
                alias,
                error,
            } => write!(
                f,
                "regex alias '{}' for ({}, {}) does not compile: {}",
                alias, domain, key, error
            ),
        }
    }
}

/// Run every check; an empty result means the snapshot is consistent
///
/// Issues are reported per domain in `Domain::ALL` order, then in snapshot order.
pub fn validate_dictionary(repo: &DictionaryRepository) -> Vec<DictionaryIssue> {
    let mut issues = Vec::new();

    for domain in Domain::ALL {
        let mut seen_terms = HashSet::new();
        for term in repo.terms_by_domain(domain) {
            if !seen_terms.insert(term.key.as_str()) {
                issues.push(DictionaryIssue::DuplicateTerm {
                    domain,
                    key: term.key.clone(),
                });
            }
        }

        // normalized alias text → first key seen
        let mut seen_aliases: HashMap<String, &str> = HashMap::new();
        for alias in repo.aliases_by_domain(domain) {
            if repo.term(domain, &alias.key).is_none() {
                issues.push(DictionaryIssue::DanglingAlias {
                    domain,
                    key: alias.key.clone(),
                    alias: alias.alias.clone(),
                });
            }

            if alias.match_type == MatchType::Regex {
                if let Err(e) = RegexBuilder::new(&alias.alias).case_insensitive(true).build() {
                    issues.push(DictionaryIssue::InvalidRegex {
                        domain,
                        key: alias.key.clone(),
                        alias: alias.alias.clone(),
                        error: e.to_string(),
                    });
                }
                continue;
            }

            let normalized = normalize_text(&alias.alias);
            match seen_aliases.get(normalized.as_str()) {
                Some(first_key) if *first_key != alias.key => {
                    issues.push(DictionaryIssue::ConflictingAlias {
                        domain,
                        normalized,
                        first_key: first_key.to_string(),
                        second_key: alias.key.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    seen_aliases.insert(normalized, alias.key.as_str());
                }
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Alias, AliasKind, Term};

    fn alias(domain: Domain, key: &str, text: &str, match_type: MatchType) -> Alias {
        Alias::new(domain, key, text, match_type, 10, AliasKind::Semantic)
    }

    #[test]
    fn test_shipped_dictionary_is_consistent() {
        let repo = DictionaryRepository::load("v1").unwrap();
        let issues = validate_dictionary(&repo);
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn test_detects_dangling_alias() {
        let repo = DictionaryRepository::from_parts(
            "t",
            vec![Term::new(Domain::Process, "washed", "Washed", "워시드")],
            vec![alias(Domain::Process, "honey", "pulped natural", MatchType::Exact)],
        );
        let issues = validate_dictionary(&repo);
        assert_eq!(
            issues,
            vec![DictionaryIssue::DanglingAlias {
                domain: Domain::Process,
                key: "honey".to_string(),
                alias: "pulped natural".to_string(),
            }]
        );
    }

    #[test]
    fn test_detects_conflicting_alias_after_normalization() {
        let repo = DictionaryRepository::from_parts(
            "t",
            vec![
                Term::new(Domain::RoastLevel, "medium", "Medium", "미디엄"),
                Term::new(Domain::RoastLevel, "medium_dark", "Medium Dark", "미디엄 다크"),
            ],
            vec![
                alias(Domain::RoastLevel, "medium", "City", MatchType::Exact),
                alias(Domain::RoastLevel, "medium_dark", "city!", MatchType::Contains),
            ],
        );
        let issues = validate_dictionary(&repo);
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            &issues[0],
            DictionaryIssue::ConflictingAlias { normalized, .. } if normalized == "city"
        ));
    }

    #[test]
    fn test_same_key_repeated_alias_is_not_a_conflict() {
        let repo = DictionaryRepository::from_parts(
            "t",
            vec![Term::new(Domain::Variety, "heirloom", "Heirloom", "에어룸")],
            vec![
                alias(Domain::Variety, "heirloom", "landrace", MatchType::Exact),
                alias(Domain::Variety, "heirloom", "Landrace", MatchType::Contains),
            ],
        );
        assert!(validate_dictionary(&repo).is_empty());
    }

    #[test]
    fn test_detects_duplicate_term_and_bad_regex() {
        let repo = DictionaryRepository::from_parts(
            "t",
            vec![
                Term::new(Domain::Country, "ET", "Ethiopia", "에티오피아"),
                Term::new(Domain::Country, "ET", "Ethiopia", "이디오피아"),
            ],
            vec![alias(Domain::Country, "ET", "ethiopi(a", MatchType::Regex)],
        );
        let issues = validate_dictionary(&repo);
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], DictionaryIssue::DuplicateTerm { .. }));
        assert!(matches!(issues[1], DictionaryIssue::InvalidRegex { .. }));
        assert!(issues[1].to_string().contains("does not compile"));
    }
}
