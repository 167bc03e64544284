//! Shared types and data contracts
//!
//! Dictionary entries (`Term`, `Alias`) are loaded once per engine and never
//! mutated. `NormalizedItem` / `NormalizedBeanInfo` are built per request.

use beanlens_common::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reason attached to blank input
pub const REASON_EMPTY_INPUT: &str = "empty_input";
/// Reason attached to values no strategy could resolve
pub const REASON_NO_DICTIONARY_MATCH: &str = "no_dictionary_match";
/// Reason attached to unknown-queue events for matches below the configured floor
pub const REASON_LOW_CONFIDENCE: &str = "low_confidence";

// ============================================================================
// Enumerations
// ============================================================================

/// Attribute category normalized independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Process,
    Variety,
    RoastLevel,
    Country,
    FlavorNote,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Process,
        Domain::Variety,
        Domain::RoastLevel,
        Domain::Country,
        Domain::FlavorNote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Process => "process",
            Domain::Variety => "variety",
            Domain::RoastLevel => "roast_level",
            Domain::Country => "country",
            Domain::FlavorNote => "flavor_note",
        }
    }

    /// Variety and flavor notes carry lists; the rest are single values
    pub fn is_multi_value(&self) -> bool {
        matches!(self, Domain::Variety | Domain::FlavorNote)
    }

    /// Warning token appended when this domain has an unmapped item
    pub fn unmapped_warning(&self) -> String {
        if self.is_multi_value() {
            format!("{}_partial_unmapped", self.as_str())
        } else {
            format!("{}_unmapped", self.as_str())
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("unknown domain '{}'", s)))
    }
}

/// How a value was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Exact,
    Alias,
    Regex,
    Fuzzy,
    #[default]
    Unmapped,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Exact => "exact",
            Method::Alias => "alias",
            Method::Regex => "regex",
            Method::Fuzzy => "fuzzy",
            Method::Unmapped => "unmapped",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alias comparison strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Regex,
    Contains,
}

/// Why an alias exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasKind {
    /// Different wording with the same meaning
    #[default]
    Semantic,
    /// Misspelling of the canonical term
    Typo,
}

// ============================================================================
// Dictionary entries
// ============================================================================

/// Canonical dictionary entry, identified by (domain, key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub domain: Domain,
    pub key: String,
    pub label_en: String,
    pub label_ko: String,
}

impl Term {
    pub fn new(domain: Domain, key: &str, label_en: &str, label_ko: &str) -> Self {
        Self {
            domain,
            key: key.to_string(),
            label_en: label_en.to_string(),
            label_ko: label_ko.to_string(),
        }
    }

    /// Values compared against input, in tie-break order
    pub fn match_candidates(&self) -> [&str; 3] {
        [&self.key, &self.label_en, &self.label_ko]
    }
}

/// Free-text variant mapped onto a term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub domain: Domain,
    pub key: String,
    pub alias: String,
    pub match_type: MatchType,
    /// Lower value = higher precedence
    pub priority: i64,
    #[serde(default)]
    pub alias_kind: AliasKind,
}

impl Alias {
    pub fn new(
        domain: Domain,
        key: &str,
        alias: &str,
        match_type: MatchType,
        priority: i64,
        alias_kind: AliasKind,
    ) -> Self {
        Self {
            domain,
            key: key.to_string(),
            alias: alias.to_string(),
            match_type,
            priority,
            alias_kind,
        }
    }
}

// ============================================================================
// Input record
// ============================================================================

/// Origin block of an extracted record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Origin {
    pub country: Option<String>,
    pub region: Option<String>,
    pub farm: Option<String>,
}

/// Structured record produced by the extractor
///
/// Only process, roast level, origin country, variety and flavor notes are
/// normalized; the remaining fields pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeanRecord {
    pub roastery: Option<String>,
    pub name: Option<String>,
    pub origin: Option<Origin>,
    pub variety: Option<Vec<String>>,
    pub process: Option<String>,
    pub roast_level: Option<String>,
    pub flavor_notes: Option<Vec<String>>,
    pub roast_date: Option<String>,
    pub altitude: Option<String>,
}

impl BeanRecord {
    pub fn country(&self) -> Option<&str> {
        self.origin.as_ref().and_then(|o| o.country.as_deref())
    }
}

// ============================================================================
// Output
// ============================================================================

/// Normalization result for one raw token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub domain: Domain,
    pub raw: String,
    pub normalized_key: Option<String>,
    pub normalized_label_en: Option<String>,
    pub normalized_label_ko: Option<String>,
    /// [0.0, 1.0]
    pub confidence: f64,
    pub method: Method,
    pub candidates: Vec<String>,
    pub reason: Option<String>,
}

impl NormalizedItem {
    fn unresolved(domain: Domain, raw: &str, reason: &str) -> Self {
        Self {
            domain,
            raw: raw.to_string(),
            normalized_key: None,
            normalized_label_en: None,
            normalized_label_ko: None,
            confidence: 0.0,
            method: Method::Unmapped,
            candidates: Vec::new(),
            reason: Some(reason.to_string()),
        }
    }

    pub fn empty_input(domain: Domain, raw: &str) -> Self {
        Self::unresolved(domain, raw, REASON_EMPTY_INPUT)
    }

    pub fn unmapped(domain: Domain, raw: &str) -> Self {
        Self::unresolved(domain, raw, REASON_NO_DICTIONARY_MATCH)
    }

    pub fn is_unmapped(&self) -> bool {
        self.method == Method::Unmapped
    }
}

/// Aggregate normalization result for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBeanInfo {
    pub dictionary_version: String,
    pub process: Option<NormalizedItem>,
    pub roast_level: Option<NormalizedItem>,
    pub country: Option<NormalizedItem>,
    pub varieties: Vec<NormalizedItem>,
    pub flavor_notes: Vec<NormalizedItem>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_round_trip_names() {
        for domain in Domain::ALL {
            assert_eq!(domain.as_str().parse::<Domain>().unwrap(), domain);
        }
        assert_eq!("flavor-note".parse::<Domain>().unwrap(), Domain::FlavorNote);
        assert!("origin".parse::<Domain>().is_err());
    }

    #[test]
    fn test_unmapped_warning_tokens() {
        assert_eq!(Domain::Process.unmapped_warning(), "process_unmapped");
        assert_eq!(Domain::RoastLevel.unmapped_warning(), "roast_level_unmapped");
        assert_eq!(Domain::Variety.unmapped_warning(), "variety_partial_unmapped");
        assert_eq!(Domain::FlavorNote.unmapped_warning(), "flavor_note_partial_unmapped");
    }

    #[test]
    fn test_alias_kind_defaults_to_semantic() {
        let alias: Alias = serde_json::from_str(
            r#"{"domain":"process","key":"washed","alias":"fully washed","match_type":"exact","priority":10}"#,
        )
        .unwrap();
        assert_eq!(alias.alias_kind, AliasKind::Semantic);
        assert_eq!(alias.match_type, MatchType::Exact);
    }

    #[test]
    fn test_record_accepts_partial_json() {
        let record: BeanRecord =
            serde_json::from_str(r#"{"process":"Washed","origin":{"country":"Kenya"}}"#).unwrap();
        assert_eq!(record.process.as_deref(), Some("Washed"));
        assert_eq!(record.country(), Some("Kenya"));
        assert!(record.variety.is_none());
    }

    #[test]
    fn test_item_serializes_null_key() {
        let item = NormalizedItem::unmapped(Domain::Process, "Mystery Process");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["method"], "unmapped");
        assert_eq!(json["domain"], "process");
        assert!(json["normalized_key"].is_null());
        assert_eq!(json["reason"], "no_dictionary_match");
    }
}
