//! Configuration model and resolution
//!
//! Normalization settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`BEANLENS_*`)
//! 3. TOML configuration file
//! 4. Compiled defaults (fallback)
//!
//! A missing TOML file is not an error. Every resolved configuration is
//! validated before an engine may be built from it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Default dictionary version shipped with the engine
pub const DEFAULT_DICTIONARY_VERSION: &str = "v1";
/// Default minimum similarity for fuzzy matches outside flavor-note strict mode
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.86;
/// Default minimum similarity for fuzzy flavor-note matches in strict mode
pub const DEFAULT_FLAVOR_NOTE_FUZZY_THRESHOLD: f64 = 0.94;
/// Default webhook delivery timeout in seconds
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: f64 = 2.0;
/// Largest accepted webhook delivery timeout in seconds
pub const MAX_WEBHOOK_TIMEOUT_SECS: f64 = 3600.0;

const ENV_PREFIX: &str = "BEANLENS_";

/// Flavor-note matching policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlavorNoteMode {
    /// Exact, typo aliases and high-threshold fuzzy only
    #[default]
    Strict,
    /// Same strategy set as every other domain
    Legacy,
}

impl FlavorNoteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlavorNoteMode::Strict => "strict",
            FlavorNoteMode::Legacy => "legacy",
        }
    }
}

impl fmt::Display for FlavorNoteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlavorNoteMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(FlavorNoteMode::Strict),
            "legacy" => Ok(FlavorNoteMode::Legacy),
            other => Err(Error::Config(format!(
                "flavor_note_mode must be 'strict' or 'legacy', got '{}'",
                other
            ))),
        }
    }
}

/// Normalization engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Dictionary snapshot version to load
    pub dictionary_version: String,

    /// Directory holding `<version>/terms.json` and `<version>/aliases.json`
    /// (consulted before the embedded snapshots)
    pub dictionary_dir: Option<PathBuf>,

    /// Minimum similarity ratio for fuzzy matches
    pub fuzzy_threshold: f64,

    /// Default flavor-note policy (overridable per call)
    pub flavor_note_mode: FlavorNoteMode,

    /// Minimum similarity ratio for fuzzy flavor notes in strict mode
    pub flavor_note_fuzzy_threshold: f64,

    /// JSON Lines log receiving unknown-queue events
    pub unknown_queue_path: Option<PathBuf>,

    /// Matches below this confidence are also reported as `low_confidence`
    pub unknown_min_confidence: Option<f64>,

    /// Webhook receiving unknown-queue events
    pub unknown_queue_webhook_url: Option<String>,

    /// Shared secret sent with each webhook delivery
    pub unknown_queue_webhook_token: Option<String>,

    /// Upper bound for a single webhook delivery
    pub unknown_queue_webhook_timeout_secs: f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            dictionary_version: DEFAULT_DICTIONARY_VERSION.to_string(),
            dictionary_dir: None,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            flavor_note_mode: FlavorNoteMode::default(),
            flavor_note_fuzzy_threshold: DEFAULT_FLAVOR_NOTE_FUZZY_THRESHOLD,
            unknown_queue_path: None,
            unknown_min_confidence: None,
            unknown_queue_webhook_url: None,
            unknown_queue_webhook_token: None,
            unknown_queue_webhook_timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
        }
    }
}

impl NormalizationConfig {
    /// Check value ranges
    ///
    /// Thresholds must lie in (0, 1], the low-confidence floor in [0, 1] and
    /// the webhook timeout within (0, 3600] seconds.
    pub fn validate(&self) -> Result<()> {
        if self.dictionary_version.trim().is_empty() {
            return Err(Error::Config("dictionary_version must not be empty".to_string()));
        }
        check_threshold("fuzzy_threshold", self.fuzzy_threshold)?;
        check_threshold("flavor_note_fuzzy_threshold", self.flavor_note_fuzzy_threshold)?;

        if let Some(floor) = self.unknown_min_confidence {
            if !(0.0..=1.0).contains(&floor) {
                return Err(Error::Config(format!(
                    "unknown_min_confidence must be within [0, 1], got {}",
                    floor
                )));
            }
        }

        let timeout = self.unknown_queue_webhook_timeout_secs;
        if !(timeout > 0.0 && timeout <= MAX_WEBHOOK_TIMEOUT_SECS) {
            return Err(Error::Config(format!(
                "unknown_queue_webhook_timeout_secs must be within (0, {}], got {}",
                MAX_WEBHOOK_TIMEOUT_SECS, timeout
            )));
        }

        Ok(())
    }

    /// Apply `BEANLENS_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply environment-style overrides from an arbitrary lookup
    ///
    /// Blank values are treated as unset.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, suffix))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("DICTIONARY_VERSION") {
            self.dictionary_version = v;
        }
        if let Some(v) = get("DICTIONARY_DIR") {
            self.dictionary_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("FUZZY_THRESHOLD") {
            self.fuzzy_threshold = parse_f64("BEANLENS_FUZZY_THRESHOLD", &v)?;
        }
        if let Some(v) = get("FLAVOR_NOTE_MODE") {
            self.flavor_note_mode = v.parse()?;
        }
        if let Some(v) = get("FLAVOR_NOTE_FUZZY_THRESHOLD") {
            self.flavor_note_fuzzy_threshold =
                parse_f64("BEANLENS_FLAVOR_NOTE_FUZZY_THRESHOLD", &v)?;
        }
        if let Some(v) = get("UNKNOWN_QUEUE_PATH") {
            self.unknown_queue_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("UNKNOWN_MIN_CONFIDENCE") {
            self.unknown_min_confidence = Some(parse_f64("BEANLENS_UNKNOWN_MIN_CONFIDENCE", &v)?);
        }
        if let Some(v) = get("UNKNOWN_QUEUE_WEBHOOK_URL") {
            self.unknown_queue_webhook_url = Some(v);
        }
        if let Some(v) = get("UNKNOWN_QUEUE_WEBHOOK_TOKEN") {
            self.unknown_queue_webhook_token = Some(v);
        }
        if let Some(v) = get("UNKNOWN_QUEUE_WEBHOOK_TIMEOUT") {
            self.unknown_queue_webhook_timeout_secs =
                parse_f64("BEANLENS_UNKNOWN_QUEUE_WEBHOOK_TIMEOUT", &v)?;
        }

        Ok(())
    }

    /// Fuzzy threshold in effect for flavor notes under the given mode
    pub fn flavor_note_threshold(&self, mode: FlavorNoteMode) -> f64 {
        match mode {
            FlavorNoteMode::Strict => self.flavor_note_fuzzy_threshold,
            FlavorNoteMode::Legacy => self.fuzzy_threshold,
        }
    }
}

fn check_threshold(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be within (0, 1], got {}", name, value)))
    }
}

fn parse_f64(name: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| Error::Config(format!("{}: invalid number '{}': {}", name, raw, e)))
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub normalization: NormalizationConfig,
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Default configuration file location (`~/.config/beanlens/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("beanlens").join("config.toml"))
}

/// Command-line overrides (highest priority)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dictionary_version: Option<String>,
    pub dictionary_dir: Option<PathBuf>,
    pub fuzzy_threshold: Option<f64>,
    pub flavor_note_mode: Option<FlavorNoteMode>,
    pub flavor_note_fuzzy_threshold: Option<f64>,
    pub unknown_queue_path: Option<PathBuf>,
    pub unknown_min_confidence: Option<f64>,
    pub unknown_queue_webhook_url: Option<String>,
    pub unknown_queue_webhook_token: Option<String>,
    pub unknown_queue_webhook_timeout_secs: Option<f64>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut TomlConfig) {
        let n = &mut config.normalization;
        if let Some(v) = &self.dictionary_version {
            n.dictionary_version = v.clone();
        }
        if let Some(v) = &self.dictionary_dir {
            n.dictionary_dir = Some(v.clone());
        }
        if let Some(v) = self.fuzzy_threshold {
            n.fuzzy_threshold = v;
        }
        if let Some(v) = self.flavor_note_mode {
            n.flavor_note_mode = v;
        }
        if let Some(v) = self.flavor_note_fuzzy_threshold {
            n.flavor_note_fuzzy_threshold = v;
        }
        if let Some(v) = &self.unknown_queue_path {
            n.unknown_queue_path = Some(v.clone());
        }
        if let Some(v) = self.unknown_min_confidence {
            n.unknown_min_confidence = Some(v);
        }
        if let Some(v) = &self.unknown_queue_webhook_url {
            n.unknown_queue_webhook_url = Some(v.clone());
        }
        if let Some(v) = &self.unknown_queue_webhook_token {
            n.unknown_queue_webhook_token = Some(v.clone());
        }
        if let Some(v) = self.unknown_queue_webhook_timeout_secs {
            n.unknown_queue_webhook_timeout_secs = v;
        }
        if let Some(v) = &self.log_level {
            config.logging.level = v.clone();
        }
    }
}

/// Resolve the effective configuration
///
/// An explicit `config_path` must exist; the default location is optional.
pub fn resolve_config(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<TomlConfig> {
    // Priority 3: TOML config file
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            TomlConfig::load(path)?
        }
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                TomlConfig::load(&path)?
            }
            None => {
                debug!("No configuration file found, using compiled defaults");
                TomlConfig::default()
            }
        },
    };

    // Priority 2: Environment variables
    config.normalization.apply_env()?;
    if let Ok(level) = std::env::var("BEANLENS_LOG_LEVEL") {
        if !level.trim().is_empty() {
            config.logging.level = level.trim().to_string();
        }
    }

    // Priority 1: Command-line arguments
    overrides.apply(&mut config);

    config.normalization.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = NormalizationConfig::default();
        assert_eq!(config.dictionary_version, "v1");
        assert_eq!(config.fuzzy_threshold, 0.86);
        assert_eq!(config.flavor_note_mode, FlavorNoteMode::Strict);
        assert_eq!(config.flavor_note_fuzzy_threshold, 0.94);
        assert_eq!(config.unknown_queue_webhook_timeout_secs, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let config = NormalizationConfig {
            fuzzy_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = NormalizationConfig {
            flavor_note_fuzzy_threshold: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_min_confidence_range() {
        let mut config = NormalizationConfig {
            unknown_min_confidence: Some(-0.1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.unknown_min_confidence = Some(0.0);
        assert!(config.validate().is_ok());
        config.unknown_min_confidence = Some(1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_webhook_timeout_rejected() {
        let config = NormalizationConfig {
            unknown_queue_webhook_timeout_secs: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_webhook_timeout_upper_bound() {
        let mut config = NormalizationConfig {
            unknown_queue_webhook_timeout_secs: MAX_WEBHOOK_TIMEOUT_SECS,
            unknown_queue_webhook_url: Some("http://127.0.0.1:9/unknown".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.unknown_queue_webhook_timeout_secs = 3600.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.unknown_queue_webhook_timeout_secs = 1e30;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.unknown_queue_webhook_timeout_secs = f64::INFINITY;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_flavor_note_mode_parse() {
        assert_eq!("strict".parse::<FlavorNoteMode>().unwrap(), FlavorNoteMode::Strict);
        assert_eq!(" Legacy ".parse::<FlavorNoteMode>().unwrap(), FlavorNoteMode::Legacy);
        assert!("loose".parse::<FlavorNoteMode>().is_err());
    }

    #[test]
    fn test_flavor_note_threshold_by_mode() {
        let config = NormalizationConfig::default();
        assert_eq!(config.flavor_note_threshold(FlavorNoteMode::Strict), 0.94);
        assert_eq!(config.flavor_note_threshold(FlavorNoteMode::Legacy), 0.86);
    }

    #[test]
    fn test_apply_env_with_lookup() {
        let vars: HashMap<&str, &str> = [
            ("BEANLENS_DICTIONARY_VERSION", "v2"),
            ("BEANLENS_FUZZY_THRESHOLD", "0.9"),
            ("BEANLENS_FLAVOR_NOTE_MODE", "legacy"),
            ("BEANLENS_UNKNOWN_MIN_CONFIDENCE", "0.8"),
            ("BEANLENS_UNKNOWN_QUEUE_WEBHOOK_TOKEN", "   "),
        ]
        .into_iter()
        .collect();

        let mut config = NormalizationConfig::default();
        config
            .apply_env_with(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.dictionary_version, "v2");
        assert_eq!(config.fuzzy_threshold, 0.9);
        assert_eq!(config.flavor_note_mode, FlavorNoteMode::Legacy);
        assert_eq!(config.unknown_min_confidence, Some(0.8));
        // Blank values count as unset
        assert_eq!(config.unknown_queue_webhook_token, None);
    }

    #[test]
    fn test_apply_env_invalid_number() {
        let mut config = NormalizationConfig::default();
        let result = config.apply_env_with(|name| {
            (name == "BEANLENS_FUZZY_THRESHOLD").then(|| "high".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_toml_partial() {
        let config = TomlConfig::parse(
            r#"
            [logging]
            level = "debug"

            [normalization]
            fuzzy_threshold = 0.9
            flavor_note_mode = "legacy"
            unknown_queue_path = "/tmp/unknown.jsonl"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.normalization.fuzzy_threshold, 0.9);
        assert_eq!(config.normalization.flavor_note_mode, FlavorNoteMode::Legacy);
        assert_eq!(
            config.normalization.unknown_queue_path,
            Some(PathBuf::from("/tmp/unknown.jsonl"))
        );
        // Untouched keys keep their defaults
        assert_eq!(config.normalization.dictionary_version, "v1");
        assert_eq!(config.normalization.flavor_note_fuzzy_threshold, 0.94);
    }

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        let config = TomlConfig::parse("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.logging.level, "info");
    }
}
