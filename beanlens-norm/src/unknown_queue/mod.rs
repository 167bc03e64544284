//! Unknown queue reporting
//!
//! Values the dictionary could not resolve (or resolved below the configured
//! confidence floor) are reported as [`UnknownQueueEvent`]s to every
//! configured sink. Reporting is best-effort and at-most-once: sinks swallow
//! their own failures and never surface them to the normalization caller.

pub mod jsonl;
pub mod summary;
pub mod webhook;

use crate::types::{Domain, Method};
use beanlens_common::time::secs_to_duration;
use beanlens_common::NormalizationConfig;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub use jsonl::JsonlSink;
pub use summary::{load_records, render_json, render_table, summarize, UnknownQueueSummaryRow};
pub use webhook::{WebhookError, WebhookSink};

/// One record of the unknown queue (JSONL line / webhook body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownQueueEvent {
    /// RFC 3339 UTC
    pub ts: String,
    pub domain: Domain,
    pub raw: String,
    pub confidence: f64,
    pub reason: String,
    pub method: Method,
    pub normalized_key: Option<String>,
    pub dictionary_version: String,
}

impl UnknownQueueEvent {
    pub fn new(
        domain: Domain,
        raw: &str,
        confidence: f64,
        reason: &str,
        method: Method,
        normalized_key: Option<&str>,
        dictionary_version: &str,
    ) -> Self {
        Self {
            ts: beanlens_common::time::now_rfc3339(),
            domain,
            raw: raw.to_string(),
            confidence,
            reason: reason.to_string(),
            method,
            normalized_key: normalized_key.map(str::to_string),
            dictionary_version: dictionary_version.to_string(),
        }
    }
}

/// Destination for unknown-queue events
///
/// `deliver` must not panic or block beyond its own bounded timeout.
pub trait UnknownQueueSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn deliver(&self, event: &UnknownQueueEvent);

    /// Wait up to `timeout` for previously delivered events to complete.
    /// Returns `false` if the wait timed out.
    fn flush(&self, _timeout: Duration) -> bool {
        true
    }
}

/// Fan-out over the configured sinks
#[derive(Default)]
pub struct UnknownQueueReporter {
    sinks: Vec<Box<dyn UnknownQueueSink>>,
}

impl UnknownQueueReporter {
    /// Reporter with no sinks; `enqueue` is a no-op
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build sinks from `unknown_queue_path` and `unknown_queue_webhook_url`
    pub fn from_config(config: &NormalizationConfig) -> Self {
        let mut sinks: Vec<Box<dyn UnknownQueueSink>> = Vec::new();

        if let Some(path) = &config.unknown_queue_path {
            sinks.push(Box::new(JsonlSink::new(path)));
        }

        if let Some(url) = config.unknown_queue_webhook_url.as_deref().filter(|u| !u.is_empty()) {
            let timeout = secs_to_duration(config.unknown_queue_webhook_timeout_secs);
            match WebhookSink::spawn(url, config.unknown_queue_webhook_token.clone(), timeout) {
                Ok(sink) => sinks.push(Box::new(sink)),
                Err(e) => warn!(url = %url, error = %e, "Webhook sink disabled"),
            }
        }

        debug!(sinks = sinks.len(), "Unknown queue reporter configured");
        Self { sinks }
    }

    pub fn with_sinks(sinks: Vec<Box<dyn UnknownQueueSink>>) -> Self {
        Self { sinks }
    }

    pub fn is_enabled(&self) -> bool {
        !self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Hand the event to every sink
    pub fn enqueue(&self, event: &UnknownQueueEvent) {
        for sink in &self.sinks {
            sink.deliver(event);
        }
    }

    /// Wait for pending deliveries, sharing one deadline across sinks
    pub fn flush(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        let mut complete = true;
        for sink in &self.sinks {
            let remaining = timeout.saturating_sub(start.elapsed());
            if !sink.flush(remaining) {
                warn!(sink = sink.name(), "Unknown queue flush timed out");
                complete = false;
            }
        }
        complete
    }
}

impl std::fmt::Debug for UnknownQueueReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnknownQueueReporter")
            .field("sinks", &self.sink_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recording(Arc<Mutex<Vec<UnknownQueueEvent>>>);

    impl UnknownQueueSink for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn deliver(&self, event: &UnknownQueueEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn event() -> UnknownQueueEvent {
        UnknownQueueEvent::new(
            Domain::Process,
            "Mystery Process",
            0.0,
            "no_dictionary_match",
            Method::Unmapped,
            None,
            "v1",
        )
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(event()).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "confidence",
                "dictionary_version",
                "domain",
                "method",
                "normalized_key",
                "raw",
                "reason",
                "ts"
            ]
        );
        assert!(json["normalized_key"].is_null());
        assert_eq!(json["method"], "unmapped");
        assert!(chrono::DateTime::parse_from_rfc3339(json["ts"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_disabled_reporter_is_noop() {
        let reporter = UnknownQueueReporter::disabled();
        assert!(!reporter.is_enabled());
        reporter.enqueue(&event());
        assert!(reporter.flush(Duration::from_millis(10)));
    }

    #[test]
    fn test_fan_out_to_every_sink() {
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));
        let reporter = UnknownQueueReporter::with_sinks(vec![
            Box::new(Recording(first.clone())),
            Box::new(Recording(second.clone())),
        ]);

        reporter.enqueue(&event());

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().len(), 1);
        assert_eq!(reporter.sink_names(), vec!["recording", "recording"]);
    }

    #[test]
    fn test_flush_with_unbounded_timeout() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let reporter = UnknownQueueReporter::with_sinks(vec![Box::new(Recording(events.clone()))]);
        reporter.enqueue(&event());
        assert!(reporter.flush(Duration::MAX));
    }

    #[test]
    fn test_from_config_without_targets_is_disabled() {
        let reporter = UnknownQueueReporter::from_config(&NormalizationConfig::default());
        assert!(!reporter.is_enabled());
    }
}
