//! Unknown-queue log summary
//!
//! Groups logged events by (domain, raw) so curators can see which values
//! most need a dictionary entry.

use beanlens_common::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Default number of rows rendered
pub const DEFAULT_TOP: usize = 50;

const TABLE_HEADER: &str = "count | domain | raw | reason | method | avg_confidence | latest_ts";
const TABLE_SEPARATOR: &str = "--- | --- | --- | --- | --- | --- | ---";

/// Aggregate for one (domain, raw) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnknownQueueSummaryRow {
    pub domain: String,
    pub raw: String,
    pub count: usize,
    /// Reason of the last record seen
    pub reason: Option<String>,
    /// Method of the last record seen
    pub method: Option<String>,
    /// Mean of numeric confidences, rounded to four decimals
    pub avg_confidence: f64,
    pub latest_ts: Option<String>,
}

/// Read a JSONL log; a missing file yields no records
///
/// Blank and malformed lines are skipped.
pub fn load_records(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        debug!(path = %path.display(), "Unknown queue log not found");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)?;
    let mut skipped = 0usize;
    let records: Vec<Value> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(value) => Some(value),
            Err(_) => {
                skipped += 1;
                None
            }
        })
        .collect();

    debug!(
        path = %path.display(),
        records = records.len(),
        skipped,
        "Loaded unknown queue log"
    );
    Ok(records)
}

#[derive(Default)]
struct Group {
    count: usize,
    reason: Option<String>,
    method: Option<String>,
    confidence_sum: f64,
    confidence_count: usize,
    latest_ts: Option<String>,
}

/// Group records, most frequent first (ties by domain, then raw)
///
/// Records without a domain or raw value are ignored.
pub fn summarize(records: &[Value]) -> Vec<UnknownQueueSummaryRow> {
    let mut groups: HashMap<(String, String), Group> = HashMap::new();

    for record in records {
        let domain = field_text(record, "domain");
        let raw = field_text(record, "raw");
        if domain.is_empty() || raw.is_empty() {
            continue;
        }

        let group = groups.entry((domain, raw)).or_default();
        group.count += 1;
        group.reason = record.get("reason").and_then(Value::as_str).map(str::to_string);
        group.method = record.get("method").and_then(Value::as_str).map(str::to_string);

        if let Some(confidence) = record.get("confidence").and_then(Value::as_f64) {
            group.confidence_sum += confidence;
            group.confidence_count += 1;
        }

        if let Some(ts) = record.get("ts").and_then(Value::as_str) {
            if group.latest_ts.as_deref().map_or(true, |latest| ts > latest) {
                group.latest_ts = Some(ts.to_string());
            }
        }
    }

    let mut rows: Vec<UnknownQueueSummaryRow> = groups
        .into_iter()
        .map(|((domain, raw), group)| {
            let avg = if group.confidence_count == 0 {
                0.0
            } else {
                group.confidence_sum / group.confidence_count as f64
            };
            UnknownQueueSummaryRow {
                domain,
                raw,
                count: group.count,
                reason: group.reason,
                method: group.method,
                avg_confidence: (avg * 10_000.0).round() / 10_000.0,
                latest_ts: group.latest_ts,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.domain.cmp(&b.domain))
            .then_with(|| a.raw.cmp(&b.raw))
    });
    rows
}

/// Markdown-style table of the first `top` rows
pub fn render_table(rows: &[UnknownQueueSummaryRow], top: usize) -> String {
    let mut lines = vec![TABLE_HEADER.to_string(), TABLE_SEPARATOR.to_string()];
    for row in rows.iter().take(top) {
        lines.push(format!(
            "{} | {} | {} | {} | {} | {} | {}",
            row.count,
            row.domain,
            row.raw,
            row.reason.as_deref().unwrap_or("-"),
            row.method.as_deref().unwrap_or("-"),
            row.avg_confidence,
            row.latest_ts.as_deref().unwrap_or("-"),
        ));
    }
    lines.join("\n")
}

/// Pretty JSON array of the first `top` rows
pub fn render_json(rows: &[UnknownQueueSummaryRow], top: usize) -> Result<String> {
    let end = top.min(rows.len());
    Ok(serde_json::to_string_pretty(&rows[..end])?)
}

fn field_text(record: &Value, field: &str) -> String {
    match record.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
