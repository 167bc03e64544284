//! Similarity ratio and fuzzy confidence calibration

/// Lowest confidence granted to an accepted fuzzy match
pub const FUZZY_CONFIDENCE_MIN: f64 = 0.70;
/// Highest confidence granted to an accepted fuzzy match
pub const FUZZY_CONFIDENCE_MAX: f64 = 0.85;

/// Similarity of two normalized strings in [0.0, 1.0]
///
/// Normalized Levenshtein over Unicode scalar values, so Hangul and Latin
/// input are treated alike.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Confidence for an accepted fuzzy match: ratio rounded to two decimals,
/// clamped to [0.70, 0.85]
pub fn fuzzy_confidence(ratio: f64) -> f64 {
    round2(ratio).clamp(FUZZY_CONFIDENCE_MIN, FUZZY_CONFIDENCE_MAX)
}

/// Reason code recorded on fuzzy matches
pub fn fuzzy_reason(ratio: f64) -> String {
    format!("fuzzy_score={:.2}", ratio)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
