//! Text canonicalization and list splitting
//!
//! `normalize_text` is the single comparison form used by every matching
//! strategy except regex aliases, which see the raw input.

use unicode_normalization::UnicodeNormalization;

/// Separators recognized inside a multi-value field
pub const LIST_SEPARATORS: [char; 7] = [',', '\n', ';', '/', '|', '·', '、'];

/// Canonical comparison form of a string.
///
/// Performs:
/// - Unicode NFKC fold
/// - Lowercase conversion
/// - Punctuation, `_` and `-` replaced with a space
/// - Whitespace collapsed and trimmed
///
/// # Examples
///
/// ```
/// use beanlens_norm::text::normalize_text;
///
/// assert_eq!(normalize_text("Medium-Light"), "medium light");
/// assert_eq!(normalize_text("  Welch's  "), "welch s");
/// assert_eq!(normalize_text("ＳＬ２８"), "sl28");
/// ```
pub fn normalize_text(value: &str) -> String {
    let folded: String = value.nfkc().collect();

    let stripped: String = folded
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Break a compound raw value into independent tokens.
///
/// Tokens are trimmed and empty ones dropped. A value without any separator
/// comes back as a single trimmed element (possibly empty).
pub fn split_multi_value(raw: &str) -> Vec<String> {
    if !raw.contains(LIST_SEPARATORS) {
        return vec![raw.trim().to_string()];
    }

    raw.split(LIST_SEPARATORS)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
