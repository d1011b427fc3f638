//! Tag text normalization and concatenation
//!
//! Every tag string that leaves the gallery goes through [`clean`], and every
//! insertion into an existing prompt goes through [`combine`].

use once_cell::sync::Lazy;
use regex::Regex;

static EDGE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[,\s]+|[,\s]+$").unwrap());
static BREAK_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*BREAK\s*(?:,\s*)?").unwrap());
static REPEATED_PERIODS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());
static COMMA_PERIOD: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*\.").unwrap());

/// Normalize a tag string
///
/// - trims commas and whitespace from both ends
/// - replaces `BREAK` (any case, optionally followed by a comma) with `". "`
/// - collapses repeated periods and drops a comma directly before a period
/// - puts a single space after every comma or period followed by text
pub fn clean(text: &str) -> String {
    let text = EDGE_SEPARATORS.replace_all(text, "");
    let text = BREAK_TOKEN.replace_all(&text, ". ");
    let text = REPEATED_PERIODS.replace_all(&text, ".");
    let text = COMMA_PERIOD.replace_all(&text, ".");
    space_after_punctuation(&text).trim().to_string()
}

/// Join `addition` onto `existing`
///
/// Both sides are cleaned first. A trailing period on `existing` gets a plain
/// space, anything else gets `", "`.
pub fn combine(existing: &str, addition: &str) -> String {
    let existing = clean(existing);
    let addition = clean(addition);

    if existing.is_empty() {
        return addition;
    }

    if existing.ends_with('.') {
        format!("{existing} {addition}")
    } else {
        format!("{existing}, {addition}")
    }
}

// `regex` has no look-ahead, so `([.,])(?=\S)` is applied by hand.
fn space_after_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        if c == '.' || c == ',' {
            if let Some(next) = chars.peek() {
                if !next.is_whitespace() {
                    out.push(' ');
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_normalizes_break_and_periods() {
        assert_eq!(clean("  , a, b BREAK c.. "), "a, b. c.");
    }

    #[test]
    fn test_clean_break_is_case_insensitive_and_eats_comma() {
        assert_eq!(clean("red hair break, blue eyes"), "red hair. blue eyes");
        assert_eq!(clean("one BREAK two"), "one. two");
    }

    #[test]
    fn test_clean_comma_before_period() {
        assert_eq!(clean("smile, . wink"), "smile. wink");
    }

    #[test]
    fn test_clean_inserts_missing_spaces() {
        assert_eq!(clean("a,b.c"), "a, b. c");
        assert_eq!(clean("a,  b"), "a,  b");
    }

    #[test]
    fn test_clean_empty_inputs() {
        assert_eq!(clean(""), "");
        assert_eq!(clean(" ,, "), "");
    }

    #[test]
    fn test_combine_rules() {
        assert_eq!(combine("a", "b"), "a, b");
        assert_eq!(combine("a.", "b"), "a. b");
        assert_eq!(combine("", "b"), "b");
    }

    #[test]
    fn test_combine_cleans_both_sides() {
        assert_eq!(combine(" portrait, ", ", smile,"), "portrait, smile");
        assert_eq!(combine("scene BREAK", "hat"), "scene. hat");
    }
}
