//! Utterance model and text normalization.

// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use crate::current_timestamp_ms;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Anything that is not a letter, digit, apostrophe or whitespace.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}'\s]+").expect("static regex: non-word"));

/// A single spoken or typed request.
///
/// Ephemeral: created per request and dropped once routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    /// Text exactly as received.
    pub raw: String,
    /// Lower-cased, punctuation-stripped, whitespace-collapsed text.
    pub normalized: String,
    /// Creation time (Unix epoch milliseconds).
    pub timestamp: u64,
}

impl Utterance {
    /// Creates an utterance stamped with the current time.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self::with_timestamp(raw, current_timestamp_ms())
    }

    /// Creates an utterance with an explicit timestamp.
    #[must_use]
    pub fn with_timestamp(raw: impl Into<String>, timestamp: u64) -> Self {
        let raw = raw.into();
        let normalized = normalize_text(&raw);
        Self {
            raw,
            normalized,
            timestamp,
        }
    }

    /// Returns the normalized tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.normalized.split(' ').filter(|t| !t.is_empty())
    }

    /// Returns whether the normalized text is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// Normalizes free text for matching.
///
/// Lower-cases, replaces punctuation with spaces, keeps apostrophes only when
/// they sit inside a word ("what's"), and collapses runs of whitespace.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, " ");
    stripped
        .split_whitespace()
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_text("  Explain, WHAT you see!! "), "explain what you see");
    }

    #[test]
    fn test_normalize_keeps_inner_apostrophes() {
        assert_eq!(normalize_text("What's 'there'?"), "what's there");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_text(" ?! "), "");
        assert!(Utterance::new("...").is_empty());
    }

    #[test]
    fn test_tokens() {
        let utterance = Utterance::with_timestamp("Take me to the door.", 7);
        let tokens: Vec<_> = utterance.tokens().collect();
        assert_eq!(tokens, vec!["take", "me", "to", "the", "door"]);
        assert_eq!(utterance.timestamp, 7);
    }
}
