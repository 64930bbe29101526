//! Human-readable rendering of a merged detection set.

use crate::models::MergedDetectionSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to announce for one perception cycle.
///
/// `NoDetections` is an explicit state, so a caller can tell "nothing was
/// seen" apart from "nothing to say yet".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Narration {
    /// Neither detector reported anything usable.
    NoDetections,
    /// Joined labels, priority objects first.
    Summary(String),
}

impl Narration {
    /// Renders `set`, naming at most `limit` objects.
    #[must_use]
    pub fn from_set(set: &MergedDetectionSet, limit: usize) -> Self {
        if set.is_empty() {
            return Self::NoDetections;
        }
        let limit = limit.max(1);
        let labels = set.labels();
        let (named, rest) = labels.split_at(labels.len().min(limit));
        let mut items: Vec<String> = named.iter().map(|l| (*l).to_string()).collect();
        if !rest.is_empty() {
            items.push(format!("{} more", rest.len()));
        }
        Self::Summary(join_natural(&items))
    }

    /// Returns the text to speak.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::NoDetections => "nothing detected",
            Self::Summary(text) => text,
        }
    }

    /// Returns whether anything was detected.
    #[must_use]
    pub const fn has_detections(&self) -> bool {
        matches!(self, Self::Summary(_))
    }
}

impl fmt::Display for Narration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Joins items as "a", "a and b", "a, b and c".
fn join_natural(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
