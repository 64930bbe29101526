//! Vocabulary entries and the persisted vocabulary snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a learned phrase came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyOrigin {
    /// Free text returned by deep analysis.
    DeepAnalysis,
    /// A point-of-interest name list.
    PointOfInterest,
    /// A user-tagged memory entry.
    UserMemory,
    /// Seeded from configuration or added by hand.
    Manual,
}

impl VocabularyOrigin {
    /// Returns the origin as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DeepAnalysis => "deep_analysis",
            Self::PointOfInterest => "point_of_interest",
            Self::UserMemory => "user_memory",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for VocabularyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VocabularyOrigin {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "deep_analysis" | "deep" => Ok(Self::DeepAnalysis),
            "point_of_interest" | "poi" => Ok(Self::PointOfInterest),
            "user_memory" | "memory" => Ok(Self::UserMemory),
            "manual" => Ok(Self::Manual),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown vocabulary origin: {other}"
            ))),
        }
    }
}

/// One learned, detectable phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    /// Normalized phrase; unique within a vocabulary.
    pub phrase: String,
    /// Where the phrase was first learned from.
    pub origin: VocabularyOrigin,
    /// First time the phrase was seen (Unix epoch milliseconds).
    pub first_seen: u64,
    /// Last time the phrase was confirmed (Unix epoch milliseconds).
    pub last_confirmed: u64,
    /// Whether the phrase is pushed to the detector.
    pub active: bool,
}

impl VocabularyEntry {
    /// Creates an active entry first seen at `now_ms`.
    #[must_use]
    pub fn new(phrase: impl Into<String>, origin: VocabularyOrigin, now_ms: u64) -> Self {
        Self {
            phrase: phrase.into(),
            origin,
            first_seen: now_ms,
            last_confirmed: now_ms,
            active: true,
        }
    }
}

/// Durable form of the vocabulary state.
///
/// Entries are ordered least-recently-confirmed first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VocabularySnapshot {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Capacity bound in force when the snapshot was written.
    pub capacity: usize,
    /// Entries, least-recently-confirmed first.
    pub entries: Vec<VocabularyEntry>,
}

const fn default_version() -> u32 {
    VocabularySnapshot::CURRENT_VERSION
}

impl VocabularySnapshot {
    /// Current on-disk schema version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Returns the active phrases in stored order.
    #[must_use]
    pub fn active_phrases(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.active)
            .map(|e| e.phrase.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_parse() {
        assert_eq!(
            "poi".parse::<VocabularyOrigin>().unwrap(),
            VocabularyOrigin::PointOfInterest
        );
        assert_eq!(
            "deep-analysis".parse::<VocabularyOrigin>().unwrap(),
            VocabularyOrigin::DeepAnalysis
        );
        assert!("radio".parse::<VocabularyOrigin>().is_err());
    }

    #[test]
    fn test_snapshot_defaults_version() {
        let snapshot: VocabularySnapshot =
            serde_json::from_str(r#"{"capacity":4,"entries":[]}"#).unwrap();
        assert_eq!(snapshot.version, VocabularySnapshot::CURRENT_VERSION);
    }

    #[test]
    fn test_active_phrases_skip_inactive() {
        let mut stale = VocabularyEntry::new("kiosk", VocabularyOrigin::Manual, 1);
        stale.active = false;
        let snapshot = VocabularySnapshot {
            version: 1,
            capacity: 4,
            entries: vec![
                stale,
                VocabularyEntry::new("bench", VocabularyOrigin::PointOfInterest, 2),
            ],
        };
        assert_eq!(snapshot.active_phrases(), vec!["bench".to_string()]);
    }
}
