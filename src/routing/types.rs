//! Routing types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Downstream processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    /// On-device object detection; cheap and offline-capable.
    #[default]
    Fast,
    /// Remote vision-language analysis through the tier cascade.
    Deep,
    /// Hand-off to the navigation collaborator.
    Navigation,
}

impl Pipeline {
    /// Scan order: more specific pipelines first.
    pub const PRECEDENCE: [Self; 3] = [Self::Deep, Self::Navigation, Self::Fast];

    /// Returns the pipeline as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Deep => "deep",
            Self::Navigation => "navigation",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Pipeline {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" | "detection" | "fast_detection" => Ok(Self::Fast),
            "deep" | "analysis" | "deep_analysis" => Ok(Self::Deep),
            "navigation" | "nav" => Ok(Self::Navigation),
            other => Err(crate::Error::InvalidInput(format!("unknown pipeline: {other}"))),
        }
    }
}

/// How a routing decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// A trigger phrase occurred in the utterance.
    Phrase,
    /// The best similarity score reached the threshold.
    Similarity,
    /// Nothing matched; the fallback pipeline was used.
    Default,
}

impl MatchMethod {
    /// Returns the method as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Phrase => "phrase",
            Self::Similarity => "similarity",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single routing outcome for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    /// Selected pipeline.
    pub pipeline: Pipeline,
    /// How the pipeline was selected.
    pub method: MatchMethod,
    /// The matched phrase, or the best-scoring phrase for similarity matches.
    pub phrase: Option<String>,
    /// 1.0 for phrase matches, the similarity for similarity matches, and the
    /// best sub-threshold similarity for defaults.
    pub score: f32,
    /// Time spent routing.
    #[serde(with = "duration_micros")]
    pub elapsed: Duration,
}

impl RoutingDecision {
    /// Returns whether the decision came from the fallback rule.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.method == MatchMethod::Default
    }
}

mod duration_micros {
    use serde::Serializer;
    use std::time::Duration;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_micros()).unwrap_or(u64::MAX))
    }
}
