//! Detection aggregation.
//!
//! Each perception cycle two detectors look at the same frame: a
//! general-purpose detector with a fixed label set and an open-vocabulary
//! detector prompted with learned phrases. [`DetectionAggregator::merge`]
//! turns both streams into one deduplicated list where safety-relevant
//! labels (people, vehicles, stairs, …) are always announced first.

mod aggregator;
mod narration;
mod normalize;

pub use aggregator::{AggregationResult, DetectionAggregator};
pub use narration::Narration;
pub use normalize::{normalize_label, singularize};

/// Labels announced ahead of everything else by default.
pub const DEFAULT_PRIORITY_LABELS: &[&str] = &[
    "person",
    "car",
    "bicycle",
    "motorcycle",
    "bus",
    "truck",
    "dog",
    "stairs",
    "traffic light",
    "stop sign",
];

/// Aggregator configuration.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Labels that always precede non-priority labels.
    pub priority_labels: Vec<String>,
    /// Maximum number of objects named in a narration.
    pub narration_limit: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            priority_labels: DEFAULT_PRIORITY_LABELS
                .iter()
                .map(|l| (*l).to_string())
                .collect(),
            narration_limit: 5,
        }
    }
}

impl AggregatorConfig {
    /// Applies environment variable overrides.
    ///
    /// `SIGHTLINE_PRIORITY_LABELS` takes a comma-separated list.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(labels) = std::env::var("SIGHTLINE_PRIORITY_LABELS") {
            let labels: Vec<String> = labels
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            if !labels.is_empty() {
                self.priority_labels = labels;
            }
        }
        if let Some(limit) = crate::config::env_parse::<usize>("SIGHTLINE_NARRATION_LIMIT") {
            self.narration_limit = limit.max(1);
        }
        self
    }
}
