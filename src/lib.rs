//! # Sightline
//!
//! The decision-and-resilience layer of an assistive perception pipeline.
//!
//! Sightline decides which pipeline a spoken or typed request should use,
//! executes deep-analysis requests against ranked backend tiers with automatic
//! failover, merges two parallel object-detection streams into one
//! deduplicated announcement, and grows an open-vocabulary detector's label
//! set at runtime.
//!
//! ## Components
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | Intent Router | [`routing`] | utterance → fast / deep / navigation |
//! | Cascading Tier Executor | [`tiers`] | ranked backends with failover and recovery |
//! | Detection Aggregator | [`aggregation`] | dedup + priority ordering + narration |
//! | Adaptive Vocabulary Manager | [`vocabulary`] | learn labels, persist, reconfigure detector |
//! | Pipeline facade | [`perception`] | upstream caller contract, fork-join detection |
//!
//! ## Example
//!
//! ```rust,ignore
//! use sightline::routing::{IntentRouter, Pipeline};
//!
//! let router = IntentRouter::with_defaults();
//! let decision = router.route("explain what you see");
//! assert_eq!(decision.pipeline, Pipeline::Deep);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod aggregation;
pub mod config;
pub mod models;
pub mod observability;
pub mod perception;
pub mod routing;
pub mod tiers;
pub mod vocabulary;

pub use aggregation::{AggregationResult, DetectionAggregator, Narration};
pub use config::SightlineConfig;
pub use models::{
    DetectionRecord, MergedDetectionSet, TelemetryEvent, TierDescriptor, TierHealth, Utterance,
    VocabularyEntry, VocabularyOrigin,
};
pub use perception::{Dispatch, PerceptionPipeline};
pub use routing::{IntentRouter, Pipeline, RoutingDecision};
pub use tiers::{CascadingExecutor, DeepAnalysisResponse, TierBackend};
pub use vocabulary::VocabularyManager;

/// Error type for sightline operations.
///
/// Only [`Error::ServiceUnavailable`] and [`Error::Cancelled`] are produced by
/// the deep-analysis path; every other recoverable condition (quota signals,
/// transport retries, malformed detections, vocabulary persistence failures)
/// is absorbed inside its component and surfaces only as logs and telemetry.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed configuration, empty tier lists, unparsable CLI input |
/// | `OperationFailed` | I/O, serialization, or collaborator failures |
/// | `ServiceUnavailable` | Every configured tier was exhausted or failed for one request |
/// | `Cancelled` | A deep-analysis request was superseded before it finished |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// All backend tiers were exhausted or failed.
    ///
    /// Raised exactly once per request, never as a cascade of per-tier errors.
    #[error("service unavailable: all {attempted} tier attempt(s) exhausted")]
    ServiceUnavailable {
        /// Number of tiers that were attempted before giving up.
        attempted: usize,
    },

    /// The request was cancelled cooperatively.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

/// Result type alias for sightline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Returns the current Unix timestamp in milliseconds.
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
