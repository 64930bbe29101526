//! Telemetry event types for routing, tier and vocabulary observability.

use super::{AttemptOutcome, TierHealth, VocabularyOrigin};
use crate::current_timestamp_ms;
use crate::routing::{MatchMethod, Pipeline};
use uuid::Uuid;

/// Shared event metadata required for observability.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Optional correlation identifier linking events of one request.
    pub correlation_id: Option<String>,
    /// Event source component.
    pub source: &'static str,
    /// Timestamp (Unix epoch milliseconds).
    pub timestamp: u64,
}

impl EventMeta {
    /// Creates new event metadata using the current timestamp.
    #[must_use]
    pub fn new(source: &'static str, correlation_id: Option<String>) -> Self {
        Self::with_timestamp(source, correlation_id, current_timestamp_ms())
    }

    /// Creates new event metadata with a specified timestamp.
    #[must_use]
    pub fn with_timestamp(
        source: &'static str,
        correlation_id: Option<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7().to_string(),
            correlation_id,
            source,
            timestamp,
        }
    }
}

/// Structured events accepted by the telemetry collaborator.
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// An utterance was routed.
    RouteDecided {
        /// Event metadata.
        meta: EventMeta,
        /// Selected pipeline.
        pipeline: Pipeline,
        /// How the decision was reached.
        method: MatchMethod,
        /// Matched or best-scoring phrase.
        phrase: Option<String>,
        /// Decision score in `[0, 1]`.
        score: f32,
        /// Routing latency in microseconds.
        elapsed_us: u64,
    },
    /// A backend tier was invoked.
    TierAttempted {
        /// Event metadata.
        meta: EventMeta,
        /// Tier rank.
        rank: usize,
        /// Tier name.
        tier: String,
        /// Attempt outcome.
        outcome: AttemptOutcome,
        /// Attempt duration in milliseconds.
        duration_ms: u64,
    },
    /// A backend tier changed health.
    TierTransitioned {
        /// Event metadata.
        meta: EventMeta,
        /// Tier rank.
        rank: usize,
        /// Tier name.
        tier: String,
        /// Previous health.
        from: TierHealth,
        /// New health.
        to: TierHealth,
        /// What caused the transition.
        reason: &'static str,
    },
    /// Two detection streams were merged.
    DetectionsMerged {
        /// Event metadata.
        meta: EventMeta,
        /// Records received across both streams.
        input: usize,
        /// Records emitted after dedup.
        output: usize,
        /// Records in the priority partition.
        priority: usize,
        /// Malformed records dropped.
        dropped: usize,
    },
    /// New phrases were added to the vocabulary.
    VocabularyLearned {
        /// Event metadata.
        meta: EventMeta,
        /// Origin of the phrases.
        origin: VocabularyOrigin,
        /// Newly added phrases.
        added: Vec<String>,
        /// Phrases evicted to stay within capacity.
        evicted: Vec<String>,
        /// Active-set size after the update.
        active: usize,
    },
    /// A vocabulary update was discarded.
    VocabularyRejected {
        /// Event metadata.
        meta: EventMeta,
        /// Origin of the discarded phrases.
        origin: VocabularyOrigin,
        /// Failure reason.
        reason: String,
    },
}

impl TelemetryEvent {
    /// Returns the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::RouteDecided { .. } => "route.decided",
            Self::TierAttempted { .. } => "tier.attempted",
            Self::TierTransitioned { .. } => "tier.transitioned",
            Self::DetectionsMerged { .. } => "detections.merged",
            Self::VocabularyLearned { .. } => "vocabulary.learned",
            Self::VocabularyRejected { .. } => "vocabulary.rejected",
        }
    }

    /// Returns the event metadata.
    #[must_use]
    pub const fn meta(&self) -> &EventMeta {
        match self {
            Self::RouteDecided { meta, .. }
            | Self::TierAttempted { meta, .. }
            | Self::TierTransitioned { meta, .. }
            | Self::DetectionsMerged { meta, .. }
            | Self::VocabularyLearned { meta, .. }
            | Self::VocabularyRejected { meta, .. } => meta,
        }
    }

    /// Returns the timestamp of the event.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        self.meta().timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_meta() {
        let event = TelemetryEvent::TierTransitioned {
            meta: EventMeta::with_timestamp("executor", Some("req-1".to_string()), 42),
            rank: 0,
            tier: "primary".to_string(),
            from: TierHealth::Available,
            to: TierHealth::Exhausted,
            reason: "quota_exceeded",
        };
        assert_eq!(event.event_type(), "tier.transitioned");
        assert_eq!(event.timestamp(), 42);
        assert_eq!(event.meta().correlation_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = EventMeta::new("router", None);
        let b = EventMeta::new("router", None);
        assert_ne!(a.event_id, b.event_id);
    }
}
