//! Backend tier descriptors and execution attempts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health of a backend tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierHealth {
    /// The tier accepts requests.
    #[default]
    Available,
    /// The tier reported a quota or capacity limit.
    Exhausted,
    /// The tier failed after its retry budget or rejected our credentials.
    Failed,
}

impl TierHealth {
    /// Returns the health as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Exhausted => "EXHAUSTED",
            Self::Failed => "FAILED",
        }
    }

    /// Returns whether the tier is in a degraded state.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        !matches!(self, Self::Available)
    }
}

impl fmt::Display for TierHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of one configured backend tier.
///
/// Rank is fixed at construction; a lower rank is tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDescriptor {
    /// Position in the cascade (0 = most preferred).
    pub rank: usize,
    /// Human-readable tier name.
    pub name: String,
    /// Current health.
    pub health: TierHealth,
    /// Time of the last health transition (Unix epoch milliseconds).
    pub last_transition: u64,
}

impl TierDescriptor {
    /// Creates an available tier descriptor.
    #[must_use]
    pub fn new(rank: usize, name: impl Into<String>, now_ms: u64) -> Self {
        Self {
            rank,
            name: name.into(),
            health: TierHealth::Available,
            last_transition: now_ms,
        }
    }
}

/// Outcome of a single tier invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The tier returned a complete response.
    Success,
    /// The tier signalled a quota or capacity limit.
    QuotaExceeded,
    /// A connection or protocol failure.
    TransportError,
    /// The call did not finish inside its timeout.
    Timeout,
    /// The tier rejected our credentials.
    Unauthorized,
    /// The attempt was abandoned because the request was superseded.
    Cancelled,
}

impl AttemptOutcome {
    /// Returns the outcome as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::QuotaExceeded => "quota_exceeded",
            Self::TransportError => "transport_error",
            Self::Timeout => "timeout",
            Self::Unauthorized => "unauthorized",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One logged tier invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionAttempt {
    /// Request this attempt belongs to.
    pub request_id: String,
    /// Rank of the tier used.
    pub tier_rank: usize,
    /// Name of the tier used.
    pub tier_name: String,
    /// 1-based try number within the tier for this request.
    pub try_number: u32,
    /// Start time (Unix epoch milliseconds).
    pub started_at: u64,
    /// End time (Unix epoch milliseconds).
    pub finished_at: u64,
    /// Outcome.
    pub outcome: AttemptOutcome,
}

impl ExecutionAttempt {
    /// Returns the attempt duration in milliseconds.
    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        self.finished_at.saturating_sub(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_strings() {
        assert_eq!(TierHealth::Available.to_string(), "AVAILABLE");
        assert_eq!(TierHealth::Exhausted.as_str(), "EXHAUSTED");
        assert!(TierHealth::Failed.is_degraded());
        assert!(!TierHealth::Available.is_degraded());
    }

    #[test]
    fn test_health_serde() {
        let json = serde_json::to_string(&TierHealth::Exhausted).unwrap();
        assert_eq!(json, "\"EXHAUSTED\"");
        let outcome: AttemptOutcome = serde_json::from_str("\"quota_exceeded\"").unwrap();
        assert_eq!(outcome, AttemptOutcome::QuotaExceeded);
    }

    #[test]
    fn test_attempt_duration_saturates() {
        let attempt = ExecutionAttempt {
            request_id: "r".to_string(),
            tier_rank: 0,
            tier_name: "primary".to_string(),
            try_number: 1,
            started_at: 10,
            finished_at: 5,
            outcome: AttemptOutcome::Timeout,
        };
        assert_eq!(attempt.duration_ms(), 0);
    }
}
