//! Cascading tier execution.
//!
//! A deep-analysis request is executed against N ranked, interchangeable
//! backend tiers. Each tier carries its own health state machine:
//!
//! ```text
//!              quota signal                 retries exhausted / unauthorized
//!  AVAILABLE ───────────────▶ EXHAUSTED     AVAILABLE ─────────────────────▶ FAILED
//!      ▲                          │             ▲                               │
//!      └── cool-down / probe ─────┘             └──────── probe succeeds ───────┘
//! ```
//!
//! Tiers are tried strictly one at a time in rank order. Degraded tiers are
//! skipped while an untried available tier remains; when none remains, one
//! degraded tier is tried as a last resort. Exhausting the cascade yields a
//! single [`crate::Error::ServiceUnavailable`].

mod cancel;
mod executor;
mod factory;
mod fixed;
mod http;
mod recovery;
pub mod selection;
pub mod state;
mod worker;

pub use cancel::CancelToken;
pub use executor::{CascadingExecutor, DeepAnalysisResponse, TierSpec};
pub use factory::build_tier_backends;
pub use fixed::FixedResponseBackend;
pub use http::HttpTierBackend;
pub use recovery::RecoveryMonitor;
pub use worker::{DeepAnalysisWorker, JobId, WorkerEvent};

use crate::models::{AttemptOutcome, Frame};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a backend tier.
///
/// Stays inside the executor; callers only ever see
/// [`crate::Error::ServiceUnavailable`] or [`crate::Error::Cancelled`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TierError {
    /// The backend signalled a quota or capacity limit.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    /// Connection, protocol or server failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend rejected our credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The call did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The request was superseded.
    #[error("cancelled")]
    Cancelled,
}

impl TierError {
    /// Returns the attempt outcome for this error.
    #[must_use]
    pub const fn outcome(&self) -> AttemptOutcome {
        match self {
            Self::QuotaExceeded(_) => AttemptOutcome::QuotaExceeded,
            Self::Transport(_) => AttemptOutcome::TransportError,
            Self::Unauthorized(_) => AttemptOutcome::Unauthorized,
            Self::Timeout(_) => AttemptOutcome::Timeout,
            Self::Cancelled => AttemptOutcome::Cancelled,
        }
    }

    /// Returns whether another try against the same tier may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

/// One deep-analysis request.
#[derive(Debug, Clone)]
pub struct TierRequest {
    /// Correlation identifier.
    pub request_id: String,
    /// The user's question.
    pub query: String,
    /// The frame the question is about.
    pub frame: Frame,
}

impl TierRequest {
    /// Creates a request with a fresh identifier.
    #[must_use]
    pub fn new(query: impl Into<String>, frame: Frame) -> Self {
        Self {
            request_id: uuid::Uuid::now_v7().to_string(),
            query: query.into(),
            frame,
        }
    }

    /// Creates the minimal request used for recovery probes.
    #[must_use]
    pub fn probe() -> Self {
        Self {
            request_id: format!("probe-{}", uuid::Uuid::now_v7()),
            query: "ping".to_string(),
            frame: Frame::empty(),
        }
    }
}

/// A backend tier: a vision-language service reachable by one `invoke` call.
///
/// Implementations should honour `timeout` themselves; the executor also
/// enforces it.
#[async_trait]
pub trait TierBackend: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &str;

    /// Answers `request.query` about `request.frame`.
    async fn invoke(&self, request: &TierRequest, timeout: Duration) -> Result<String, TierError>;

    /// Checks whether the tier is serving again.
    ///
    /// The default sends a minimal request.
    async fn probe(&self, timeout: Duration) -> Result<(), TierError> {
        self.invoke(&TierRequest::probe(), timeout).await.map(|_| ())
    }
}

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Tries per tier on retryable failures.
    pub max_attempts: u32,
    /// Delay before the second try; doubles per try.
    pub backoff_base_ms: u64,
    /// Backoff ceiling.
    pub backoff_max_ms: u64,
    /// Per-call timeout.
    pub attempt_timeout_ms: u64,
    /// Time after which an exhausted tier is considered available again.
    /// Zero disables timed recovery; only probes restore the tier.
    pub exhausted_cooldown_ms: u64,
    /// Interval of the background recovery monitor; zero disables it.
    pub probe_interval_ms: u64,
    /// Maximum retained attempt log entries.
    pub attempt_log_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 200,
            backoff_max_ms: 2_000,
            attempt_timeout_ms: 10_000,
            exhausted_cooldown_ms: 60_000,
            probe_interval_ms: 30_000,
            attempt_log_capacity: 256,
        }
    }
}

impl ExecutorConfig {
    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        use crate::config::env_parse;

        if let Some(v) = env_parse::<u32>("SIGHTLINE_EXECUTOR_MAX_ATTEMPTS") {
            self.max_attempts = v.max(1);
        }
        if let Some(v) = env_parse::<u64>("SIGHTLINE_EXECUTOR_BACKOFF_MS") {
            self.backoff_base_ms = v;
        }
        if let Some(v) = env_parse::<u64>("SIGHTLINE_EXECUTOR_TIMEOUT_MS") {
            self.attempt_timeout_ms = v.max(1);
        }
        if let Some(v) = env_parse::<u64>("SIGHTLINE_EXECUTOR_COOLDOWN_MS") {
            self.exhausted_cooldown_ms = v;
        }
        if let Some(v) = env_parse::<u64>("SIGHTLINE_EXECUTOR_PROBE_INTERVAL_MS") {
            self.probe_interval_ms = v;
        }
        self
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Returns the delay before try `try_number + 1`.
    #[must_use]
    pub fn backoff(&self, try_number: u32) -> Duration {
        let exponent = try_number.saturating_sub(1).min(16);
        let delay = self
            .backoff_base_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.backoff_max_ms);
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = ExecutorConfig {
            backoff_base_ms: 100,
            backoff_max_ms: 350,
            ..ExecutorConfig::default()
        };
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(350));
        assert_eq!(config.backoff(40), Duration::from_millis(350));
    }

    #[test]
    fn test_error_classification() {
        assert!(TierError::Transport("reset".into()).is_retryable());
        assert!(TierError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!TierError::QuotaExceeded("429".into()).is_retryable());
        assert!(!TierError::Unauthorized("401".into()).is_retryable());
        assert_eq!(
            TierError::QuotaExceeded(String::new()).outcome(),
            AttemptOutcome::QuotaExceeded
        );
    }
}
