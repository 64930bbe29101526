//! Per-tier health state machine.
//!
//! [`transition`] is pure: it maps the current health and an observed event
//! to the next health. The executor owns the clock and the locking.

use crate::models::TierHealth;

/// Something the executor observed about a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthEvent {
    /// A call returned a complete response.
    Succeeded,
    /// The backend signalled a quota or capacity limit.
    QuotaExceeded,
    /// Retryable failures used up the retry budget.
    RetriesExhausted,
    /// The backend rejected our credentials.
    Unauthorized,
    /// A recovery probe succeeded.
    ProbeSucceeded,
    /// The exhausted cool-down elapsed.
    CooldownElapsed,
}

impl HealthEvent {
    /// Returns the event as a reason string for telemetry.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::QuotaExceeded => "quota_exceeded",
            Self::RetriesExhausted => "retries_exhausted",
            Self::Unauthorized => "unauthorized",
            Self::ProbeSucceeded => "probe_succeeded",
            Self::CooldownElapsed => "cooldown_elapsed",
        }
    }
}

/// Returns the health after `event`.
///
/// | from \ event | Succeeded | QuotaExceeded | RetriesExhausted | Unauthorized | ProbeSucceeded | CooldownElapsed |
/// |---|---|---|---|---|---|---|
/// | AVAILABLE | AVAILABLE | EXHAUSTED | FAILED | FAILED | AVAILABLE | AVAILABLE |
/// | EXHAUSTED | AVAILABLE | EXHAUSTED | FAILED | FAILED | AVAILABLE | AVAILABLE |
/// | FAILED    | AVAILABLE | EXHAUSTED | FAILED | FAILED | AVAILABLE | FAILED |
#[must_use]
pub const fn transition(from: TierHealth, event: HealthEvent) -> TierHealth {
    match (from, event) {
        (_, HealthEvent::Succeeded | HealthEvent::ProbeSucceeded) => TierHealth::Available,
        (_, HealthEvent::QuotaExceeded) => TierHealth::Exhausted,
        (_, HealthEvent::RetriesExhausted | HealthEvent::Unauthorized) => TierHealth::Failed,
        (TierHealth::Failed, HealthEvent::CooldownElapsed) => TierHealth::Failed,
        (_, HealthEvent::CooldownElapsed) => TierHealth::Available,
    }
}

/// Returns whether an exhausted tier's cool-down has elapsed at `now_ms`.
///
/// A zero cool-down means timed recovery is disabled.
#[must_use]
pub const fn cooldown_elapsed(
    health: TierHealth,
    last_transition_ms: u64,
    cooldown_ms: u64,
    now_ms: u64,
) -> bool {
    matches!(health, TierHealth::Exhausted)
        && cooldown_ms > 0
        && now_ms.saturating_sub(last_transition_ms) >= cooldown_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(TierHealth::Available, HealthEvent::QuotaExceeded, TierHealth::Exhausted ; "quota exhausts")]
    #[test_case(TierHealth::Available, HealthEvent::RetriesExhausted, TierHealth::Failed ; "retries fail")]
    #[test_case(TierHealth::Available, HealthEvent::Unauthorized, TierHealth::Failed ; "unauthorized fails")]
    #[test_case(TierHealth::Exhausted, HealthEvent::CooldownElapsed, TierHealth::Available ; "cooldown recovers exhausted")]
    #[test_case(TierHealth::Failed, HealthEvent::CooldownElapsed, TierHealth::Failed ; "cooldown does not recover failed")]
    #[test_case(TierHealth::Failed, HealthEvent::ProbeSucceeded, TierHealth::Available ; "probe recovers failed")]
    #[test_case(TierHealth::Exhausted, HealthEvent::ProbeSucceeded, TierHealth::Available ; "probe recovers exhausted")]
    #[test_case(TierHealth::Failed, HealthEvent::Succeeded, TierHealth::Available ; "last resort success recovers")]
    #[test_case(TierHealth::Failed, HealthEvent::QuotaExceeded, TierHealth::Exhausted ; "failed tier reports quota")]
    fn test_transition(from: TierHealth, event: HealthEvent, expected: TierHealth) {
        assert_eq!(transition(from, event), expected);
    }

    #[test]
    fn test_cooldown_elapsed() {
        assert!(cooldown_elapsed(TierHealth::Exhausted, 1_000, 500, 1_500));
        assert!(!cooldown_elapsed(TierHealth::Exhausted, 1_000, 500, 1_499));
        assert!(!cooldown_elapsed(TierHealth::Exhausted, 1_000, 0, 99_999));
        assert!(!cooldown_elapsed(TierHealth::Failed, 1_000, 500, 9_000));
    }
}
