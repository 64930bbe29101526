//! Cascading tier executor.

use super::selection::{TierView, select_next};
use super::state::{HealthEvent, cooldown_elapsed, transition};
use super::{CancelToken, ExecutorConfig, TierBackend, TierError, TierRequest};
use crate::models::{
    AttemptOutcome, EventMeta, ExecutionAttempt, TelemetryEvent, TierDescriptor, TierHealth,
};
use crate::observability::{TelemetrySink, noop_sink};
use crate::{Error, Result, current_timestamp_ms};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// A complete answer from one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepAnalysisResponse {
    /// Response text.
    pub text: String,
    /// Rank of the tier that answered.
    pub tier_rank: usize,
    /// Name of the tier that answered.
    pub tier_name: String,
    /// Backend calls made for this request across all tiers.
    pub attempts: usize,
    /// Wall-clock time for the whole request.
    pub elapsed_ms: u64,
}

/// A backend together with its per-tier settings.
#[derive(Clone)]
pub struct TierSpec {
    /// The backend.
    pub backend: Arc<dyn TierBackend>,
    /// Timeout override for this tier.
    pub timeout: Option<Duration>,
}

impl From<Arc<dyn TierBackend>> for TierSpec {
    fn from(backend: Arc<dyn TierBackend>) -> Self {
        Self {
            backend,
            timeout: None,
        }
    }
}

struct TierSlot {
    descriptor: Mutex<TierDescriptor>,
    backend: Arc<dyn TierBackend>,
    timeout: Duration,
}

/// How one tier's turn in the cascade ended.
enum TierRun {
    Succeeded { text: String, tries: u32 },
    QuotaExceeded { tries: u32 },
    Unauthorized { tries: u32 },
    RetriesExhausted { tries: u32 },
    Cancelled { tries: u32 },
}

/// Executes deep-analysis requests against ranked backend tiers.
///
/// Tier health lives behind one mutex per tier that is never held across an
/// await point, so concurrent requests can share the executor through an
/// `Arc`. Within one request, tiers are tried strictly sequentially.
pub struct CascadingExecutor {
    tiers: Vec<TierSlot>,
    config: ExecutorConfig,
    attempts: Mutex<VecDeque<ExecutionAttempt>>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl CascadingExecutor {
    /// Creates an executor. Position in `tiers` is rank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no tiers are given.
    pub fn new(tiers: Vec<TierSpec>, config: ExecutorConfig) -> Result<Self> {
        if tiers.is_empty() {
            return Err(Error::InvalidInput(
                "at least one backend tier is required".to_string(),
            ));
        }
        let now = current_timestamp_ms();
        let default_timeout = config.attempt_timeout();
        let tiers = tiers
            .into_iter()
            .enumerate()
            .map(|(rank, spec)| TierSlot {
                descriptor: Mutex::new(TierDescriptor::new(rank, spec.backend.name(), now)),
                timeout: spec.timeout.unwrap_or(default_timeout),
                backend: spec.backend,
            })
            .collect();
        Ok(Self {
            tiers,
            attempts: Mutex::new(VecDeque::with_capacity(config.attempt_log_capacity.min(1024))),
            config,
            telemetry: noop_sink(),
        })
    }

    /// Creates an executor from bare backends using the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no backends are given.
    pub fn from_backends(backends: Vec<Arc<dyn TierBackend>>, config: ExecutorConfig) -> Result<Self> {
        Self::new(backends.into_iter().map(TierSpec::from).collect(), config)
    }

    /// Attaches a telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Returns the executor configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns the number of configured tiers.
    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Runs a request through the cascade.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceUnavailable`] once every eligible tier failed.
    pub async fn execute(&self, request: TierRequest) -> Result<DeepAnalysisResponse> {
        self.execute_cancellable(request, &CancelToken::new()).await
    }

    /// Runs a request through the cascade, abandoning it when `cancel` fires.
    ///
    /// Cancellation stops the current tier call and leaves tier health as it
    /// was before that call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if cancelled, or
    /// [`Error::ServiceUnavailable`] once every eligible tier failed.
    pub async fn execute_cancellable(
        &self,
        request: TierRequest,
        cancel: &CancelToken,
    ) -> Result<DeepAnalysisResponse> {
        let span = tracing::info_span!(
            "tier.execute",
            request_id = %request.request_id,
            tier = tracing::field::Empty,
            status = tracing::field::Empty
        );
        self.run_cascade(request, cancel).instrument(span).await
    }

    async fn run_cascade(
        &self,
        request: TierRequest,
        cancel: &CancelToken,
    ) -> Result<DeepAnalysisResponse> {
        let start = Instant::now();
        let mut tried = vec![false; self.tiers.len()];
        let mut last_resort_taken = false;
        let mut invocations = 0_usize;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(&request));
            }

            let now = current_timestamp_ms();
            let views: Vec<TierView> = (0..self.tiers.len())
                .map(|rank| TierView {
                    rank,
                    health: self.refresh_health(rank, now),
                    tried: tried[rank],
                })
                .collect();
            let Some(selection) = select_next(&views, last_resort_taken) else {
                break;
            };
            tried[selection.rank] = true;
            if selection.last_resort {
                last_resort_taken = true;
                tracing::warn!(
                    rank = selection.rank,
                    tier = self.tiers[selection.rank].backend.name(),
                    health = %views[selection.rank].health,
                    "All tiers degraded, trying last resort"
                );
                metrics::counter!("tier_last_resort_total").increment(1);
            }

            let correlation = Some(request.request_id.as_str());
            // A degraded tier gets a single call; the retry budget is for healthy tiers.
            let max_attempts = if selection.last_resort {
                1
            } else {
                self.config.max_attempts.max(1)
            };
            match self
                .run_tier(selection.rank, &request, cancel, max_attempts)
                .await
            {
                TierRun::Succeeded { text, tries } => {
                    invocations += tries as usize;
                    self.apply(selection.rank, HealthEvent::Succeeded, correlation);
                    let slot = &self.tiers[selection.rank];
                    let span = tracing::Span::current();
                    span.record("tier", slot.backend.name());
                    span.record("status", "success");
                    metrics::counter!("tier_requests_total", "status" => "success").increment(1);
                    return Ok(DeepAnalysisResponse {
                        text,
                        tier_rank: selection.rank,
                        tier_name: slot.backend.name().to_string(),
                        attempts: invocations,
                        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    });
                },
                TierRun::QuotaExceeded { tries } => {
                    invocations += tries as usize;
                    self.apply(selection.rank, HealthEvent::QuotaExceeded, correlation);
                },
                TierRun::Unauthorized { tries } => {
                    invocations += tries as usize;
                    self.apply(selection.rank, HealthEvent::Unauthorized, correlation);
                },
                TierRun::RetriesExhausted { tries } => {
                    invocations += tries as usize;
                    self.apply(selection.rank, HealthEvent::RetriesExhausted, correlation);
                },
                TierRun::Cancelled { .. } => return Err(self.cancelled(&request)),
            }
        }

        let attempted = tried.iter().filter(|t| **t).count();
        tracing::Span::current().record("status", "unavailable");
        tracing::error!(
            request_id = %request.request_id,
            attempted,
            invocations,
            "All tiers exhausted"
        );
        metrics::counter!("tier_requests_total", "status" => "unavailable").increment(1);
        Err(Error::ServiceUnavailable { attempted })
    }

    fn cancelled(&self, request: &TierRequest) -> Error {
        tracing::Span::current().record("status", "cancelled");
        tracing::info!(request_id = %request.request_id, "Deep analysis cancelled");
        metrics::counter!("tier_requests_total", "status" => "cancelled").increment(1);
        Error::Cancelled(format!("request {} superseded", request.request_id))
    }

    /// Tries one tier up to `max_attempts` times.
    async fn run_tier(
        &self,
        rank: usize,
        request: &TierRequest,
        cancel: &CancelToken,
        max_attempts: u32,
    ) -> TierRun {
        let slot = &self.tiers[rank];

        for try_number in 1..=max_attempts {
            let started_at = current_timestamp_ms();
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(TierError::Cancelled),
                result = tokio::time::timeout(slot.timeout, slot.backend.invoke(request, slot.timeout)) => {
                    result.unwrap_or(Err(TierError::Timeout(slot.timeout)))
                },
            };
            let result = result.and_then(|text| {
                if text.trim().is_empty() {
                    Err(TierError::Transport("empty response".to_string()))
                } else {
                    Ok(text)
                }
            });
            self.record_attempt(rank, request, try_number, started_at, &result);

            match result {
                Ok(text) => return TierRun::Succeeded { text, tries: try_number },
                Err(TierError::Cancelled) => return TierRun::Cancelled { tries: try_number },
                Err(TierError::QuotaExceeded(reason)) => {
                    tracing::warn!(rank, tier = slot.backend.name(), %reason, "Tier quota exceeded");
                    return TierRun::QuotaExceeded { tries: try_number };
                },
                Err(TierError::Unauthorized(reason)) => {
                    tracing::error!(
                        rank,
                        tier = slot.backend.name(),
                        %reason,
                        "Tier rejected credentials"
                    );
                    return TierRun::Unauthorized { tries: try_number };
                },
                Err(err) => {
                    if try_number < max_attempts {
                        let delay = self.config.backoff(try_number);
                        tracing::warn!(
                            rank,
                            tier = slot.backend.name(),
                            try_number,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %err,
                            "Retrying tier"
                        );
                        metrics::counter!("tier_retries_total", "tier" => slot.backend.name().to_string())
                            .increment(1);
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => return TierRun::Cancelled { tries: try_number },
                            () = tokio::time::sleep(delay) => {},
                        }
                    } else {
                        tracing::warn!(
                            rank,
                            tier = slot.backend.name(),
                            error = %err,
                            "Tier retry budget exhausted"
                        );
                    }
                },
            }
        }

        TierRun::RetriesExhausted {
            tries: max_attempts,
        }
    }

    fn record_attempt(
        &self,
        rank: usize,
        request: &TierRequest,
        try_number: u32,
        started_at: u64,
        result: &std::result::Result<String, TierError>,
    ) {
        let outcome = result
            .as_ref()
            .map_or_else(TierError::outcome, |_| AttemptOutcome::Success);
        let name = self.tiers[rank].backend.name().to_string();
        let attempt = ExecutionAttempt {
            request_id: request.request_id.clone(),
            tier_rank: rank,
            tier_name: name.clone(),
            try_number,
            started_at,
            finished_at: current_timestamp_ms(),
            outcome,
        };
        let duration_ms = attempt.duration_ms();

        metrics::counter!(
            "tier_attempts_total",
            "tier" => name.clone(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
        #[allow(clippy::cast_precision_loss)]
        metrics::histogram!("tier_attempt_duration_ms", "tier" => name.clone())
            .record(duration_ms as f64);

        self.telemetry.emit(TelemetryEvent::TierAttempted {
            meta: EventMeta::new("executor", Some(request.request_id.clone())),
            rank,
            tier: name,
            outcome,
            duration_ms,
        });

        let mut log = self
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while log.len() >= self.config.attempt_log_capacity.max(1) {
            log.pop_front();
        }
        log.push_back(attempt);
    }

    /// Applies an event to a tier and reports any health change.
    fn apply(&self, rank: usize, event: HealthEvent, correlation: Option<&str>) -> TierHealth {
        let slot = &self.tiers[rank];
        let now = current_timestamp_ms();
        let (from, to) = {
            let mut descriptor = slot
                .descriptor
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let from = descriptor.health;
            let to = transition(from, event);
            // A repeated quota signal restarts the cool-down.
            if to != from || event == HealthEvent::QuotaExceeded {
                descriptor.last_transition = now;
            }
            descriptor.health = to;
            (from, to)
        };
        if from != to {
            self.report_transition(rank, from, to, event.as_str(), correlation);
        }
        to
    }

    fn report_transition(
        &self,
        rank: usize,
        from: TierHealth,
        to: TierHealth,
        reason: &'static str,
        correlation: Option<&str>,
    ) {
        let name = self.tiers[rank].backend.name().to_string();
        if to == TierHealth::Available {
            tracing::info!(rank, tier = %name, %from, %to, reason, "Tier recovered");
        } else {
            tracing::warn!(rank, tier = %name, %from, %to, reason, "Tier degraded");
        }
        metrics::counter!(
            "tier_transitions_total",
            "tier" => name.clone(),
            "from" => from.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
        metrics::gauge!("tier_degraded", "tier" => name.clone())
            .set(if to.is_degraded() { 1.0 } else { 0.0 });
        self.telemetry.emit(TelemetryEvent::TierTransitioned {
            meta: EventMeta::new("executor", correlation.map(str::to_string)),
            rank,
            tier: name,
            from,
            to,
            reason,
        });
    }

    /// Returns current health, applying an elapsed cool-down first.
    fn refresh_health(&self, rank: usize, now: u64) -> TierHealth {
        let health = {
            let descriptor = self.tiers[rank]
                .descriptor
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !cooldown_elapsed(
                descriptor.health,
                descriptor.last_transition,
                self.config.exhausted_cooldown_ms,
                now,
            ) {
                return descriptor.health;
            }
            descriptor.health
        };
        // Another request may have moved the tier in between; `apply` is a
        // no-op for an already available tier.
        if health == TierHealth::Exhausted {
            return self.apply(rank, HealthEvent::CooldownElapsed, None);
        }
        health
    }

    /// Sends a recovery probe to one tier.
    ///
    /// A successful probe restores the tier. A quota answer marks it
    /// exhausted, an authorization failure marks it failed, and any other
    /// failure leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown rank.
    pub async fn probe(&self, rank: usize) -> Result<TierHealth> {
        let slot = self
            .tiers
            .get(rank)
            .ok_or_else(|| Error::InvalidInput(format!("no tier with rank {rank}")))?;

        let result = tokio::time::timeout(slot.timeout, slot.backend.probe(slot.timeout))
            .await
            .unwrap_or(Err(TierError::Timeout(slot.timeout)));
        let status = match &result {
            Ok(()) => "success",
            Err(err) => err.outcome().as_str(),
        };
        metrics::counter!(
            "tier_probes_total",
            "tier" => slot.backend.name().to_string(),
            "status" => status
        )
        .increment(1);

        let health = match result {
            Ok(()) => self.apply(rank, HealthEvent::ProbeSucceeded, None),
            Err(TierError::QuotaExceeded(_)) => self.apply(rank, HealthEvent::QuotaExceeded, None),
            Err(TierError::Unauthorized(_)) => self.apply(rank, HealthEvent::Unauthorized, None),
            Err(err) => {
                tracing::debug!(rank, tier = slot.backend.name(), error = %err, "Probe failed");
                self.refresh_health(rank, current_timestamp_ms())
            },
        };
        Ok(health)
    }

    /// Probes every degraded tier in rank order.
    ///
    /// Returns the rank and resulting health of each probed tier.
    pub async fn probe_degraded(&self) -> Vec<(usize, TierHealth)> {
        let now = current_timestamp_ms();
        let degraded: Vec<usize> = (0..self.tiers.len())
            .filter(|&rank| self.refresh_health(rank, now).is_degraded())
            .collect();
        let mut results = Vec::with_capacity(degraded.len());
        for rank in degraded {
            if let Ok(health) = self.probe(rank).await {
                results.push((rank, health));
            }
        }
        results
    }

    /// Overrides a tier's health, e.g. from an operator command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown rank.
    pub fn set_health(&self, rank: usize, health: TierHealth) -> Result<()> {
        let slot = self
            .tiers
            .get(rank)
            .ok_or_else(|| Error::InvalidInput(format!("no tier with rank {rank}")))?;
        let from = {
            let mut descriptor = slot
                .descriptor
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let from = descriptor.health;
            descriptor.health = health;
            descriptor.last_transition = current_timestamp_ms();
            from
        };
        if from != health {
            self.report_transition(rank, from, health, "override", None);
        }
        Ok(())
    }

    /// Returns the current tier descriptors in rank order.
    #[must_use]
    pub fn tier_snapshot(&self) -> Vec<TierDescriptor> {
        let now = current_timestamp_ms();
        (0..self.tiers.len())
            .map(|rank| {
                self.refresh_health(rank, now);
                self.tiers[rank]
                    .descriptor
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            })
            .collect()
    }

    /// Returns the retained attempt log, oldest first.
    #[must_use]
    pub fn attempt_log(&self) -> Vec<ExecutionAttempt> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}
