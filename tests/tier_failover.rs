//! Cascade failover scenarios against scripted backends.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use sightline::Error;
use sightline::models::{AttemptOutcome, Frame, TierHealth};
use sightline::tiers::{
    CancelToken, CascadingExecutor, ExecutorConfig, TierBackend, TierError, TierRequest,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Reply = Result<String, TierError>;

/// Replays a script of replies, then repeats the last one.
struct ScriptedTier {
    name: &'static str,
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    delay: Duration,
    calls: AtomicUsize,
    probes: AtomicUsize,
    probe_reply: Mutex<Result<(), TierError>>,
}

impl ScriptedTier {
    fn new(name: &'static str, script: Vec<Reply>) -> Arc<Self> {
        let fallback = script
            .last()
            .cloned()
            .unwrap_or_else(|| Ok(format!("{name} answer")));
        Arc::new(Self {
            name,
            script: Mutex::new(script.into()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            probe_reply: Mutex::new(Ok(())),
        })
    }

    fn slow(name: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(format!("{name} answer")),
            delay,
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            probe_reply: Mutex::new(Ok(())),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_probe_reply(&self, reply: Result<(), TierError>) {
        *self.probe_reply.lock().unwrap() = reply;
    }
}

#[async_trait]
impl TierBackend for ScriptedTier {
    fn name(&self) -> &str {
        self.name
    }

    async fn invoke(&self, _request: &TierRequest, _timeout: Duration) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn probe(&self, _timeout: Duration) -> Result<(), TierError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.probe_reply.lock().unwrap().clone()
    }
}

fn config() -> ExecutorConfig {
    ExecutorConfig {
        max_attempts: 3,
        backoff_base_ms: 1,
        backoff_max_ms: 4,
        attempt_timeout_ms: 250,
        exhausted_cooldown_ms: 0,
        probe_interval_ms: 0,
        attempt_log_capacity: 64,
    }
}

fn cascade(tiers: &[Arc<ScriptedTier>], config: ExecutorConfig) -> CascadingExecutor {
    let backends = tiers
        .iter()
        .map(|t| Arc::clone(t) as Arc<dyn TierBackend>)
        .collect();
    CascadingExecutor::from_backends(backends, config).unwrap()
}

fn request() -> TierRequest {
    TierRequest::new("read the sign", Frame::empty())
}

fn quota() -> Reply {
    Err(TierError::QuotaExceeded("rate limited".to_string()))
}

fn transport() -> Reply {
    Err(TierError::Transport("connection refused".to_string()))
}

#[tokio::test]
async fn test_exhausted_tier_is_skipped_without_a_call() {
    let tier0 = ScriptedTier::new("primary", vec![]);
    let tier1 = ScriptedTier::new("secondary", vec![]);
    let tier2 = ScriptedTier::new("local", vec![]);
    let executor = cascade(&[tier0.clone(), tier1.clone(), tier2.clone()], config());
    executor.set_health(0, TierHealth::Exhausted).unwrap();

    let response = executor.execute(request()).await.unwrap();
    assert_eq!(response.tier_rank, 1);
    assert_eq!(response.text, "secondary answer");
    assert_eq!(tier0.calls(), 0);
    assert_eq!(tier2.calls(), 0);
}

#[tokio::test]
async fn test_all_degraded_tries_one_last_resort() {
    let tiers = [
        ScriptedTier::new("a", vec![quota()]),
        ScriptedTier::new("b", vec![quota()]),
        ScriptedTier::new("c", vec![transport()]),
    ];
    let executor = cascade(&tiers, config());
    executor.set_health(0, TierHealth::Exhausted).unwrap();
    executor.set_health(1, TierHealth::Failed).unwrap();
    executor.set_health(2, TierHealth::Exhausted).unwrap();

    let err = executor.execute(request()).await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable { attempted: 1 }));
    let total_calls: usize = tiers.iter().map(|t| t.calls()).sum();
    assert_eq!(total_calls, 1);
    // The least preferred tier is the last resort.
    assert_eq!(tiers[2].calls(), 1);
}

#[tokio::test]
async fn test_last_resort_gets_a_single_call() {
    let tiers = [
        ScriptedTier::new("a", vec![transport()]),
        ScriptedTier::new("b", vec![transport()]),
    ];
    let executor = cascade(&tiers, config());
    executor.set_health(0, TierHealth::Failed).unwrap();
    executor.set_health(1, TierHealth::Failed).unwrap();

    let err = executor.execute(request()).await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable { attempted: 1 }));
    assert_eq!(tiers[0].calls(), 0);
    assert_eq!(tiers[1].calls(), 1);

    let log = executor.attempt_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].tier_rank, 1);
    assert_eq!(log[0].outcome, AttemptOutcome::TransportError);
    assert_eq!(executor.tier_snapshot()[1].health, TierHealth::Failed);
}

#[tokio::test]
async fn test_cascade_terminates_with_single_failure() {
    let tiers = [
        ScriptedTier::new("a", vec![quota()]),
        ScriptedTier::new("b", vec![transport()]),
        ScriptedTier::new("c", vec![Err(TierError::Unauthorized("bad key".to_string()))]),
    ];
    let executor = cascade(&tiers, config());

    let err = executor.execute(request()).await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable { attempted: 3 }));
    assert_eq!(tiers[0].calls(), 1);
    assert_eq!(tiers[1].calls(), 3);
    assert_eq!(tiers[2].calls(), 1);

    let health: Vec<_> = executor.tier_snapshot().iter().map(|t| t.health).collect();
    assert_eq!(
        health,
        vec![TierHealth::Exhausted, TierHealth::Failed, TierHealth::Failed]
    );

    // A second request finds every tier degraded and makes one last-resort call.
    let err = executor.execute(request()).await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable { attempted: 1 }));
    assert_eq!(tiers[0].calls(), 1);
    assert_eq!(tiers[2].calls(), 2);
}

#[tokio::test]
async fn test_last_resort_success_restores_tier() {
    let tier0 = ScriptedTier::new("a", vec![]);
    let executor = cascade(&[tier0.clone()], config());
    executor.set_health(0, TierHealth::Failed).unwrap();

    let response = executor.execute(request()).await.unwrap();
    assert_eq!(response.tier_rank, 0);
    assert_eq!(executor.tier_snapshot()[0].health, TierHealth::Available);
}

#[tokio::test]
async fn test_timeout_counts_as_transport_failure() {
    let slow = ScriptedTier::slow("slow", Duration::from_secs(5));
    let fast = ScriptedTier::new("fast", vec![]);
    let config = ExecutorConfig {
        max_attempts: 1,
        attempt_timeout_ms: 20,
        ..config()
    };
    let executor = cascade(&[slow.clone(), fast], config);

    let response = executor.execute(request()).await.unwrap();
    assert_eq!(response.tier_name, "fast");
    assert_eq!(executor.tier_snapshot()[0].health, TierHealth::Failed);
    let log = executor.attempt_log();
    assert_eq!(log[0].outcome, AttemptOutcome::Timeout);
    assert_eq!(log[1].outcome, AttemptOutcome::Success);
}

#[tokio::test]
async fn test_cancellation_leaves_health_untouched() {
    let slow = ScriptedTier::slow("slow", Duration::from_secs(5));
    let executor = Arc::new(cascade(&[slow], config()));
    let cancel = CancelToken::new();

    let task = {
        let executor = Arc::clone(&executor);
        let cancel = cancel.clone();
        tokio::spawn(async move { executor.execute_cancellable(request(), &cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled(_)));
    assert_eq!(executor.tier_snapshot()[0].health, TierHealth::Available);
}

#[tokio::test]
async fn test_cooldown_restores_exhausted_tier() {
    let tier0 = ScriptedTier::new("a", vec![quota(), Ok("a again".to_string())]);
    let tier1 = ScriptedTier::new("b", vec![]);
    let config = ExecutorConfig {
        exhausted_cooldown_ms: 30,
        ..config()
    };
    let executor = cascade(&[tier0.clone(), tier1], config);

    let first = executor.execute(request()).await.unwrap();
    assert_eq!(first.tier_name, "b");

    tokio::time::sleep(Duration::from_millis(60)).await;
    let second = executor.execute(request()).await.unwrap();
    assert_eq!(second.tier_name, "a");
    assert_eq!(second.text, "a again");
}

#[tokio::test]
async fn test_probes_recover_degraded_tiers() {
    let tier0 = ScriptedTier::new("a", vec![]);
    let tier1 = ScriptedTier::new("b", vec![]);
    let executor = cascade(&[tier0.clone(), tier1.clone()], config());
    executor.set_health(0, TierHealth::Failed).unwrap();
    executor.set_health(1, TierHealth::Exhausted).unwrap();
    tier1.set_probe_reply(Err(TierError::QuotaExceeded("still limited".to_string())));

    let probed = executor.probe_degraded().await;
    assert_eq!(
        probed,
        vec![(0, TierHealth::Available), (1, TierHealth::Exhausted)]
    );
    assert_eq!(executor.probe(0).await.unwrap(), TierHealth::Available);
    assert!(executor.probe(9).await.is_err());
}

#[tokio::test]
async fn test_concurrent_requests_share_health() {
    let tier0 = ScriptedTier::new("a", vec![quota()]);
    let tier1 = ScriptedTier::new("b", vec![]);
    let executor = Arc::new(cascade(&[tier0.clone(), tier1.clone()], config()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move { executor.execute(request()).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(executor.tier_snapshot()[0].health, TierHealth::Exhausted);
    assert_eq!(tier1.calls(), 8);

    // Once marked exhausted, tier 0 is no longer called.
    let before = tier0.calls();
    executor.execute(request()).await.unwrap();
    assert_eq!(tier0.calls(), before);
}
