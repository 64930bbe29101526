//! Continuous perception at a fixed cadence.

use super::{Detector, detect_pair};
use crate::Result;
use crate::aggregation::{AggregationResult, DetectionAggregator};
use crate::models::Frame;
use crate::tiers::CancelToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Supplies camera frames.
pub trait FrameSource: Send + Sync {
    /// Returns the latest frame, or `None` if no new frame is available.
    ///
    /// # Errors
    ///
    /// Returns an error if capture failed.
    fn next_frame(&self) -> Result<Option<Frame>>;
}

/// Samples a [`FrameSource`], detects, merges, and publishes the latest
/// result on a `watch` channel.
///
/// A slow cycle delays the next one instead of overlapping it.
pub struct PerceptionLoop {
    shutdown: CancelToken,
    handle: JoinHandle<()>,
    latest: watch::Receiver<Option<AggregationResult>>,
}

impl PerceptionLoop {
    /// Starts the loop on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn start(
        source: Arc<dyn FrameSource>,
        general: Arc<dyn Detector>,
        open: Arc<dyn Detector>,
        aggregator: Arc<DetectionAggregator>,
        cadence: Duration,
    ) -> Self {
        let (sender, latest) = watch::channel(None);
        let shutdown = CancelToken::new();
        let stop = shutdown.clone();
        let cadence = cadence.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut cycles = 0_u64;
            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => {},
                }

                let source = Arc::clone(&source);
                let general = Arc::clone(&general);
                let open = Arc::clone(&open);
                let aggregator = Arc::clone(&aggregator);
                let cycle = tokio::task::spawn_blocking(move || -> Result<Option<AggregationResult>> {
                    let Some(frame) = source.next_frame()? else {
                        return Ok(None);
                    };
                    let (first, second) = detect_pair(general.as_ref(), open.as_ref(), &frame);
                    Ok(Some(aggregator.merge(first, second)))
                });

                match cycle.await {
                    Ok(Ok(Some(result))) => {
                        cycles += 1;
                        sender.send_replace(Some(result));
                    },
                    Ok(Ok(None)) => {},
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Frame capture failed");
                        metrics::counter!("perception_capture_failures_total").increment(1);
                    },
                    Err(e) => tracing::error!(error = %e, "Perception cycle panicked"),
                }
            }
            tracing::debug!(cycles, "Perception loop stopped");
        });

        Self {
            shutdown,
            handle,
            latest,
        }
    }

    /// Returns the most recent result.
    #[must_use]
    pub fn latest(&self) -> Option<AggregationResult> {
        self.latest.borrow().clone()
    }

    /// Returns a receiver notified after every completed cycle.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AggregationResult>> {
        self.latest.clone()
    }

    /// Stops the loop after the current cycle and waits for it.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Perception loop task failed");
        }
    }
}
