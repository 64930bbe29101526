//! Background recovery probing.

use super::{CancelToken, CascadingExecutor};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Periodically probes degraded tiers until stopped.
pub struct RecoveryMonitor {
    shutdown: CancelToken,
    handle: JoinHandle<()>,
}

impl RecoveryMonitor {
    /// Starts probing every `interval` on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn start(executor: Arc<CascadingExecutor>, interval: Duration) -> Self {
        let shutdown = CancelToken::new();
        let stop = shutdown.clone();
        let interval = interval.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            tracing::info!(
                interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
                "Recovery monitor started"
            );
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        let probed = executor.probe_degraded().await;
                        if !probed.is_empty() {
                            let recovered = probed.iter().filter(|(_, h)| !h.is_degraded()).count();
                            tracing::debug!(
                                probed = probed.len(),
                                recovered,
                                "Recovery probes finished"
                            );
                        }
                    },
                }
            }
            tracing::info!("Recovery monitor stopped");
        });
        Self { shutdown, handle }
    }

    /// Stops the monitor and waits for it to exit.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Recovery monitor task failed");
        }
    }
}
