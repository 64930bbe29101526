//! Tokio broadcast event bus for telemetry fan-out.

use super::TelemetrySink;
use crate::models::TelemetryEvent;
use tokio::sync::broadcast;

/// Default buffer capacity.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1024;

/// Broadcasts telemetry events to any number of subscribers.
///
/// Owned and injected; clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TelemetryEvent>,
}

/// Filtered receiver that yields events matching a predicate.
pub struct FilteredReceiver<F> {
    receiver: broadcast::Receiver<TelemetryEvent>,
    predicate: F,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    /// Creates a new event bus with the given buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers (best effort).
    pub fn publish(&self, event: TelemetryEvent) {
        metrics::counter!("event_bus_publish_total").increment(1);
        #[allow(clippy::cast_precision_loss)]
        let receivers = self.sender.receiver_count() as f64;
        metrics::gauge!("event_bus_receivers").set(receivers);
        if self.sender.send(event).is_err() {
            metrics::counter!("event_bus_publish_failed_total").increment(1);
        }
    }

    /// Subscribes to every event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        metrics::counter!("event_bus_subscriptions_total").increment(1);
        self.sender.subscribe()
    }

    /// Subscribes with a predicate to filter events by type or attributes.
    #[must_use]
    pub fn subscribe_filtered<F>(&self, predicate: F) -> FilteredReceiver<F>
    where
        F: Fn(&TelemetryEvent) -> bool,
    {
        metrics::counter!("event_bus_subscriptions_total").increment(1);
        FilteredReceiver {
            receiver: self.sender.subscribe(),
            predicate,
        }
    }

    /// Subscribes to events matching the provided event type.
    #[must_use]
    pub fn subscribe_event_type(
        &self,
        event_type: &'static str,
    ) -> FilteredReceiver<impl Fn(&TelemetryEvent) -> bool> {
        self.subscribe_filtered(move |event| event.event_type() == event_type)
    }
}

impl TelemetrySink for EventBus {
    fn emit(&self, event: TelemetryEvent) {
        self.publish(event);
    }
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&TelemetryEvent) -> bool,
{
    /// Receives the next event that matches the predicate.
    ///
    /// # Errors
    ///
    /// Returns [`broadcast::error::RecvError::Closed`] once every sender is dropped.
    pub async fn recv(&mut self) -> Result<TelemetryEvent, broadcast::error::RecvError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if (self.predicate)(&event) {
                        return Ok(event);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    metrics::counter!("event_bus_lagged_total").increment(skipped);
                },
                Err(err) => return Err(err),
            }
        }
    }
}
