//! Subscriber end of the broadcast hub.

use std::fmt;
use std::sync::{Arc, Weak};

use futures_util::Stream;
use futures_util::stream;
use serde::{Deserialize, Serialize};

use super::HubInner;
use super::outbox::Outbox;
use crate::FleetEvent;

/// Identifier of a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    /// Numeric value of the identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live subscription.
///
/// Events arrive in publish order, minus any evicted on overflow. Dropping
/// the handle unsubscribes; an explicit
/// [`BroadcastHub::unsubscribe`](crate::BroadcastHub::unsubscribe) closes the
/// feed so [`Subscription::recv`] returns `None`.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    outbox: Arc<Outbox>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub(super) const fn new(id: SubscriptionId, outbox: Arc<Outbox>, hub: Weak<HubInner>) -> Self {
        Self { id, outbox, hub }
    }

    /// Identifier for [`BroadcastHub::unsubscribe`](crate::BroadcastHub::unsubscribe).
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event. Returns `None` once the subscription is
    /// closed. Cancel-safe: dropping the future loses no event.
    pub async fn recv(&mut self) -> Option<FleetEvent> {
        self.outbox.pop().await
    }

    /// Next queued event, without waiting.
    pub fn try_recv(&mut self) -> Option<FleetEvent> {
        self.outbox.try_pop()
    }

    /// Events evicted from this subscription's queue so far.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.outbox.dropped()
    }

    /// Events waiting to be received.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Whether the hub has torn this subscription down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }

    /// Unsubscribe and discard any queued events.
    pub fn close(self) {
        drop(self);
    }

    /// Lazy, unbounded stream of events that ends when the subscription is
    /// closed. Dropping the stream unsubscribes.
    pub fn into_stream(self) -> impl Stream<Item = FleetEvent> + Send + 'static {
        stream::unfold(self, |mut subscription| async move {
            let event = subscription.recv().await?;
            Some((event, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        match self.hub.upgrade() {
            Some(hub) => {
                hub.remove(self.id);
            }
            None => self.outbox.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BroadcastHub, InterestSet};
    use futures_util::StreamExt;
    use geo::Coord;
    use std::time::Duration;
    use truckify_core::Timestamp;

    fn location(sequence: u64) -> FleetEvent {
        FleetEvent::LocationUpdate {
            vehicle_id: "V1".into(),
            plan_id: None,
            position: Coord { x: 0.0, y: 0.0 },
            timestamp: Timestamp::from_secs(sequence),
            sequence,
            speed: None,
            heading: None,
        }
    }

    #[tokio::test]
    async fn stream_yields_events_in_publish_order() {
        let hub = BroadcastHub::new(8);
        let stream = hub.subscribe(InterestSet::fleet_wide()).into_stream();
        for sequence in 1..=3 {
            hub.publish(&location(sequence));
        }
        let events: Vec<_> = stream.take(3).collect().await;
        assert_eq!(events, vec![location(1), location(2), location(3)]);
    }

    #[tokio::test]
    async fn recv_can_be_cancelled() {
        let hub = BroadcastHub::new(8);
        let mut subscription = hub.subscribe(InterestSet::fleet_wide());
        let waited = tokio::time::timeout(Duration::from_millis(10), subscription.recv()).await;
        assert!(waited.is_err());

        hub.publish(&location(1));
        assert_eq!(subscription.recv().await, Some(location(1)));
    }

    #[tokio::test]
    async fn stream_ends_when_unsubscribed() {
        let hub = BroadcastHub::new(8);
        let subscription = hub.subscribe(InterestSet::fleet_wide());
        let id = subscription.id();
        let mut stream = Box::pin(subscription.into_stream());
        hub.unsubscribe(id);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn outliving_the_hub_closes_the_feed() {
        let hub = BroadcastHub::new(8);
        let mut subscription = hub.subscribe(InterestSet::fleet_wide());
        hub.publish(&location(1));
        drop(hub);
        assert_eq!(subscription.recv().await, Some(location(1)));
        assert_eq!(subscription.recv().await, None);
    }
}
