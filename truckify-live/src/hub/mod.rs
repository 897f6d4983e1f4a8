//! Fan-out of fleet events to live subscribers.
//!
//! Every subscription owns a bounded [`outbox::Outbox`]. Publishing offers the
//! event to each matching outbox without waiting; a full outbox evicts its
//! oldest event and counts the loss on that subscription only. Closed outboxes
//! are detected on delivery and torn down.

mod outbox;
mod subscription;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::{FleetEvent, InterestSet};
use outbox::{Delivery, Outbox};

pub use subscription::{Subscription, SubscriptionId};

#[derive(Debug)]
struct Subscriber {
    interest: InterestSet,
    outbox: Arc<Outbox>,
}

#[derive(Debug)]
pub(crate) struct HubInner {
    subscribers: DashMap<SubscriptionId, Subscriber>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl Drop for HubInner {
    fn drop(&mut self) {
        for entry in &self.subscribers {
            entry.value().outbox.finish();
        }
    }
}

impl HubInner {
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        match self.subscribers.remove(&id) {
            Some((_, subscriber)) => {
                subscriber.outbox.close();
                log::debug!("subscription {id} closed");
                true
            }
            None => false,
        }
    }
}

/// Cloneable handle to the broadcast hub.
///
/// # Examples
/// ```
/// use truckify_live::{BroadcastHub, InterestSet};
///
/// let hub = BroadcastHub::new(16);
/// let subscription = hub.subscribe(InterestSet::fleet_wide());
/// assert_eq!(hub.subscriber_count(), 1);
/// drop(subscription);
/// assert_eq!(hub.subscriber_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    /// Hub whose subscriptions buffer up to `queue_capacity` events each.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                queue_capacity: queue_capacity.max(1),
            }),
        }
    }

    /// Register interest and return the subscriber's end of the queue.
    #[must_use]
    pub fn subscribe(&self, interest: InterestSet) -> Subscription {
        self.subscribe_with_capacity(interest, self.inner.queue_capacity)
    }

    /// Like [`BroadcastHub::subscribe`] with an explicit queue bound.
    #[must_use]
    pub fn subscribe_with_capacity(&self, interest: InterestSet, capacity: usize) -> Subscription {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let outbox = Arc::new(Outbox::new(capacity));
        self.inner.subscribers.insert(
            id,
            Subscriber {
                interest,
                outbox: Arc::clone(&outbox),
            },
        );
        log::debug!("subscription {id} opened");
        Subscription::new(id, outbox, Arc::downgrade(&self.inner))
    }

    /// Tear down a subscription. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    /// Offer `event` to every matching subscription and return how many
    /// queued it.
    ///
    /// Never waits on a subscriber.
    pub fn publish(&self, event: &FleetEvent) -> usize {
        let mut delivered = 0_usize;
        let mut disconnected = Vec::new();
        for entry in &self.inner.subscribers {
            let subscriber = entry.value();
            if !subscriber.interest.matches(event) {
                continue;
            }
            match subscriber.outbox.push(event.clone()) {
                Delivery::Queued => delivered = delivered.saturating_add(1),
                Delivery::DroppedOldest => {
                    log::debug!(
                        "subscription {} overflowed; {} event(s) dropped so far",
                        entry.key(),
                        subscriber.outbox.dropped()
                    );
                    delivered = delivered.saturating_add(1);
                }
                Delivery::Closed => disconnected.push(*entry.key()),
            }
        }
        for id in disconnected {
            self.inner.remove(id);
        }
        delivered
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}
