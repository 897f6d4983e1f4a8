//! Bounded per-subscriber queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::FleetEvent;

/// What happened to an event offered to an [`Outbox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Queued without loss.
    Queued,
    /// Queued after evicting the oldest event.
    DroppedOldest,
    /// The subscriber is gone.
    Closed,
}

#[derive(Debug, Default)]
struct State {
    events: VecDeque<FleetEvent>,
    closed: bool,
}

/// Queue shared between the hub (producer) and one subscription (consumer).
///
/// Pushing never waits on the consumer: a full queue evicts its oldest event
/// and counts the loss.
#[derive(Debug)]
pub(crate) struct Outbox {
    state: Mutex<State>,
    capacity: usize,
    dropped: AtomicU64,
    ready: Notify,
}

impl Outbox {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
            ready: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push(&self, event: FleetEvent) -> Delivery {
        let delivery = {
            let mut state = self.lock();
            if state.closed {
                return Delivery::Closed;
            }
            let outcome = if state.events.len() >= self.capacity {
                state.events.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Delivery::DroppedOldest
            } else {
                Delivery::Queued
            };
            state.events.push_back(event);
            outcome
        };
        self.ready.notify_one();
        delivery
    }

    /// Take the next event, or `None` once closed.
    pub(crate) async fn pop(&self) -> Option<FleetEvent> {
        loop {
            {
                let mut state = self.lock();
                if let Some(event) = state.events.pop_front() {
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }
            self.ready.notified().await;
        }
    }

    pub(crate) fn try_pop(&self) -> Option<FleetEvent> {
        self.lock().events.pop_front()
    }

    /// Stop accepting events and discard anything still queued.
    pub(crate) fn close(&self) {
        {
            let mut state = self.lock();
            state.closed = true;
            state.events.clear();
        }
        self.ready.notify_waiters();
        self.ready.notify_one();
    }

    /// Stop accepting events but let the consumer drain what is queued.
    pub(crate) fn finish(&self) {
        self.lock().closed = true;
        self.ready.notify_waiters();
        self.ready.notify_one();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().events.len()
    }
}
