//! Event Bus
//!
//! Fan-out of [`GameEvent`]s to any number of subscribers.
//!
//! ## Delivery Guarantees
//!
//! - Publishing is serialized, so every subscriber sees the same total order.
//! - A subscriber registered before `publish` is called receives that event
//!   exactly once, unless it is disconnected for being too slow.
//! - `publish` never waits: each subscriber has a bounded queue and a full
//!   queue disconnects that subscriber only.
//! - Once a [`Subscription`] is dropped (or passed to
//!   [`EventBus::unsubscribe`]) nothing more is delivered to it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::event::GameEvent;

/// Subscriber identifier, unique per bus
pub type SubscriberId = u64;

/// Default per-subscriber queue depth
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED STATE
// ═══════════════════════════════════════════════════════════════════════════════

struct BusShared {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<GameEvent>>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
    published: AtomicU64,
    disconnected_slow: AtomicU64,
}

impl BusShared {
    fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().remove(&id).is_some()
    }
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub subscribers: usize,
    pub published: u64,
    pub disconnected_slow: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT BUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Cloneable handle to one bus
#[derive(Clone)]
pub struct EventBus {
    shared: Arc<BusShared>,
}

impl EventBus {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            shared: Arc::new(BusShared {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                queue_capacity: queue_capacity.max(1),
                published: AtomicU64::new(0),
                disconnected_slow: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new subscriber with a fresh queue
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.shared.queue_capacity);
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.subscribers.lock().insert(id, tx);
        log::debug!("[Bus] Subscriber {} joined", id);

        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.shared),
        }
    }

    /// Stop delivery to `subscription` and release its queue
    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Returns the number of subscribers the event was queued for.
    pub fn publish(&self, event: GameEvent) -> usize {
        let event = Arc::new(event);
        let mut delivered = 0;

        let mut subscribers = self.shared.subscribers.lock();
        subscribers.retain(|id, tx| match tx.try_send(Arc::clone(&event)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                log::warn!(
                    "[Bus] Subscriber {} fell {} events behind, disconnecting",
                    id,
                    self.shared.queue_capacity
                );
                self.shared.disconnected_slow.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
        drop(subscribers);

        self.shared.published.fetch_add(1, Ordering::Relaxed);
        log::trace!("[Bus] {} -> {} subscribers", event.kind(), delivered);
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            subscribers: self.subscriber_count(),
            published: self.shared.published.load(Ordering::Relaxed),
            disconnected_slow: self.shared.disconnected_slow.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// One subscriber's delivery queue. Unsubscribes on drop.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<GameEvent>>,
    bus: Weak<BusShared>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event. `None` once the bus is gone or this subscriber was
    /// disconnected and its queue is drained.
    pub async fn recv(&mut self) -> Option<Arc<GameEvent>> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Self::recv`]
    pub fn try_recv(&mut self) -> Option<Arc<GameEvent>> {
        self.rx.try_recv().ok()
    }

    /// Adapt into a `Stream` (used by streaming HTTP bodies)
    pub fn into_stream(self) -> impl Stream<Item = Arc<GameEvent>> + Send + 'static {
        futures_util::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|event| (event, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.bus.upgrade() {
            if shared.remove(self.id) {
                log::debug!("[Bus] Subscriber {} left", self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn tick(t: u64) -> GameEvent {
        GameEvent::Tick { t }
    }

    fn drain(sub: &mut Subscription) -> Vec<u64> {
        let mut out = Vec::new();
        while let Some(ev) = sub.try_recv() {
            if let GameEvent::Tick { t } = *ev {
                out.push(t);
            }
        }
        out
    }

    #[test]
    fn test_publish_reaches_every_subscriber_in_order() {
        let bus = EventBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        for t in 0..5 {
            assert_eq!(bus.publish(tick(t)), 2);
        }

        assert_eq!(drain(&mut a), vec![0, 1, 2, 3, 4]);
        assert_eq!(drain(&mut b), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_late_subscriber_gets_only_later_events() {
        let bus = EventBus::new(16);
        bus.publish(tick(1));
        let mut late = bus.subscribe();
        bus.publish(tick(2));
        assert_eq!(drain(&mut late), vec![2]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new(16);
        let keep = bus.subscribe();
        let leave = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.unsubscribe(leave);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.publish(tick(1)), 1);

        drop(keep);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(tick(2)), 0);
    }

    #[test]
    fn test_slow_subscriber_disconnected_without_blocking_others() {
        let bus = EventBus::new(2);
        let mut slow = bus.subscribe();
        let mut fast = bus.subscribe();

        let mut seen_fast = Vec::new();
        for t in 0..6 {
            bus.publish(tick(t));
            seen_fast.extend(drain(&mut fast));
        }

        assert_eq!(seen_fast, vec![0, 1, 2, 3, 4, 5]);
        // The slow one keeps what was queued before the disconnect.
        assert_eq!(drain(&mut slow), vec![0, 1]);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.stats().disconnected_slow, 1);
    }

    #[test]
    fn test_subscription_outliving_bus() {
        let bus = EventBus::new(4);
        let sub = bus.subscribe();
        drop(bus);
        drop(sub);
    }

    #[tokio::test]
    async fn test_stream_ends_when_bus_dropped() {
        let bus = EventBus::new(4);
        let sub = bus.subscribe();
        bus.publish(tick(9));
        drop(bus);

        let events: Vec<_> = sub.into_stream().collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(*events[0], tick(9));
    }

    #[tokio::test]
    async fn test_concurrent_publishers_share_one_order() {
        let bus = EventBus::new(1024);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let handles: Vec<_> = (0..4)
            .map(|p| {
                let bus = bus.clone();
                tokio::spawn(async move {
                    for i in 0..100 {
                        bus.publish(tick(p * 1000 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        let seen_a = drain(&mut a);
        let seen_b = drain(&mut b);
        assert_eq!(seen_a.len(), 400);
        assert_eq!(seen_a, seen_b);
    }
}
