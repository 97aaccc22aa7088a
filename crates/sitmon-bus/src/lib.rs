//! In-process event bus (spec.md §4.8): multi-subscriber fan-out with bounded,
//! coalescing-under-backpressure queues. No persistence; at-least-once within a
//! subscriber's lifetime, with silent drop-oldest when a subscriber falls behind.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sitmon_model::BusEvent;
use tokio::sync::{Mutex, Notify};

const QUEUE_CAPACITY: usize = 200;

struct Inbox {
    id: u64,
    queue: Mutex<VecDeque<BusEvent>>,
    notify: Notify,
}

/// A live subscription. Dropping it does not unsubscribe — call [`EventBus::unsubscribe`]
/// (mirrors the reference implementation, which relies on the SSE handler's `finally` block).
pub struct Subscription {
    inbox: Arc<Inbox>,
}

impl Subscription {
    /// Waits for the next event, coalescing: events dropped while the queue was full are
    /// simply absent, never replayed.
    pub async fn recv(&self) -> BusEvent {
        loop {
            {
                let mut queue = self.inbox.queue.lock().await;
                if let Some(event) = queue.pop_front() {
                    return event;
                }
            }
            self.inbox.notify.notified().await;
        }
    }
}

/// Process-local multi-subscriber event bus (spec.md §4.8).
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Arc<Inbox>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub async fn subscribe(&self) -> Subscription {
        let inbox = Arc::new(Inbox {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            queue: Mutex::new(VecDeque::with_capacity(QUEUE_CAPACITY)),
            notify: Notify::new(),
        });
        self.subscribers.lock().await.push(inbox.clone());
        Subscription { inbox }
    }

    pub async fn unsubscribe(&self, subscription: &Subscription) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|inbox| inbox.id != subscription.inbox.id);
    }

    /// Enqueue `event` to every current subscriber. A full queue drops its oldest entry
    /// before accepting the new one — backpressure coalesces rather than blocks.
    pub async fn publish(&self, event: BusEvent) {
        let subscribers = self.subscribers.lock().await.clone();
        for inbox in subscribers {
            let mut queue = inbox.queue.lock().await;
            if queue.len() >= QUEUE_CAPACITY {
                queue.pop_front();
            }
            queue.push_back(event.clone());
            drop(queue);
            inbox.notify.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitmon_model::Category;

    #[tokio::test]
    async fn subscriber_receives_published_events_in_order() {
        let bus = EventBus::new();
        let sub = bus.subscribe().await;

        bus.publish(BusEvent::source_health("usgs_quake", Some(200), None)).await;
        bus.publish(BusEvent::incident_created(
            "inc-1", "Title", "Summary", "2026-01-01T00:00:00Z", Category::Earthquake, None, None, 40.0, 1, 1,
        ))
        .await;

        let first = sub.recv().await;
        assert!(matches!(first.kind, sitmon_model::BusEventKind::SourceHealth { .. }));
        let second = sub.recv().await;
        assert!(matches!(second.kind, sitmon_model::BusEventKind::IncidentCreated { .. }));
    }

    #[tokio::test]
    async fn unsubscribed_queue_receives_nothing_further() {
        let bus = EventBus::new();
        let sub = bus.subscribe().await;
        bus.unsubscribe(&sub).await;

        bus.publish(BusEvent::source_health("usgs_quake", Some(200), None)).await;
        assert_eq!(bus.subscribers.lock().await.len(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_oldest_event() {
        let bus = EventBus::new();
        let sub = bus.subscribe().await;

        for i in 0..(QUEUE_CAPACITY + 5) {
            bus.publish(BusEvent::source_health(format!("source-{i}"), None, None)).await;
        }

        let first = sub.recv().await;
        match first.kind {
            sitmon_model::BusEventKind::SourceHealth { data } => {
                assert_eq!(data.source_id, "source-5");
            }
            _ => panic!("expected source.health event"),
        }
    }
}
