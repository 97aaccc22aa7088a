//! `GET /sse`: bridges the event bus to a browser's `EventSource` (spec.md §2.1, §4.8).
//! One subscription per connection; heartbeats every 15s keep idle connections alive
//! through intermediary proxies, matching the reference implementation's SSE loop.

use std::convert::Infallible;
use std::time::Duration;

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures::stream::Stream;
use sitmon_bus::{EventBus, Subscription};
use sitmon_model::BusEventKind;

use crate::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

fn event_type(kind: &BusEventKind) -> &'static str {
    match kind {
        BusEventKind::IncidentCreated { .. } => "incident.created",
        BusEventKind::IncidentUpdated { .. } => "incident.updated",
        BusEventKind::SourceHealth { .. } => "source.health",
    }
}

/// Unsubscribes on drop so a closed connection doesn't leak its queue forever ([`EventBus`]
/// has no reaper of its own — the reference implementation relies on the SSE handler's
/// `finally` block for this, which Rust expresses as a `Drop` impl spawning the async cleanup).
struct SubscriptionGuard {
    bus: Arc<EventBus>,
    subscription: Option<Subscription>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            let bus = self.bus.clone();
            tokio::spawn(async move { bus.unsubscribe(&subscription).await });
        }
    }
}

fn event_stream(bus: Arc<EventBus>, subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = SubscriptionGuard { bus, subscription: Some(subscription) };
    futures::stream::unfold(guard, |guard| async move {
        let event = guard.subscription.as_ref().expect("guard holds a live subscription").recv().await;
        let data = serde_json::to_string(&event).unwrap_or_default();
        let sse_event = Event::default().event(event_type(&event.kind)).data(data);
        Some((Ok(sse_event), guard))
    })
}

pub async fn handle(State(state): State<AppState>) -> impl IntoResponse {
    let subscription = state.bus.subscribe().await;
    Sse::new(event_stream(state.bus.clone(), subscription))
        .keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL))
}
