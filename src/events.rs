//! Produced events
//!
//! The core publishes these after a transaction commits — never from inside
//! one, since a rollback must publish nothing. `EventSink` is the seam: the
//! composition root wires a concrete sink (broadcast channel, log, test
//! recorder); the services only ever see the trait.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementOutcome {
    Won,
    Lost,
    Refunded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    BalanceUpdate {
        user_id: Uuid,
        balance: Decimal,
        exposure: Decimal,
        available_balance: Decimal,
        changed_by: &'static str,
        amount: Decimal,
    },
    BetPlaced {
        order_id: Uuid,
        user_id: Uuid,
        market_id: Uuid,
        selection_id: Uuid,
    },
    BetSettled {
        order_id: Uuid,
        user_id: Uuid,
        outcome: SettlementOutcome,
        amount: Decimal,
    },
    MatchUpdate {
        match_id: Uuid,
    },
}

/// Injected by the composition root. Services take `&dyn EventSink` (or an
/// `Arc<dyn EventSink>` when they need to outlive the request) and never
/// hold a concrete channel type.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: CoreEvent);
}

/// Fans events out on a broadcast channel, the way the teacher wires
/// `OrderUpdateEvent` into `AppState`. Lagging subscribers just miss events;
/// nothing here depends on delivery.
pub struct BroadcastEventSink {
    sender: tokio::sync::broadcast::Sender<CoreEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<CoreEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: CoreEvent) {
        tracing::debug!(?event, "publishing core event");
        // No subscribers is a normal state (e.g. in tests); ignore the error.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
pub struct RecordingEventSink {
    pub events: std::sync::Mutex<Vec<CoreEvent>>,
}

#[cfg(test)]
impl RecordingEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl EventSink for RecordingEventSink {
    fn publish(&self, event: CoreEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_captures_published_events_in_order() {
        let sink = RecordingEventSink::new();

        sink.publish(CoreEvent::MatchUpdate {
            match_id: Uuid::nil(),
        });
        sink.publish(CoreEvent::BalanceUpdate {
            user_id: Uuid::nil(),
            balance: Decimal::ZERO,
            exposure: Decimal::ZERO,
            available_balance: Decimal::ZERO,
            changed_by: "test",
            amount: Decimal::ZERO,
        });

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], CoreEvent::MatchUpdate { .. }));
        assert!(matches!(events[1], CoreEvent::BalanceUpdate { .. }));
    }
}
