//! Realtime change events
//!
//! Services publish a `RealtimeEvent` whenever a message or notification row
//! is inserted or updated. WebSocket connections subscribe to the bus and
//! keep only the events addressed to their user.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel; slower receivers observe `Lagged`
const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeTable {
    Messages,
    Notifications,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeAction {
    Insert,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    pub table: RealtimeTable,
    pub action: RealtimeAction,
    /// User whose unread counts may have changed
    pub recipient_id: i64,
}

impl RealtimeEvent {
    pub fn new(table: RealtimeTable, action: RealtimeAction, recipient_id: i64) -> Self {
        Self {
            table,
            action,
            recipient_id,
        }
    }
}

/// In-process fan-out of realtime events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: RealtimeEvent) {
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::trace!(?event, receivers, "Realtime event published");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let event = RealtimeEvent::new(RealtimeTable::Messages, RealtimeAction::Insert, 7);
        bus.publish(event);

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(RealtimeEvent::new(
            RealtimeTable::Notifications,
            RealtimeAction::Update,
            1,
        ));
    }

    #[test]
    fn test_event_serializes_lowercase() {
        let event = RealtimeEvent::new(RealtimeTable::Notifications, RealtimeAction::Insert, 3);
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["table"], "notifications");
        assert_eq!(json["action"], "insert");
    }
}
