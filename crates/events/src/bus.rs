use chrono::{DateTime, Utc};
use estate_core::types::DbId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Client event telling every open view that stored records changed.
pub const DATA_UPDATED: &str = "data-updated";

/// Slow subscribers start missing events beyond this backlog.
const CHANNEL_CAPACITY: usize = 1024;

/// Something connected clients should hear about.
///
/// `event` and `payload` are forwarded to clients unchanged; the other
/// fields are for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event: String,
    pub payload: Value,
    pub actor_user_id: Option<DbId>,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            payload: json!({}),
            actor_user_id: None,
            timestamp: Utc::now(),
        }
    }

    /// `data-updated` with payload `{ "type": kind, "action": action }`.
    ///
    /// `kind` is an owner kind (`property`, `rent`); `action` names the
    /// mutation (`add`, `update`, `delete`, `payment`, `payment-edit`,
    /// `payment-delete`).
    pub fn data_updated(kind: &str, action: &str) -> Self {
        Self::new(DATA_UPDATED).with_payload(json!({ "type": kind, "action": action }))
    }

    pub fn with_actor(self, user_id: DbId) -> Self {
        Self {
            actor_user_id: Some(user_id),
            ..self
        }
    }

    pub fn with_payload(self, payload: Value) -> Self {
        Self { payload, ..self }
    }
}

/// Fire-and-forget fan-out over `tokio::sync::broadcast`.
///
/// Shared as `Arc<EventBus>`. Dropping the last handle closes the channel,
/// which ends every subscriber loop.
///
/// ```rust
/// use estate_events::{DomainEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
/// bus.publish(DomainEvent::data_updated("rent", "add"));
/// assert_eq!(rx.try_recv().unwrap().payload["action"], "add");
/// ```
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Returns how many subscribers the event reached. Zero is normal when no
    /// relay is running.
    pub fn publish(&self, event: DomainEvent) -> usize {
        tracing::debug!(
            event = %event.event,
            payload = %event.payload,
            actor = ?event.actor_user_id,
            "Publishing event"
        );
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}
