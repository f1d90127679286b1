//! Bus-to-WebSocket fan-out.

use std::sync::Arc;

use estate_events::DomainEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Delivers domain events to WebSocket clients.
///
/// Events with an actor are still broadcast to everyone, including the
/// actor's own tabs, so every open view refreshes.
pub struct RelayRouter {
    ws_manager: Arc<WsManager>,
}

impl RelayRouter {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the main relay loop.
    ///
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](estate_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    self.relay(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Relay router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, relay router shutting down");
                    break;
                }
            }
        }
    }

    /// Broadcast one event. Returns the number of connections reached.
    pub async fn relay(&self, event: &DomainEvent) -> usize {
        let delivered = self.ws_manager.broadcast(&event.event, &event.payload).await;
        tracing::debug!(
            event = %event.event,
            actor_user_id = ?event.actor_user_id,
            delivered,
            "Relayed event"
        );
        delivered
    }
}
