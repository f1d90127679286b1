use std::sync::Arc;

use estate_db::DbPool;
use estate_events::EventBus;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Handler state. Cloned per request; everything heavy sits behind `Arc`.
///
/// The relay registry and the bus are owned here rather than in globals so
/// tests can build isolated instances.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
    /// Notification relay: live client connections by account.
    pub ws_manager: Arc<WsManager>,
    /// Source of `data-updated` broadcasts.
    pub event_bus: Arc<EventBus>,
}
