//! Connection registry for the notification relay.
//!
//! A connection is added anonymously on upgrade and becomes addressable by
//! account once the client authenticates. One account may hold several
//! connections (browser tabs); each account id maps to the set of its
//! connection ids, and an emptied set is dropped.

use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use estate_core::types::{DbId, Timestamp};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{mpsc, RwLock};

/// Outbound queue of one relay connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// One open relay socket.
pub struct WsConnection {
    /// Account the connection is registered under, once authenticated.
    pub account_id: Option<DbId>,
    pub sender: WsSender,
    pub connected_at: Timestamp,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<String, WsConnection>,
    accounts: HashMap<DbId, HashSet<String>>,
}

impl Registry {
    fn detach(&mut self, conn_id: &str, account_id: DbId) {
        if let Some(set) = self.accounts.get_mut(&account_id) {
            set.remove(conn_id);
            if set.is_empty() {
                self.accounts.remove(&account_id);
            }
        }
    }
}

/// The relay registry: open sockets, and which accounts own them.
///
/// Owned by `main` and shared as `Arc<WsManager>`; there is no global
/// instance.
pub struct WsManager {
    registry: RwLock<Registry>,
}

/// Encode an event as the JSON text frame clients receive.
fn event_frame<T: Serialize + ?Sized>(event: &str, payload: &T) -> Message {
    let frame = json!({ "event": event, "data": payload });
    Message::Text(frame.to_string().into())
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Track a fresh, anonymous socket. The caller drains the returned
    /// receiver into the socket.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            account_id: None,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.registry.write().await.connections.insert(conn_id, conn);
        rx
    }

    /// Associate a live connection with an account.
    ///
    /// Re-registering under another account moves the connection. Returns
    /// `false` if `conn_id` is unknown.
    pub async fn register(&self, account_id: DbId, conn_id: &str) -> bool {
        let mut reg = self.registry.write().await;
        let previous = match reg.connections.get_mut(conn_id) {
            Some(conn) => conn.account_id.replace(account_id),
            None => return false,
        };
        if let Some(prev) = previous.filter(|prev| *prev != account_id) {
            reg.detach(conn_id, prev);
        }
        reg.accounts
            .entry(account_id)
            .or_default()
            .insert(conn_id.to_string());
        true
    }

    /// Remove a connection from the registry and from its account's set.
    pub async fn remove(&self, conn_id: &str) {
        let mut reg = self.registry.write().await;
        if let Some(conn) = reg.connections.remove(conn_id) {
            if let Some(account_id) = conn.account_id {
                reg.detach(conn_id, account_id);
            }
        }
    }

    /// Deliver an event to every connection registered for `account_id`.
    ///
    /// Returns the number of connections reached; zero is not an error.
    pub async fn notify_account<T: Serialize + ?Sized>(
        &self,
        account_id: DbId,
        event: &str,
        payload: &T,
    ) -> usize {
        let reg = self.registry.read().await;
        let Some(conn_ids) = reg.accounts.get(&account_id) else {
            return 0;
        };
        let message = event_frame(event, payload);
        let mut count = 0;
        for conn_id in conn_ids {
            if let Some(conn) = reg.connections.get(conn_id) {
                if conn.sender.send(message.clone()).is_ok() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Deliver an event to every open connection, authenticated or not.
    ///
    /// Connections whose send channels are closed are skipped; they are
    /// cleaned up when their receive loop ends.
    pub async fn broadcast<T: Serialize + ?Sized>(&self, event: &str, payload: &T) -> usize {
        let reg = self.registry.read().await;
        let message = event_frame(event, payload);
        reg.connections
            .values()
            .filter(|conn| conn.sender.send(message.clone()).is_ok())
            .count()
    }

    /// Send a raw message to one connection (handshake replies).
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        let reg = self.registry.read().await;
        reg.connections
            .get(conn_id)
            .is_some_and(|conn| conn.sender.send(message).is_ok())
    }

    /// Open sockets, authenticated or not.
    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }

    /// Number of live connections registered for `account_id`.
    pub async fn account_connection_count(&self, account_id: DbId) -> usize {
        self.registry
            .read()
            .await
            .accounts
            .get(&account_id)
            .map_or(0, HashSet::len)
    }

    /// Close every socket and forget all registrations (shutdown).
    pub async fn shutdown_all(&self) {
        let mut reg = self.registry.write().await;
        let count = reg.connections.len();
        for conn in reg.connections.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        reg.connections.clear();
        reg.accounts.clear();
        tracing::info!(count, "Relay registry closed");
    }

    /// Heartbeat ping to every socket.
    pub async fn ping_all(&self) {
        let reg = self.registry.read().await;
        for conn in reg.connections.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
