//! Notification relay: connection registry and bus fan-out.

use std::sync::Arc;

use axum::extract::ws::Message;
use estate_api::notifications::router::RelayRouter;
use estate_api::ws::WsManager;
use estate_events::{DomainEvent, EventBus};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

fn next_frame(rx: &mut UnboundedReceiver<Message>) -> Value {
    match rx.try_recv() {
        Ok(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_register_and_notify_account() {
    let manager = WsManager::new();
    let mut rx = manager.add("c1".to_string()).await;
    assert!(manager.register(7, "c1").await);
    assert_eq!(manager.account_connection_count(7).await, 1);

    let reached = manager
        .notify_account(7, "force-logout", &json!({ "reason": "bye" }))
        .await;
    assert_eq!(reached, 1);
    let frame = next_frame(&mut rx);
    assert_eq!(frame, json!({ "event": "force-logout", "data": { "reason": "bye" } }));
}

#[tokio::test]
async fn test_register_unknown_connection_fails() {
    let manager = WsManager::new();
    assert!(!manager.register(7, "ghost").await);
    assert_eq!(manager.account_connection_count(7).await, 0);
}

/// Every tab of an account is reached; other accounts are not.
#[tokio::test]
async fn test_notify_reaches_all_tabs_of_one_account() {
    let manager = WsManager::new();
    let mut tab1 = manager.add("t1".to_string()).await;
    let mut tab2 = manager.add("t2".to_string()).await;
    let mut other = manager.add("o1".to_string()).await;
    manager.register(1, "t1").await;
    manager.register(1, "t2").await;
    manager.register(2, "o1").await;

    let reached = manager.notify_account(1, "force-logout", &json!({})).await;
    assert_eq!(reached, 2);
    assert_eq!(next_frame(&mut tab1)["event"], "force-logout");
    assert_eq!(next_frame(&mut tab2)["event"], "force-logout");
    assert!(other.try_recv().is_err());
}

#[tokio::test]
async fn test_notify_unknown_account_is_noop() {
    let manager = WsManager::new();
    let _rx = manager.add("c1".to_string()).await;
    assert_eq!(manager.notify_account(99, "force-logout", &json!({})).await, 0);
}

/// Removing the last connection of an account drops the account entry.
#[tokio::test]
async fn test_remove_drops_empty_account_set() {
    let manager = WsManager::new();
    let _a = manager.add("a".to_string()).await;
    let _b = manager.add("b".to_string()).await;
    manager.register(3, "a").await;
    manager.register(3, "b").await;

    manager.remove("a").await;
    assert_eq!(manager.account_connection_count(3).await, 1);
    manager.remove("b").await;
    assert_eq!(manager.account_connection_count(3).await, 0);
    assert_eq!(manager.connection_count().await, 0);
    assert_eq!(manager.notify_account(3, "x", &json!({})).await, 0);

    // Removing twice is harmless.
    manager.remove("b").await;
}

/// Re-registering under another account moves the connection.
#[tokio::test]
async fn test_reregister_moves_connection() {
    let manager = WsManager::new();
    let _rx = manager.add("c1".to_string()).await;
    manager.register(1, "c1").await;
    manager.register(2, "c1").await;

    assert_eq!(manager.account_connection_count(1).await, 0);
    assert_eq!(manager.account_connection_count(2).await, 1);
}

/// Broadcast reaches anonymous connections too.
#[tokio::test]
async fn test_broadcast_reaches_every_connection() {
    let manager = WsManager::new();
    let mut anon = manager.add("anon".to_string()).await;
    let mut authed = manager.add("authed".to_string()).await;
    manager.register(5, "authed").await;

    let reached = manager
        .broadcast("data-updated", &json!({ "type": "rent", "action": "add" }))
        .await;
    assert_eq!(reached, 2);
    assert_eq!(next_frame(&mut anon)["data"]["type"], "rent");
    assert_eq!(next_frame(&mut authed)["event"], "data-updated");
}

/// A connection whose receiver is gone is skipped, not counted.
#[tokio::test]
async fn test_closed_connection_is_skipped() {
    let manager = WsManager::new();
    let rx = manager.add("gone".to_string()).await;
    let mut live = manager.add("live".to_string()).await;
    drop(rx);

    assert_eq!(manager.broadcast("data-updated", &json!({})).await, 1);
    assert!(live.try_recv().is_ok());
}

#[tokio::test]
async fn test_shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();
    let mut rx = manager.add("c1".to_string()).await;
    manager.register(1, "c1").await;

    manager.shutdown_all().await;
    assert!(matches!(rx.try_recv(), Ok(Message::Close(None))));
    assert_eq!(manager.connection_count().await, 0);
    assert_eq!(manager.account_connection_count(1).await, 0);
}

/// Published bus events arrive at clients as `{event, data}` frames.
#[tokio::test]
async fn test_relay_router_forwards_bus_events() {
    let manager = Arc::new(WsManager::new());
    let mut rx = manager.add("c1".to_string()).await;
    let bus = EventBus::default();
    let relay = tokio::spawn(RelayRouter::new(Arc::clone(&manager)).run(bus.subscribe()));

    bus.publish(DomainEvent::data_updated("property", "payment").with_actor(4));
    drop(bus);
    relay.await.unwrap();

    let frame = next_frame(&mut rx);
    assert_eq!(
        frame,
        json!({ "event": "data-updated", "data": { "type": "property", "action": "payment" } })
    );
}
