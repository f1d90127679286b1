//! `/api/ws`: the client side of the notification relay.
//!
//! A socket joins the registry anonymously and receives broadcasts at once.
//! It is addressable by account (force-logout) only after it sends
//! `{"type": "authenticate", "token": "<bearer>"}`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::auth::jwt::validate_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Authenticate { token: String },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_connection(socket, state))
}

async fn serve_connection(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4().to_string();
    let outbound = state.ws_manager.add(conn_id.clone()).await;
    tracing::info!(conn_id = %conn_id, "Relay connection opened");

    let (sink, mut inbound) = socket.split();
    let writer = tokio::spawn(pump_outbound(conn_id.clone(), outbound, sink));

    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let reply = handle_client_message(&state, &conn_id, text.as_str()).await;
                state
                    .ws_manager
                    .send_to(&conn_id, Message::Text(reply.to_string().into()))
                    .await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "Relay connection read failed");
                break;
            }
        }
    }

    state.ws_manager.remove(&conn_id).await;
    writer.abort();
    tracing::info!(conn_id = %conn_id, "Relay connection closed");
}

/// Forward registry messages to the socket until either side closes.
async fn pump_outbound(
    conn_id: String,
    mut outbound: UnboundedReceiver<Message>,
    mut sink: SplitSink<WebSocket, Message>,
) {
    while let Some(message) = outbound.recv().await {
        let is_close = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            tracing::debug!(conn_id = %conn_id, error = %e, "Relay connection write failed");
            return;
        }
        if is_close {
            return;
        }
    }
}

/// Apply one client frame and build the reply frame.
async fn handle_client_message(state: &AppState, conn_id: &str, text: &str) -> Value {
    let token = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Authenticate { token }) => token,
        Err(e) => {
            tracing::debug!(conn_id, error = %e, "Unrecognized relay message");
            return error_frame("Unrecognized message");
        }
    };

    let Ok(claims) = validate_token(&token, &state.config.jwt) else {
        tracing::debug!(conn_id, "Relay authentication rejected");
        return error_frame("Invalid or expired token");
    };

    state.ws_manager.register(claims.sub, conn_id).await;
    tracing::info!(conn_id, user_id = claims.sub, "Relay connection authenticated");
    json!({ "event": "authenticated", "data": { "user_id": claims.sub } })
}

fn error_frame(message: &str) -> Value {
    json!({ "event": "error", "data": { "message": message } })
}
