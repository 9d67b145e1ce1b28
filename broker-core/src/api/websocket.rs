//! WebSocket upgrade and per-connection pump.
//!
//! A connection joins the push layer via `PushLayer::connect`, which hands
//! back nothing more than a sender end of an `mpsc` channel tied to its
//! `ConnectionId` — delivery after that point is entirely push-layer owned
//! (batching, priority, backpressure). This handler's only job is to pump
//! `WireEnvelope`s out to the socket and client control messages in.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::domain::{IntentId, ProviderId};
use crate::push::RoomId;

use super::AppState;

/// Query params accepted on the initial `/ws` upgrade, controlling which
/// rooms the connection joins immediately instead of waiting for a
/// `subscribe` control message.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "providerId")]
    pub provider_id: Option<ProviderId>,
    #[serde(default, rename = "intentId")]
    pub intent_id: Option<IntentId>,
    #[serde(default)]
    pub capability: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlMessage {
    Subscribe { room: String },
    Unsubscribe { room: String },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn handle_socket(socket: WebSocket, state: AppState, params: ConnectParams) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel(256);

    let is_provider = params.role.as_deref() == Some("provider") || params.provider_id.is_some();
    let conn_id = state.push.connect(is_provider, params.provider_id, tx);

    if is_provider {
        state.push.join(conn_id, RoomId::Providers);
    }
    if params.role.as_deref() == Some("dashboard") {
        state.push.join(conn_id, RoomId::Dashboard);
    }
    if let Some(cap) = params.capability {
        state.push.join(conn_id, RoomId::Capability(cap));
    }
    if let Some(intent_id) = params.intent_id {
        state.push.join(conn_id, RoomId::Intent(intent_id));
        if let Ok(intent) = state.engine.get_intent(intent_id).await {
            let bids = state.engine.get_bids_for_intent(intent_id).await.unwrap_or_default();
            state.push.send_snapshot(conn_id, &intent, &bids);
        }
    }

    let mut forward_task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let text = match serde_json::to_string(&envelope) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize outbound push envelope");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut forward_task => break,
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => handle_control_message(&state, conn_id, &text),
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::debug!(connection = %conn_id, error = %err, "websocket read error");
                        state.push.mark_unhealthy(conn_id);
                        break;
                    }
                }
            }
        }
    }

    forward_task.abort();
    state.push.disconnect(conn_id);
}

fn handle_control_message(state: &AppState, conn_id: crate::push::ConnectionId, text: &str) {
    let message: ControlMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            tracing::debug!(connection = %conn_id, error = %err, raw = %text, "ignoring malformed control message");
            return;
        }
    };
    match message {
        ControlMessage::Subscribe { room } => match RoomId::parse(&room) {
            Ok(room) => state.push.join(conn_id, room),
            Err(err) => tracing::debug!(connection = %conn_id, error = %err, "rejected subscribe to unknown room"),
        },
        ControlMessage::Unsubscribe { room } => match RoomId::parse(&room) {
            Ok(room) => state.push.leave(conn_id, &room),
            Err(err) => tracing::debug!(connection = %conn_id, error = %err, "rejected unsubscribe from unknown room"),
        },
    }
}
