//! WebSocket support for live status updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use dropconvert_core::StatusSnapshot;

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_SNAPSHOTS_SENT};
use crate::state::AppState;

/// Interval between heartbeats on an idle connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// The converter state changed. Also sent once on connect.
    Status(StatusSnapshot),
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut status_rx = state.orchestrator().subscribe_status();

    // Track connection metrics
    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    // Spawn task to forward status changes to this client
    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        let initial = status_rx.borrow_and_update().clone();
        if send_message(&mut sender, &WsMessage::Status(initial)).await.is_err() {
            return;
        }

        loop {
            let msg = tokio::select! {
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        debug!("Status channel closed");
                        break;
                    }
                    WsMessage::Status(status_rx.borrow_and_update().clone())
                }
                _ = heartbeat.tick() => WsMessage::Heartbeat {
                    timestamp: chrono::Utc::now().timestamp(),
                },
            };

            if send_message(&mut sender, &msg).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Ping(data)) => {
                // Pong is handled automatically by axum
                debug!("Received ping: {:?}", data);
            }
            Ok(Message::Text(text)) => {
                // Drops go through the HTTP API
                debug!("Ignoring text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // Clean up
    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

async fn send_message<S>(sender: &mut S, msg: &WsMessage) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize WsMessage: {}", e);
            return Ok(());
        }
    };

    sender
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())?;
    if matches!(msg, WsMessage::Status(_)) {
        WS_SNAPSHOTS_SENT.inc();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropconvert_core::ConversionStatus;

    #[test]
    fn test_status_message_shape() {
        let msg = WsMessage::Status(StatusSnapshot::default());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["status"], "loading");
        assert_eq!(json["progress_percent"], 0.0);
    }

    #[test]
    fn test_heartbeat_roundtrip() {
        let json = r#"{"type":"heartbeat","timestamp":1700000000}"#;
        let msg: WsMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, WsMessage::Heartbeat { timestamp: 1700000000 }));

        let status = WsMessage::Status(StatusSnapshot {
            status: ConversionStatus::Done,
            ..StatusSnapshot::default()
        });
        let text = serde_json::to_string(&status).unwrap();
        assert!(text.contains("\"status\":\"convert.done\""));
    }
}
