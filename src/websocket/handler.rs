//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.
//! Browsers cannot set headers on a WebSocket request, so the session token
//! travels in the query string (`/ws?token=...`).

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::ConnectionHub;
use super::messages::{session_topic, ClientMessage, ServerMessage};
use crate::api::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// WebSocket upgrade handler
///
/// Rejects the upgrade with `401` unless the token belongs to a live session.
/// The connection is joined to the session's topic, so it receives the change
/// notifications of whichever household the session has open.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
) -> Result<Response, ApiError> {
    let session = state.sessions.require(params.token.as_deref()).await?;
    let hub = Arc::clone(&state.ws_hub);
    let topic = session_topic(&session.id);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub, topic)))
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            None
        }
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>, topic: String) {
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending messages to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Register with hub
    let connection_id = match hub.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register WebSocket connection");
            let error_msg = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Some(msg) = encode(&error_msg) {
                let _ = sender.send(msg).await;
            }
            return;
        }
    };

    let topics = match hub
        .join(&connection_id, vec![topic, "system".to_string()])
        .await
    {
        Ok(topics) => topics,
        Err(e) => {
            tracing::error!(connection_id = %connection_id, error = %e, "Failed to join session topic");
            hub.unregister(&connection_id).await;
            return;
        }
    };

    // Send connected message with connection ID
    let connected_msg = ServerMessage::Connected {
        connection_id: connection_id.clone(),
        topics,
    };
    let sent = match encode(&connected_msg) {
        Some(msg) => sender.send(msg).await.is_ok(),
        None => false,
    };
    if !sent {
        tracing::error!(connection_id = %connection_id, "Failed to send connected message");
        hub.unregister(&connection_id).await;
        return;
    }

    let conn_id_for_send = connection_id.clone();

    // Task to forward messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Some(frame) = encode(&msg) else {
                continue;
            };
            if sender.send(frame).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let hub_for_recv = Arc::clone(&hub);
    let conn_id_for_recv = connection_id.clone();

    // Task to receive messages from WebSocket and handle them
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&hub_for_recv, &conn_id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    hub.unregister(&connection_id).await;
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(
    hub: &Arc<ConnectionHub>,
    connection_id: &str,
    message: Message,
) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(hub, connection_id, client_msg).await;
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        "Invalid client message"
                    );
                    // Keep the connection open
                    let error_msg = ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    };
                    let _ = hub.send_to(connection_id, error_msg).await;
                }
            }
            true
        }
        Message::Binary(_) => {
            let error_msg = ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            };
            let _ = hub.send_to(connection_id, error_msg).await;
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

/// Handle a parsed client message
async fn handle_client_message(
    hub: &Arc<ConnectionHub>,
    connection_id: &str,
    message: ClientMessage,
) {
    let response = match message {
        ClientMessage::Subscribe { topics } => hub
            .subscribe(connection_id, topics)
            .await
            .map(|topics| ServerMessage::Subscribed { topics }),
        ClientMessage::Unsubscribe { topics } => hub
            .unsubscribe(connection_id, topics)
            .await
            .map(|topics| ServerMessage::Unsubscribed { topics }),
        ClientMessage::Ping => Ok(ServerMessage::Pong),
    };

    let response = response.unwrap_or_else(|e| {
        tracing::warn!(connection_id = %connection_id, error = %e, "Client request failed");
        ServerMessage::Error {
            message: e.to_string(),
        }
    });
    let _ = hub.send_to(connection_id, response).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::HubConfig;

    #[tokio::test]
    async fn test_ping_and_invalid_message() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        assert!(handle_ws_message(&hub, &id, Message::Text(r#"{"type":"ping"}"#.to_string())).await);
        assert!(matches!(rx.recv().await, Some(ServerMessage::Pong)));

        assert!(handle_ws_message(&hub, &id, Message::Text("nonsense".to_string())).await);
        assert!(matches!(rx.recv().await, Some(ServerMessage::Error { .. })));

        assert!(!handle_ws_message(&hub, &id, Message::Close(None)).await);
    }

    #[tokio::test]
    async fn test_clients_cannot_subscribe_to_other_sessions() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        handle_client_message(
            &hub,
            &id,
            ClientMessage::Subscribe {
                topics: vec![session_topic("someone-else"), "system".to_string()],
            },
        )
        .await;

        match rx.recv().await {
            Some(ServerMessage::Subscribed { topics }) => assert_eq!(topics, vec!["system"]),
            other => panic!("Expected Subscribed, got {:?}", other),
        }
        assert_eq!(hub.subscription_count(&session_topic("someone-else")).await, 0);
    }
}
