//! WebSocket Connection Hub
//!
//! Manages all WebSocket connections, subscriptions, and message broadcasting.
//! Every connection belongs to a session and is joined to that session's
//! topic on connect; clients may additionally subscribe to `system`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use super::messages::{ServerMessage, WsEvent};

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

type Connections = Arc<RwLock<HashMap<ConnectionId, ConnectionHandle>>>;
type Subscriptions = Arc<RwLock<HashMap<String, HashSet<ConnectionId>>>>;

/// Manages all WebSocket connections and subscriptions
pub struct ConnectionHub {
    /// Active connections: ConnectionId → ConnectionHandle
    connections: Connections,
    /// Topic subscriptions: Topic → Set of ConnectionIds
    subscriptions: Subscriptions,
    /// Broadcast channel for events (used internally)
    broadcast_tx: broadcast::Sender<WsEvent>,
    config: HubConfig,
}

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Capacity of the broadcast channel
    pub broadcast_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            broadcast_capacity: 1024,
        }
    }
}

/// Handle for sending messages to a specific connection
pub struct ConnectionHandle {
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    pub subscriptions: HashSet<String>,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_capacity);

        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            broadcast_tx,
            config,
        }
    }

    /// Register a new WebSocket connection
    ///
    /// Returns the connection ID on success, or an error if the connection
    /// limit has been reached.
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                subscriptions: HashSet::new(),
            },
        );

        tracing::info!(connection_id = %id, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection and clean up its subscriptions
    pub async fn unregister(&self, id: &str) {
        let handle = self.connections.write().await.remove(id);

        if let Some(handle) = handle {
            let mut subs = self.subscriptions.write().await;
            for topic in handle.subscriptions {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
            }
        }

        tracing::info!(connection_id = %id, "WebSocket disconnected");
    }

    /// Subscribe a connection to client-requested topics
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let topics: Vec<String> = topics
            .into_iter()
            .filter(|topic| {
                let valid = Self::is_valid_topic(topic);
                if !valid {
                    tracing::warn!(topic = %topic, "Invalid topic ignored");
                }
                valid
            })
            .collect();

        self.join(id, topics).await
    }

    /// Subscribe a connection to topics chosen by the server (no validation)
    pub async fn join(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut subscribed = Vec::new();

        for topic in topics {
            handle.subscriptions.insert(topic.clone());
            subs.entry(topic.clone()).or_default().insert(id.to_string());
            subscribed.push(topic);
        }

        tracing::debug!(
            connection_id = %id,
            topics = ?subscribed,
            "Subscribed to topics"
        );

        Ok(subscribed)
    }

    /// Unsubscribe a connection from topics
    pub async fn unsubscribe(
        &self,
        id: &str,
        topics: Vec<String>,
    ) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut unsubscribed = Vec::new();

        for topic in topics {
            if handle.subscriptions.remove(&topic) {
                unsubscribed.push(topic.clone());

                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
            }
        }

        tracing::debug!(
            connection_id = %id,
            topics = ?unsubscribed,
            "Unsubscribed from topics"
        );

        Ok(unsubscribed)
    }

    /// Deliver an event to all subscribers of its topic
    pub async fn broadcast(&self, event: &WsEvent) -> usize {
        self.clone_for_broadcast().broadcast(event).await
    }

    /// Publish an event without waiting for delivery
    pub fn publish(&self, event: WsEvent) {
        let _ = self.broadcast_tx.send(event.clone());

        let hub = self.clone_for_broadcast();
        tokio::spawn(async move {
            hub.broadcast(&event).await;
        });
    }

    /// Send a message directly to a specific connection
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;

        handle
            .sender
            .send(message)
            .map_err(|_| HubError::SendFailed)
    }

    /// Get a receiver for every published event
    pub fn subscribe_broadcast(&self) -> broadcast::Receiver<WsEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Topics a client may subscribe to by itself
    fn is_valid_topic(topic: &str) -> bool {
        topic == "system"
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(topic)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    fn clone_for_broadcast(&self) -> ConnectionHubRef {
        ConnectionHubRef {
            connections: Arc::clone(&self.connections),
            subscriptions: Arc::clone(&self.subscriptions),
        }
    }
}

/// Reference to hub internals for async broadcast
struct ConnectionHubRef {
    connections: Connections,
    subscriptions: Subscriptions,
}

impl ConnectionHubRef {
    async fn broadcast(&self, event: &WsEvent) -> usize {
        let subs = self.subscriptions.read().await;
        let connections = self.connections.read().await;

        let Some(subscriber_ids) = subs.get(&event.topic) else {
            return 0;
        };

        let mut sent = 0;
        for id in subscriber_ids {
            if let Some(handle) = connections.get(id) {
                if handle.sender.send(event.message.clone()).is_ok() {
                    sent += 1;
                }
            }
        }

        if sent > 0 {
            tracing::trace!(topic = %event.topic, subscribers = sent, "Broadcast event");
        }
        sent
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::Collection;
    use crate::websocket::messages::session_topic;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.broadcast_capacity, 1024);
    }

    #[test]
    fn test_valid_topics() {
        assert!(ConnectionHub::is_valid_topic("system"));
        assert!(!ConnectionHub::is_valid_topic("session.abc"));
        assert!(!ConnectionHub::is_valid_topic(""));
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register(tx).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_client_cannot_subscribe_to_session_topics() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        let subscribed = hub
            .subscribe(&id, vec!["system".to_string(), session_topic("other")])
            .await
            .unwrap();
        assert_eq!(subscribed, vec!["system"]);
        assert_eq!(hub.subscription_count(&session_topic("other")).await, 0);

        let unsubscribed = hub.unsubscribe(&id, vec!["system".to_string()]).await.unwrap();
        assert_eq!(unsubscribed, vec!["system"]);
        assert_eq!(hub.subscription_count("system").await, 0);

        hub.unregister(&id).await;
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let hub = ConnectionHub::new(HubConfig {
            max_connections: 2,
            broadcast_capacity: 16,
        });

        let (tx1, _) = mpsc::unbounded_channel();
        let (tx2, _) = mpsc::unbounded_channel();
        let (tx3, _) = mpsc::unbounded_channel();

        hub.register(tx1).await.unwrap();
        hub.register(tx2).await.unwrap();
        let result = hub.register(tx3).await;

        assert!(matches!(result, Err(HubError::TooManyConnections(2))));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_only_the_session() {
        let hub = ConnectionHub::new(HubConfig::default());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id1 = hub.register(tx1).await.unwrap();
        let id2 = hub.register(tx2).await.unwrap();

        hub.join(&id1, vec![session_topic("s1")]).await.unwrap();
        hub.join(&id2, vec![session_topic("s2")]).await.unwrap();

        let sent = hub
            .broadcast(&WsEvent::changed("s1", "home", Collection::Meals))
            .await;
        assert_eq!(sent, 1);

        assert!(matches!(rx1.try_recv(), Ok(ServerMessage::Changed { .. })));
        assert!(rx2.try_recv().is_err());

        hub.unregister(&id1).await;
        assert_eq!(hub.subscription_count(&session_topic("s1")).await, 0);
    }
}
