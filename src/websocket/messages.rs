//! WebSocket Message Types
//!
//! Defines all message types exchanged between clients and the Meal Hat
//! server over `/ws`.

use crate::planner::Collection;
use serde::{Deserialize, Serialize};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to extra topics (currently only `system`)
    Subscribe {
        topics: Vec<String>,
    },
    /// Unsubscribe from topics
    Unsubscribe {
        topics: Vec<String>,
    },
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A collection of the active household changed; refetch it
    Changed {
        /// Household key the change belongs to
        household: String,
        collection: Collection,
    },
    /// The session switched to another household
    HouseholdSwitched {
        household: String,
    },
    /// Subscription confirmed
    Subscribed {
        topics: Vec<String>,
    },
    /// Unsubscription confirmed
    Unsubscribed {
        topics: Vec<String>,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        message: String,
    },
    /// Server-wide notice (e.g. shutting down)
    System {
        message: String,
    },
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
        /// Topics the connection was subscribed to on connect
        topics: Vec<String>,
    },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to (e.g., `session.<id>`)
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

/// Topic carrying the events of one session's workspace
pub fn session_topic(session_id: &str) -> String {
    format!("session.{}", session_id)
}

impl WsEvent {
    /// A collection of `household` changed, for the sockets of `session_id`
    pub fn changed(session_id: &str, household: &str, collection: Collection) -> Self {
        Self {
            topic: session_topic(session_id),
            message: ServerMessage::Changed {
                household: household.to_string(),
                collection,
            },
        }
    }

    /// The session now works on `household`
    pub fn switched(session_id: &str, household: &str) -> Self {
        Self {
            topic: session_topic(session_id),
            message: ServerMessage::HouseholdSwitched {
                household: household.to_string(),
            },
        }
    }

    /// Create a system event
    pub fn system(message: &str) -> Self {
        Self {
            topic: "system".to_string(),
            message: ServerMessage::System {
                message: message.to_string(),
            },
        }
    }
}
