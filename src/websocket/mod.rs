//! WebSocket change notifications
//!
//! Pushes "collection changed" events to the browser tabs of a session, so
//! a page can refetch what another tab or another household member changed.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Manages all active connections and subscriptions
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Topics
//!
//! - `session.{id}` - Joined by the server on connect; carries `changed` and
//!   `household_switched` events for the session's active household
//! - `system` - Server-wide notices
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket(`ws://localhost:8090/api/v1/ws?token=${token}`);
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'changed') refetch(msg.collection);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{session_topic, ClientMessage, ServerMessage, WsEvent};
