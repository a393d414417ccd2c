//! WebSocket Real-Time Streaming
//!
//! Pushes dashboard updates (re-rendered lists, recipient selectors, upload
//! progress) to signed-in administrators via WebSocket.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Manages all active connections and subscriptions
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/ws` and can subscribe to topics:
//! - `views.*` - Every live list
//! - `views.{name}` - One list (`investors`, `messages`, `documents`)
//! - `recipients` - Rebuilt recipient selectors
//! - `uploads` - Document upload progress
//! - `system` - System events
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8090/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', topics: ['views.*', 'uploads']}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   console.log('Received:', msg);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage, WsEvent};
