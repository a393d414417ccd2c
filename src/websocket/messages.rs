//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! open dashboards and the portal server.

use serde::{Deserialize, Serialize};

use crate::portal::render::render_selector_options;
use crate::portal::{RecipientSelector, UploadState};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics for real-time updates
    Subscribe {
        /// List of topics to subscribe to (e.g., "views.investors", "views.*")
        topics: Vec<String>,
    },
    /// Unsubscribe from topics
    Unsubscribe {
        /// List of topics to unsubscribe from
        topics: Vec<String>,
    },
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A live view re-rendered
    ViewRendered {
        /// View name ("investors", "messages" or "documents")
        view: String,
        /// Number of items in the view's mirror
        count: usize,
        /// Full list markup
        markup: String,
    },
    /// A recipient selector was rebuilt
    RecipientsChanged {
        /// Element id of the selector
        selector: String,
        /// Value selected after the rebuild
        selected: String,
        /// `<option>` markup
        options_markup: String,
    },
    /// Document upload state changed
    UploadProgress { state: UploadState },
    /// Server notice
    System { message: String },
    /// Subscription confirmed
    Subscribed {
        /// Topics successfully subscribed to
        topics: Vec<String>,
    },
    /// Unsubscription confirmed
    Unsubscribed {
        /// Topics successfully unsubscribed from
        topics: Vec<String>,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        /// Error description
        message: String,
    },
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
    },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to (e.g., "views.documents")
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

impl WsEvent {
    pub fn view_rendered(view: &str, count: usize, markup: &str) -> Self {
        Self {
            topic: format!("views.{}", view),
            message: ServerMessage::ViewRendered {
                view: view.to_string(),
                count,
                markup: markup.to_string(),
            },
        }
    }

    pub fn recipients_changed(selector: &RecipientSelector) -> Self {
        Self {
            topic: "recipients".to_string(),
            message: ServerMessage::RecipientsChanged {
                selector: selector.id.clone(),
                selected: selector.selected.clone(),
                options_markup: render_selector_options(selector),
            },
        }
    }

    pub fn upload_progress(state: &UploadState) -> Self {
        Self {
            topic: "uploads".to_string(),
            message: ServerMessage::UploadProgress {
                state: state.clone(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize_subscribe() {
        let json = r#"{"type": "subscribe", "topics": ["views.investors", "recipients"]}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe { topics } => {
                assert_eq!(topics.len(), 2);
                assert_eq!(topics[0], "views.investors");
            }
            _ => panic!("Expected Subscribe"),
        }
    }

    #[test]
    fn test_client_message_deserialize_ping() {
        let json = r#"{"type": "ping"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_view_rendered_event() {
        let event = WsEvent::view_rendered("documents", 2, "<div></div>");
        assert_eq!(event.topic, "views.documents");
        let json = serde_json::to_string(&event.message).unwrap();
        assert!(json.contains("\"type\":\"view_rendered\""));
        assert!(json.contains("\"count\":2"));
    }

    #[test]
    fn test_upload_progress_serialize() {
        let event = WsEvent::upload_progress(&UploadState::Uploading { percent: 42.5 });
        let json = serde_json::to_string(&event.message).unwrap();
        assert!(json.contains("\"type\":\"upload_progress\""));
        assert!(json.contains("\"state\":{\"state\":\"uploading\",\"percent\":42.5}"));
    }

    #[test]
    fn test_recipients_changed_carries_options() {
        let selector = RecipientSelector::new("messageRecipient");
        let event = WsEvent::recipients_changed(&selector);
        assert_eq!(event.topic, "recipients");
        match event.message {
            ServerMessage::RecipientsChanged {
                selector,
                options_markup,
                ..
            } => {
                assert_eq!(selector, "messageRecipient");
                assert!(options_markup.contains("All Investors"));
            }
            _ => panic!("Expected RecipientsChanged"),
        }
    }

    #[test]
    fn test_server_message_serialize_connected() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connection_id\":\"abc-123\""));
    }
}
