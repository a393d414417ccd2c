//! WebSocket Connection Hub
//!
//! Manages all WebSocket connections, subscriptions, and message broadcasting.
//! Events are published synchronously into a tokio broadcast channel and
//! fanned out by a single dispatcher task, so subscribers see them in
//! publish order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::messages::{ServerMessage, WsEvent};
use crate::portal::{DashboardEvents, RecipientSelector, UploadState};

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Concrete topics a client may subscribe to
const TOPICS: [&str; 6] = [
    "views.investors",
    "views.messages",
    "views.documents",
    "recipients",
    "uploads",
    "system",
];

/// Manages all WebSocket connections and subscriptions
pub struct ConnectionHub {
    /// Active connections: ConnectionId → ConnectionHandle
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Topic subscriptions: Topic → Set of ConnectionIds
    subscriptions: RwLock<HashMap<String, HashSet<ConnectionId>>>,
    /// Ordered event queue drained by the dispatcher
    broadcast_tx: broadcast::Sender<WsEvent>,
    /// Configuration
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
    /// Channel sender for this connection
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    /// Topics this connection is subscribed to
    pub subscriptions: HashSet<String>,
}

impl ConnectionHub {
    /// Create a new connection hub
    pub fn new(config: HubConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_capacity);

        Self {
            connections: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            broadcast_tx,
            config,
        }
    }

    /// Spawn the task that delivers published events to subscribers
    pub fn start_dispatcher(self: &Arc<Self>) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        let mut rx = self.broadcast_tx.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => hub.broadcast(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped = skipped, "WebSocket dispatcher lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
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
        let handle = ConnectionHandle {
            sender,
            subscriptions: HashSet::new(),
        };
        connections.insert(id.clone(), handle);

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

    /// Subscribe a connection to topics
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut subscribed = Vec::new();

        for topic in topics {
            if !is_valid_topic(&topic) {
                tracing::warn!(topic = %topic, "Invalid topic ignored");
                continue;
            }

            handle.subscriptions.insert(topic.clone());
            subs.entry(topic.clone())
                .or_default()
                .insert(id.to_string());
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
    pub async fn unsubscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
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

    /// Deliver an event to every subscriber of its topic
    pub async fn broadcast(&self, event: &WsEvent) {
        let subs = self.subscriptions.read().await;
        let connections = self.connections.read().await;

        let direct = subs.get(&event.topic).cloned().unwrap_or_default();

        // "views.*" matches "views.documents"
        let wildcard = event
            .topic
            .split_once('.')
            .map(|(prefix, _)| format!("{}.*", prefix))
            .and_then(|t| subs.get(&t).cloned())
            .unwrap_or_default();

        let mut sent_count = 0;
        for id in direct.union(&wildcard) {
            if let Some(handle) = connections.get(id) {
                if handle.sender.send(event.message.clone()).is_ok() {
                    sent_count += 1;
                }
            }
        }

        if sent_count > 0 {
            tracing::trace!(
                topic = %event.topic,
                subscribers = sent_count,
                "Broadcast event"
            );
        }
    }

    /// Queue an event for delivery
    ///
    /// Dropped silently when no dispatcher is running.
    pub fn publish(&self, event: WsEvent) {
        let _ = self.broadcast_tx.send(event);
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

    /// Get a receiver for the event queue
    pub fn subscribe_broadcast(&self) -> broadcast::Receiver<WsEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Get the current connection count
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Get subscription count for a topic
    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(topic)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

/// Known topic, or a `prefix.*` wildcard over known topics
fn is_valid_topic(topic: &str) -> bool {
    if let Some(prefix) = topic.strip_suffix(".*") {
        return TOPICS
            .iter()
            .any(|t| t.split_once('.').map(|(p, _)| p) == Some(prefix));
    }
    TOPICS.contains(&topic)
}

impl DashboardEvents for ConnectionHub {
    fn view_rendered(&self, view: &str, count: usize, markup: &str) {
        self.publish(WsEvent::view_rendered(view, count, markup));
    }

    fn recipients_changed(&self, selector: &RecipientSelector) {
        self.publish(WsEvent::recipients_changed(selector));
    }

    fn upload_progress(&self, state: &UploadState) {
        self.publish(WsEvent::upload_progress(state));
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
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.broadcast_capacity, 1024);
    }

    #[test]
    fn test_valid_topics() {
        assert!(is_valid_topic("views.investors"));
        assert!(is_valid_topic("views.*"));
        assert!(is_valid_topic("recipients"));
        assert!(is_valid_topic("uploads"));
        assert!(is_valid_topic("system"));

        assert!(!is_valid_topic("views.admins"));
        assert!(!is_valid_topic("accounts.*"));
        assert!(!is_valid_topic(""));
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
    async fn test_subscribe_unsubscribe() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        let subscribed = hub
            .subscribe(&id, vec!["uploads".to_string(), "bogus".to_string()])
            .await
            .unwrap();
        assert_eq!(subscribed, vec!["uploads"]);
        assert_eq!(hub.subscription_count("uploads").await, 1);

        let unsubscribed = hub
            .unsubscribe(&id, vec!["uploads".to_string()])
            .await
            .unwrap();
        assert_eq!(unsubscribed, vec!["uploads"]);
        assert_eq!(hub.subscription_count("uploads").await, 0);

        hub.unregister(&id).await;
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let config = HubConfig {
            max_connections: 2,
            broadcast_capacity: 16,
        };
        let hub = ConnectionHub::new(config);

        let (tx1, _) = mpsc::unbounded_channel();
        let (tx2, _) = mpsc::unbounded_channel();
        let (tx3, _) = mpsc::unbounded_channel();

        hub.register(tx1).await.unwrap();
        hub.register(tx2).await.unwrap();
        let result = hub.register(tx3).await;
        assert!(matches!(result, Err(HubError::TooManyConnections(2))));
    }

    #[tokio::test]
    async fn test_broadcast_to_subscribers() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id1 = hub.register(tx1).await.unwrap();
        hub.register(tx2).await.unwrap();

        hub.subscribe(&id1, vec!["views.documents".to_string()])
            .await
            .unwrap();

        hub.broadcast(&WsEvent::view_rendered("documents", 0, "<p></p>"))
            .await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wildcard_subscription() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        hub.subscribe(&id, vec!["views.*".to_string()]).await.unwrap();
        hub.broadcast(&WsEvent::view_rendered("investors", 1, "<div></div>"))
            .await;

        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_dispatcher_preserves_publish_order() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let dispatcher = hub.start_dispatcher();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();
        hub.subscribe(&id, vec!["uploads".to_string()]).await.unwrap();

        for percent in [0.0, 25.0, 50.0, 100.0] {
            hub.upload_progress(&UploadState::Uploading { percent });
        }

        let mut seen = Vec::new();
        while seen.len() < 4 {
            let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            if let ServerMessage::UploadProgress {
                state: UploadState::Uploading { percent },
            } = msg
            {
                seen.push(percent);
            }
        }
        assert_eq!(seen, vec![0.0, 25.0, 50.0, 100.0]);
        dispatcher.abort();
    }
}
