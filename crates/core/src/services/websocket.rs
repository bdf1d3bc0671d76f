//! In-process registry of live WebSocket connections.
//!
//! Each socket task owns the receiving half of an unbounded channel and
//! registers the sending half here under its user id. A send that fails
//! means the socket task has gone away; such handles are pruned after the
//! broadcast.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};

use crate::services::notification::NotificationView;

/// Identifies one registered connection.
pub type ConnectionId = u64;

type Connections = HashMap<i64, HashMap<ConnectionId, mpsc::UnboundedSender<String>>>;

/// Server-to-client realtime message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RealtimeMessage {
    /// A freshly created notification.
    Notification(NotificationView),
    /// The user's current unread count.
    UnreadCount { count: u64 },
    /// Reply to a client ping.
    Pong,
}

/// Process-wide user → connections map.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<Connections>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user.
    pub async fn register(
        &self,
        user_id: i64,
        sender: mpsc::UnboundedSender<String>,
    ) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(id, sender);
        id
    }

    /// Remove a connection. The user's entry goes away with its last connection.
    pub async fn unregister(&self, user_id: i64, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        remove_connection(&mut connections, user_id, id);
    }

    /// Number of live connections registered for a user.
    pub async fn connection_count(&self, user_id: i64) -> usize {
        self.connections
            .read()
            .await
            .get(&user_id)
            .map_or(0, HashMap::len)
    }

    /// Whether the user has any entry at all.
    pub async fn is_connected(&self, user_id: i64) -> bool {
        self.connections.read().await.contains_key(&user_id)
    }

    /// Send a message to every connection of a user.
    ///
    /// Returns the number of connections that accepted the message.
    pub async fn send_to_user(&self, user_id: i64, message: &RealtimeMessage) -> usize {
        let snapshot: Vec<(ConnectionId, mpsc::UnboundedSender<String>)> = {
            let connections = self.connections.read().await;
            match connections.get(&user_id) {
                Some(handles) => handles
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect(),
                None => return 0,
            }
        };

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to serialize realtime message");
                return 0;
            }
        };

        let mut dead = Vec::new();
        for (id, tx) in snapshot.iter() {
            if tx.send(text.clone()).is_err() {
                dead.push(*id);
            }
        }

        if !dead.is_empty() {
            tracing::debug!(user_id, count = dead.len(), "Pruning dead WebSocket connections");
            let mut connections = self.connections.write().await;
            for id in &dead {
                remove_connection(&mut connections, user_id, *id);
            }
        }

        snapshot.len() - dead.len()
    }

    /// Push a notification to the user's live connections.
    pub async fn send_notification(&self, user_id: i64, notification: NotificationView) -> usize {
        self.send_to_user(user_id, &RealtimeMessage::Notification(notification))
            .await
    }

    /// Push the user's unread count to their live connections.
    pub async fn send_unread_count(&self, user_id: i64, count: u64) -> usize {
        self.send_to_user(user_id, &RealtimeMessage::UnreadCount { count })
            .await
    }
}

fn remove_connection(connections: &mut Connections, user_id: i64, id: ConnectionId) {
    if let Some(handles) = connections.get_mut(&user_id) {
        handles.remove(&id);
        if handles.is_empty() {
            connections.remove(&user_id);
        }
    }
}
