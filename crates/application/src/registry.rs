use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use domain::{ConnectionId, Timestamp, UserId};

use crate::transport::ClientTransport;

/// One live transport connection. Owned exclusively by the registry and
/// destroyed on disconnect or on a failed send.
#[derive(Clone)]
pub struct Connection {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    pub transport: Arc<dyn ClientTransport>,
    pub connected_at: Timestamp,
}

/// Tracks exactly one live connection per user.
///
/// All operations go through a single lock over the map, so add and remove
/// for the same user are linearizable with respect to each other.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the transport unless the user already has a live
    /// connection. Returns whether the connection was registered; a second
    /// connect for an already-connected user is a no-op
    /// (single-session-per-user policy).
    pub async fn add(
        &self,
        user_id: UserId,
        transport: Arc<dyn ClientTransport>,
        connected_at: Timestamp,
    ) -> bool {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&user_id) {
            debug!(user_id = %user_id, "duplicate connect ignored");
            return false;
        }

        let connection = Connection {
            user_id,
            connection_id: ConnectionId::generate(),
            transport,
            connected_at,
        };
        info!(
            user_id = %user_id,
            connection_id = %connection.connection_id,
            "connection registered"
        );
        connections.insert(user_id, connection);
        true
    }

    /// Evicts the user's connection and closes its transport. Close failure
    /// is logged, never propagated.
    pub async fn remove(&self, user_id: UserId) -> Option<Connection> {
        let connection = self.connections.write().await.remove(&user_id)?;
        if let Err(err) = connection.transport.close().await {
            warn!(user_id = %user_id, error = %err, "transport close failed");
        }
        info!(
            user_id = %user_id,
            connection_id = %connection.connection_id,
            "connection removed"
        );
        Some(connection)
    }

    pub async fn is_online(&self, user_id: UserId) -> bool {
        self.connections.read().await.contains_key(&user_id)
    }

    pub async fn online_users(&self) -> Vec<UserId> {
        self.connections.read().await.keys().copied().collect()
    }

    pub async fn transport(&self, user_id: UserId) -> Option<Arc<dyn ClientTransport>> {
        self.connections
            .read()
            .await
            .get(&user_id)
            .map(|connection| Arc::clone(&connection.transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::RecordingTransport;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::from(Uuid::new_v4())
    }

    #[tokio::test]
    async fn add_then_remove_round_trips() {
        let registry = ConnectionRegistry::new();
        let user_id = user();
        let transport = Arc::new(RecordingTransport::new());

        assert!(registry.add(user_id, transport.clone(), chrono::Utc::now()).await);
        assert!(registry.is_online(user_id).await);
        assert_eq!(registry.online_users().await, vec![user_id]);

        let removed = registry.remove(user_id).await;
        assert!(removed.is_some());
        assert!(!registry.is_online(user_id).await);
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn second_connect_is_a_no_op() {
        let registry = ConnectionRegistry::new();
        let user_id = user();
        let first = Arc::new(RecordingTransport::new());
        let second = Arc::new(RecordingTransport::new());

        assert!(registry.add(user_id, first.clone(), chrono::Utc::now()).await);
        assert!(!registry.add(user_id, second, chrono::Utc::now()).await);

        // the original transport is still the live one
        let live = registry.transport(user_id).await.unwrap();
        live.send(b"ping").await.unwrap();
        assert_eq!(first.sent_count(), 1);
    }

    #[tokio::test]
    async fn remove_unknown_user_is_none() {
        let registry = ConnectionRegistry::new();
        assert!(registry.remove(user()).await.is_none());
    }
}
