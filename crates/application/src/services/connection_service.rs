use std::sync::Arc;

use tracing::{info, warn};

use domain::{ChatId, UserId};

use crate::dispatcher::MessageDispatcher;
use crate::error::ApplicationError;
use crate::membership::ChatMembershipIndex;
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;
use crate::repository::ParticipantRepository;
use crate::transport::ClientTransport;

pub struct ConnectionServiceDependencies {
    pub registry: Arc<ConnectionRegistry>,
    pub membership: Arc<ChatMembershipIndex>,
    pub presence: Arc<PresenceTracker>,
    pub dispatcher: Arc<MessageDispatcher>,
    pub participants: Arc<dyn ParticipantRepository>,
}

/// Orchestrates one connection lifecycle: registry entry, membership
/// rebuild from the persisted participant list, presence broadcast.
pub struct ConnectionService {
    deps: ConnectionServiceDependencies,
}

impl ConnectionService {
    pub fn new(deps: ConnectionServiceDependencies) -> Self {
        Self { deps }
    }

    /// Registers the transport and rebuilds the user's membership from the
    /// authoritative participant rows. A second connect for an
    /// already-connected user is a no-op.
    pub async fn connect(
        &self,
        user_id: UserId,
        transport: Arc<dyn ClientTransport>,
    ) -> Result<(), ApplicationError> {
        let now = chrono::Utc::now();
        if !self.deps.registry.add(user_id, transport, now).await {
            return Ok(());
        }

        // a failed rebuild must leave no registry entry behind, otherwise
        // the single-session policy blocks the user from reconnecting
        let participations = match self.deps.participants.list_active_for_user(user_id).await {
            Ok(participations) => participations,
            Err(err) => {
                self.deps.registry.remove(user_id).await;
                return Err(err.into());
            }
        };
        let chat_ids: Vec<ChatId> = participations
            .into_iter()
            .map(|participant| participant.chat_id)
            .collect();
        self.deps.membership.subscribe(user_id, chat_ids).await;
        info!(user_id = %user_id, "user connected");

        self.broadcast_presence(user_id, true).await;
        Ok(())
    }

    /// Evicts the connection, prunes membership, announces offline. Never
    /// fails: every step past the registry removal is best-effort.
    pub async fn disconnect(&self, user_id: UserId) {
        if self.deps.registry.remove(user_id).await.is_none() {
            return;
        }
        self.deps.membership.unsubscribe(user_id).await;
        info!(user_id = %user_id, "user disconnected");

        self.broadcast_presence(user_id, false).await;
    }

    async fn broadcast_presence(&self, user_id: UserId, online: bool) {
        let result = if online {
            self.deps.presence.mark_online(user_id).await
        } else {
            self.deps.presence.mark_offline(user_id).await
        };
        match result {
            Ok(envelope) => {
                self.deps.dispatcher.to_all(&envelope, Some(user_id)).await;
            }
            Err(err) => {
                // presence is best-effort, the connect/disconnect flow
                // completes regardless
                warn!(user_id = %user_id, error = %err, "presence update failed");
            }
        }
    }
}
