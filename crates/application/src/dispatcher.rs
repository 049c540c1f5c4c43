use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use domain::{ChatId, UserId};

use crate::envelope::Envelope;
use crate::membership::ChatMembershipIndex;
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;

/// Best-effort push of envelopes to live connections.
///
/// Delivery is at-most-once: no queue, no buffering, no redelivery on
/// reconnect. A client that is offline at dispatch time recovers missed
/// events through the paged read path, not the push channel.
pub struct MessageDispatcher {
    registry: Arc<ConnectionRegistry>,
    membership: Arc<ChatMembershipIndex>,
    presence: Arc<PresenceTracker>,
}

impl MessageDispatcher {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        membership: Arc<ChatMembershipIndex>,
        presence: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            registry,
            membership,
            presence,
        }
    }

    /// Sends to the user iff a live connection exists. A transport-level
    /// failure is treated as an implicit disconnect of that recipient and
    /// reported as not-delivered; it is never retried and never surfaced to
    /// the operation that triggered the push.
    pub async fn to_user(&self, user_id: UserId, envelope: &Envelope) -> bool {
        let Some(transport) = self.registry.transport(user_id).await else {
            return false;
        };
        let payload = match serde_json::to_vec(envelope) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "envelope serialization failed");
                return false;
            }
        };

        match transport.send(&payload).await {
            Ok(()) => true,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "send failed, dropping connection");
                self.drop_recipient(user_id).await;
                false
            }
        }
    }

    /// Fans the envelope out to every currently-connected member of the
    /// chat except `exclude`. Sends run in parallel and a failure on one
    /// recipient never blocks the rest. Returns the delivered count.
    pub async fn to_chat(
        &self,
        chat_id: ChatId,
        envelope: &Envelope,
        exclude: Option<UserId>,
    ) -> usize {
        let recipients = self.membership.members_of(chat_id).await;
        let delivered = self.fan_out(recipients, envelope, exclude).await;
        debug!(chat_id = %chat_id, delivered, "chat fan-out complete");
        delivered
    }

    /// Same semantics as [`to_chat`](Self::to_chat), over every connected
    /// user.
    pub async fn to_all(&self, envelope: &Envelope, exclude: Option<UserId>) -> usize {
        let recipients = self.registry.online_users().await;
        self.fan_out(recipients, envelope, exclude).await
    }

    async fn fan_out(
        &self,
        recipients: Vec<UserId>,
        envelope: &Envelope,
        exclude: Option<UserId>,
    ) -> usize {
        let sends = recipients
            .into_iter()
            .filter(|user_id| Some(*user_id) != exclude)
            .map(|user_id| self.to_user(user_id, envelope));
        join_all(sends)
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count()
    }

    /// The implicit-disconnect path for a recipient whose transport failed:
    /// evict the connection, prune membership, persist offline and announce
    /// the status change to everyone else. The announcement itself uses raw
    /// sends so a second failure cannot cascade.
    async fn drop_recipient(&self, user_id: UserId) {
        self.registry.remove(user_id).await;
        self.membership.unsubscribe(user_id).await;
        match self.presence.mark_offline(user_id).await {
            Ok(status) => {
                let payload = match serde_json::to_vec(&status) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(error = %err, "status envelope serialization failed");
                        return;
                    }
                };
                let peers = self.registry.online_users().await;
                let sends = peers.into_iter().map(|peer| {
                    let payload = &payload;
                    async move {
                        if let Some(transport) = self.registry.transport(peer).await {
                            if let Err(err) = transport.send(payload).await {
                                warn!(user_id = %peer, error = %err, "status push failed");
                            }
                        }
                    }
                });
                join_all(sends).await;
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "presence update failed on drop");
            }
        }
    }
}
