use std::sync::Arc;

use domain::UserId;

use crate::clock::Clock;
use crate::envelope::Envelope;
use crate::error::ApplicationError;
use crate::repository::UserRepository;

/// Derives online/offline state transitions and persists them on the user
/// record.
///
/// Returns the `USER_STATUS_CHANGE` envelope for the caller to broadcast;
/// presence is best-effort, so callers log a persistence failure and carry
/// on with the connect/disconnect flow.
pub struct PresenceTracker {
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl PresenceTracker {
    pub fn new(users: Arc<dyn UserRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    pub async fn mark_online(&self, user_id: UserId) -> Result<Envelope, ApplicationError> {
        self.transition(user_id, true).await
    }

    pub async fn mark_offline(&self, user_id: UserId) -> Result<Envelope, ApplicationError> {
        self.transition(user_id, false).await
    }

    async fn transition(
        &self,
        user_id: UserId,
        online: bool,
    ) -> Result<Envelope, ApplicationError> {
        let now = self.clock.now();
        if let Some(mut user) = self.users.find_by_id(user_id).await? {
            user.set_online(online, now);
            self.users.update(user).await?;
        }
        Ok(Envelope::status_change(user_id, online, now))
    }
}
