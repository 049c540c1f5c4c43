use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::debug;

use domain::{ChatId, UserId};

/// Runtime cache mapping chat -> currently-connected member users.
///
/// This is never a source of truth: it is rebuilt from the persisted
/// participant list on every connect, so a stale index self-heals on the
/// next reconnect.
#[derive(Default)]
pub struct ChatMembershipIndex {
    chats: RwLock<HashMap<ChatId, HashSet<UserId>>>,
}

impl ChatMembershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the user to every chat set in `chat_ids`, creating sets as
    /// needed.
    pub async fn subscribe(&self, user_id: UserId, chat_ids: impl IntoIterator<Item = ChatId>) {
        let mut chats = self.chats.write().await;
        let mut count = 0usize;
        for chat_id in chat_ids {
            chats.entry(chat_id).or_default().insert(user_id);
            count += 1;
        }
        debug!(user_id = %user_id, chats = count, "membership subscribed");
    }

    /// Removes the user from every chat set and prunes sets that become
    /// empty, so an idle chat costs no memory.
    pub async fn unsubscribe(&self, user_id: UserId) {
        let mut chats = self.chats.write().await;
        chats.retain(|_, members| {
            members.remove(&user_id);
            !members.is_empty()
        });
        debug!(user_id = %user_id, "membership unsubscribed");
    }

    pub async fn members_of(&self, chat_id: ChatId) -> Vec<UserId> {
        self.chats
            .read()
            .await
            .get(&chat_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) async fn chat_count(&self) -> usize {
        self.chats.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::from(Uuid::new_v4())
    }

    fn chat() -> ChatId {
        ChatId::from(Uuid::new_v4())
    }

    #[tokio::test]
    async fn subscribe_adds_user_to_every_chat() {
        let index = ChatMembershipIndex::new();
        let user_id = user();
        let (a, b) = (chat(), chat());

        index.subscribe(user_id, [a, b]).await;

        assert_eq!(index.members_of(a).await, vec![user_id]);
        assert_eq!(index.members_of(b).await, vec![user_id]);
    }

    #[tokio::test]
    async fn unsubscribe_prunes_empty_sets() {
        let index = ChatMembershipIndex::new();
        let (alice, bob) = (user(), user());
        let (shared, solo) = (chat(), chat());

        index.subscribe(alice, [shared, solo]).await;
        index.subscribe(bob, [shared]).await;
        index.unsubscribe(alice).await;

        assert_eq!(index.members_of(shared).await, vec![bob]);
        assert!(index.members_of(solo).await.is_empty());
        // the solo chat's empty set is gone entirely
        assert_eq!(index.chat_count().await, 1);
    }

    #[tokio::test]
    async fn resubscribe_restores_identical_membership() {
        let index = ChatMembershipIndex::new();
        let user_id = user();
        let chats = [chat(), chat(), chat()];

        index.subscribe(user_id, chats).await;
        index.unsubscribe(user_id).await;
        index.subscribe(user_id, chats).await;

        for chat_id in chats {
            assert_eq!(index.members_of(chat_id).await, vec![user_id]);
        }
    }
}
