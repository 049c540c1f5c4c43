use async_trait::async_trait;
use domain::{
    Chat, ChatId, Message, MessageId, Participant, ReadReceipt, RepositoryError, User, UserId,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Inserts the chat row and its owner participant row as one atomic
    /// unit: either both commit or neither exists afterwards.
    async fn create_with_owner(
        &self,
        chat: Chat,
        owner: Participant,
    ) -> Result<Chat, RepositoryError>;
    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError>;
}

#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    async fn add(&self, participant: Participant) -> Result<Participant, RepositoryError>;
    /// The active membership row for (chat, user), if any.
    async fn find_active(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Option<Participant>, RepositoryError>;
    async fn list_active_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Participant>, RepositoryError>;
    async fn count_active(&self, chat_id: ChatId) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;
    /// One pagination window of a chat's messages, newest first.
    async fn list_page(
        &self,
        chat_id: ChatId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Message>, RepositoryError>;
    async fn last_message(&self, chat_id: ChatId) -> Result<Option<Message>, RepositoryError>;
}

#[async_trait]
pub trait ReadReceiptRepository: Send + Sync {
    async fn add(&self, receipt: ReadReceipt) -> Result<ReadReceipt, RepositoryError>;
    async fn find(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Result<Option<ReadReceipt>, RepositoryError>;
}

/// In-memory gateway used by tests and local tooling.
pub mod memory {
    use std::collections::HashMap;

    use tokio::sync::RwLock;
    use uuid::Uuid;

    use super::*;

    /// One shared store implementing every gateway trait, so the atomic
    /// chat+owner insert can span both collections under a single lock.
    #[derive(Default)]
    pub struct MemoryGateway {
        users: RwLock<HashMap<UserId, User>>,
        chats: RwLock<HashMap<ChatId, Chat>>,
        participants: RwLock<HashMap<Uuid, Participant>>,
        messages: RwLock<HashMap<MessageId, Message>>,
        receipts: RwLock<HashMap<Uuid, ReadReceipt>>,
    }

    impl MemoryGateway {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl UserRepository for MemoryGateway {
        async fn create(&self, user: User) -> Result<User, RepositoryError> {
            let mut users = self.users.write().await;
            if users.values().any(|existing| existing.email == user.email) {
                return Err(RepositoryError::Conflict);
            }
            users.insert(user.id, user.clone());
            Ok(user)
        }

        async fn update(&self, user: User) -> Result<User, RepositoryError> {
            let mut users = self.users.write().await;
            if !users.contains_key(&user.id) {
                return Err(RepositoryError::NotFound);
            }
            users.insert(user.id, user.clone());
            Ok(user)
        }

        async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
            Ok(self.users.read().await.get(&id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
            Ok(self
                .users
                .read()
                .await
                .values()
                .find(|user| user.email == email)
                .cloned())
        }
    }

    #[async_trait]
    impl ChatRepository for MemoryGateway {
        async fn create_with_owner(
            &self,
            chat: Chat,
            owner: Participant,
        ) -> Result<Chat, RepositoryError> {
            // both locks held for the whole insert keeps the unit atomic
            let mut chats = self.chats.write().await;
            let mut participants = self.participants.write().await;
            if chats.contains_key(&chat.id) {
                return Err(RepositoryError::Conflict);
            }
            chats.insert(chat.id, chat.clone());
            participants.insert(owner.id, owner);
            Ok(chat)
        }

        async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
            Ok(self.chats.read().await.get(&id).cloned())
        }
    }

    #[async_trait]
    impl ParticipantRepository for MemoryGateway {
        async fn add(&self, participant: Participant) -> Result<Participant, RepositoryError> {
            self.participants
                .write()
                .await
                .insert(participant.id, participant.clone());
            Ok(participant)
        }

        async fn find_active(
            &self,
            chat_id: ChatId,
            user_id: UserId,
        ) -> Result<Option<Participant>, RepositoryError> {
            Ok(self
                .participants
                .read()
                .await
                .values()
                .find(|p| p.chat_id == chat_id && p.user_id == user_id && p.is_active)
                .cloned())
        }

        async fn list_active_for_user(
            &self,
            user_id: UserId,
        ) -> Result<Vec<Participant>, RepositoryError> {
            Ok(self
                .participants
                .read()
                .await
                .values()
                .filter(|p| p.user_id == user_id && p.is_active)
                .cloned()
                .collect())
        }

        async fn count_active(&self, chat_id: ChatId) -> Result<u64, RepositoryError> {
            Ok(self
                .participants
                .read()
                .await
                .values()
                .filter(|p| p.chat_id == chat_id && p.is_active)
                .count() as u64)
        }
    }

    #[async_trait]
    impl MessageRepository for MemoryGateway {
        async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
            self.messages
                .write()
                .await
                .insert(message.id, message.clone());
            Ok(message)
        }

        async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
            Ok(self.messages.read().await.get(&id).cloned())
        }

        async fn list_page(
            &self,
            chat_id: ChatId,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<Message>, RepositoryError> {
            let mut messages: Vec<Message> = self
                .messages
                .read()
                .await
                .values()
                .filter(|m| m.chat_id == chat_id)
                .cloned()
                .collect();
            messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
            Ok(messages
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn last_message(&self, chat_id: ChatId) -> Result<Option<Message>, RepositoryError> {
            Ok(self
                .messages
                .read()
                .await
                .values()
                .filter(|m| m.chat_id == chat_id)
                .max_by_key(|m| m.sent_at)
                .cloned())
        }
    }

    #[async_trait]
    impl ReadReceiptRepository for MemoryGateway {
        async fn add(&self, receipt: ReadReceipt) -> Result<ReadReceipt, RepositoryError> {
            let mut receipts = self.receipts.write().await;
            if receipts
                .values()
                .any(|r| r.message_id == receipt.message_id && r.user_id == receipt.user_id)
            {
                return Err(RepositoryError::Conflict);
            }
            receipts.insert(receipt.id, receipt.clone());
            Ok(receipt)
        }

        async fn find(
            &self,
            message_id: MessageId,
            user_id: UserId,
        ) -> Result<Option<ReadReceipt>, RepositoryError> {
            Ok(self
                .receipts
                .read()
                .await
                .values()
                .find(|r| r.message_id == message_id && r.user_id == user_id)
                .cloned())
        }
    }

    impl MemoryGateway {
        /// Test helper: number of read receipts held for a message.
        pub async fn receipt_count(&self, message_id: MessageId) -> usize {
            self.receipts
                .read()
                .await
                .values()
                .filter(|r| r.message_id == message_id)
                .count()
        }

        /// Test helper: number of participant rows for a chat, active or not.
        pub async fn participant_rows(&self, chat_id: ChatId) -> usize {
            self.participants
                .read()
                .await
                .values()
                .filter(|p| p.chat_id == chat_id)
                .count()
        }
    }
}
