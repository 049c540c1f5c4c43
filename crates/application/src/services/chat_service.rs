use std::sync::Arc;

use uuid::Uuid;

use domain::{Chat, ChatId, ChatKind, Participant, ParticipantRole, RepositoryError, UserId};

use crate::clock::Clock;
use crate::dto::{ChatDto, MessageDto};
use crate::error::ApplicationError;
use crate::repository::{
    ChatRepository, MessageRepository, ParticipantRepository, UserRepository,
};

#[derive(Debug, Clone)]
pub struct CreateChatRequest {
    pub name: String,
    pub description: Option<String>,
    pub kind: ChatKind,
    pub creator_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct AddUserRequest {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
}

pub struct ChatServiceDependencies {
    pub chats: Arc<dyn ChatRepository>,
    pub participants: Arc<dyn ParticipantRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub users: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// Creates the chat and its owner membership as one atomic unit; a
    /// failure anywhere yields no chat at all, never a chat without an
    /// owner.
    pub async fn create_chat(
        &self,
        request: CreateChatRequest,
    ) -> Result<ChatDto, ApplicationError> {
        let creator_id = UserId::from(request.creator_id);
        let now = self.deps.clock.now();
        let chat = Chat::new(
            ChatId::generate(),
            request.name,
            request.description,
            request.kind,
            creator_id,
            now,
        )?;
        let owner = Participant::new(chat.id, creator_id, ParticipantRole::Owner, now);

        let chat = self.deps.chats.create_with_owner(chat, owner).await?;
        self.compose(chat).await
    }

    /// Idempotent with respect to an existing active membership; a conflict
    /// on the insert means a concurrent add won the race, same outcome.
    pub async fn add_user(&self, request: AddUserRequest) -> Result<(), ApplicationError> {
        let chat_id = ChatId::from(request.chat_id);
        let user_id = UserId::from(request.user_id);

        self.deps
            .chats
            .find_by_id(chat_id)
            .await?
            .ok_or(ApplicationError::ChatNotFound)?;

        if self
            .deps
            .participants
            .find_active(chat_id, user_id)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let participant = Participant::new(chat_id, user_id, request.role, self.deps.clock.now());
        match self.deps.participants.add(participant).await {
            Ok(_) | Err(RepositoryError::Conflict) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_chat(&self, chat_id: Uuid) -> Result<ChatDto, ApplicationError> {
        let chat = self
            .deps
            .chats
            .find_by_id(ChatId::from(chat_id))
            .await?
            .ok_or(ApplicationError::ChatNotFound)?;
        self.compose(chat).await
    }

    /// All chats the user actively participates in, ordered by most recent
    /// activity descending.
    pub async fn user_chats(&self, user_id: Uuid) -> Result<Vec<ChatDto>, ApplicationError> {
        let participations = self
            .deps
            .participants
            .list_active_for_user(UserId::from(user_id))
            .await?;

        let mut chats = Vec::with_capacity(participations.len());
        for participation in participations {
            if let Some(chat) = self.deps.chats.find_by_id(participation.chat_id).await? {
                chats.push(self.compose(chat).await?);
            }
        }
        chats.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
        Ok(chats)
    }

    /// Pure read composition: creator lookup, active participant count,
    /// last message with its sender. No mutation.
    async fn compose(&self, chat: Chat) -> Result<ChatDto, ApplicationError> {
        let creator = self.deps.users.find_by_id(chat.created_by).await?;
        let participant_count = self.deps.participants.count_active(chat.id).await?;

        let last_message = match self.deps.messages.last_message(chat.id).await? {
            Some(message) => self
                .deps
                .users
                .find_by_id(message.sender_id)
                .await?
                .map(|sender| MessageDto::from_message(&message, &sender)),
            None => None,
        };

        Ok(ChatDto {
            id: Uuid::from(chat.id),
            name: chat.name,
            description: chat.description,
            kind: chat.kind,
            created_by: Uuid::from(chat.created_by),
            created_by_username: creator
                .map(|user| user.username)
                .unwrap_or_else(|| "unknown".to_owned()),
            created_at: chat.created_at,
            updated_at: chat.updated_at,
            participant_count,
            last_message,
        })
    }
}
