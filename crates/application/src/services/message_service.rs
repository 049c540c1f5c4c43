use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use domain::{ChatId, Message, MessageId, MessageKind, ReadReceipt, RepositoryError, UserId};

use crate::clock::Clock;
use crate::dispatcher::MessageDispatcher;
use crate::dto::MessageDto;
use crate::envelope::Envelope;
use crate::error::ApplicationError;
use crate::repository::{
    MessageRepository, ParticipantRepository, ReadReceiptRepository, UserRepository,
};

#[derive(Debug, Clone)]
pub struct CreateMessageRequest {
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
}

pub struct MessageServiceDependencies {
    pub messages: Arc<dyn MessageRepository>,
    pub participants: Arc<dyn ParticipantRepository>,
    pub users: Arc<dyn UserRepository>,
    pub receipts: Arc<dyn ReadReceiptRepository>,
    pub dispatcher: Arc<MessageDispatcher>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    /// validate membership -> persist -> reload with sender -> dispatch.
    ///
    /// Dispatch only ever sees a committed message, and its outcome never
    /// affects the result: the sender already rendered its own message
    /// optimistically and is excluded from the push.
    pub async fn create_message(
        &self,
        request: CreateMessageRequest,
    ) -> Result<MessageDto, ApplicationError> {
        let chat_id = ChatId::from(request.chat_id);
        let sender_id = UserId::from(request.sender_id);

        self.deps
            .participants
            .find_active(chat_id, sender_id)
            .await?
            .ok_or(ApplicationError::NotAParticipant)?;

        let now = self.deps.clock.now();
        let message = Message::new(
            MessageId::generate(),
            chat_id,
            sender_id,
            request.content,
            request.kind,
            now,
        )?;
        let message = self.deps.messages.create(message).await?;

        let dto = self
            .load_with_sender(message.id)
            .await?
            .ok_or(ApplicationError::MessageNotFound)?;

        let envelope = Envelope::new_message(&dto, now)?;
        let delivered = self
            .deps
            .dispatcher
            .to_chat(chat_id, &envelope, Some(sender_id))
            .await;
        debug!(chat_id = %chat_id, delivered, "new message fanned out");

        Ok(dto)
    }

    /// One pagination window, newest first in storage order, returned
    /// oldest first for rendering. `page` starts at 1.
    pub async fn list_messages(
        &self,
        chat_id: Uuid,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<MessageDto>, ApplicationError> {
        let chat_id = ChatId::from(chat_id);
        let offset = page.max(1).saturating_sub(1).saturating_mul(page_size);

        let messages = self.deps.messages.list_page(chat_id, offset, page_size).await?;
        let mut dtos = Vec::with_capacity(messages.len());
        for message in &messages {
            if let Some(sender) = self.deps.users.find_by_id(message.sender_id).await? {
                dtos.push(MessageDto::from_message(message, &sender));
            }
        }
        dtos.reverse();
        Ok(dtos)
    }

    /// Idempotent: an existing receipt for the pair is success, no
    /// duplicate is written. A conflict on the insert means a concurrent
    /// mark-read won the race, which is the same outcome.
    pub async fn mark_read(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ApplicationError> {
        let message_id = MessageId::from(message_id);
        let user_id = UserId::from(user_id);

        if self.deps.receipts.find(message_id, user_id).await?.is_some() {
            return Ok(());
        }

        let receipt = ReadReceipt::new(message_id, user_id, self.deps.clock.now());
        match self.deps.receipts.add(receipt).await {
            Ok(_) | Err(RepositoryError::Conflict) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn load_with_sender(
        &self,
        message_id: MessageId,
    ) -> Result<Option<MessageDto>, ApplicationError> {
        let Some(message) = self.deps.messages.find_by_id(message_id).await? else {
            return Ok(None);
        };
        let Some(sender) = self.deps.users.find_by_id(message.sender_id).await? else {
            return Ok(None);
        };
        Ok(Some(MessageDto::from_message(&message, &sender)))
    }
}
