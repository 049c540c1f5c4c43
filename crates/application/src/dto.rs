use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain::{ChatKind, Message, MessageKind, Timestamp, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: Uuid::from(user.id),
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            is_online: user.is_online,
            last_seen: user.last_seen,
            created_at: user.created_at,
        }
    }
}

/// Message view with resolved sender identity. Content is never broadcast
/// without it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub sender_display_name: Option<String>,
    pub content: String,
    pub kind: MessageKind,
    pub sent_at: Timestamp,
    pub edited_at: Option<Timestamp>,
    pub is_deleted: bool,
}

impl MessageDto {
    pub fn from_message(message: &Message, sender: &User) -> Self {
        Self {
            id: Uuid::from(message.id),
            chat_id: Uuid::from(message.chat_id),
            sender_id: Uuid::from(message.sender_id),
            sender_username: sender.username.clone(),
            sender_display_name: sender.display_name.clone(),
            content: message.content.clone(),
            kind: message.kind,
            sent_at: message.sent_at,
            edited_at: message.edited_at,
            is_deleted: message.is_deleted,
        }
    }
}

/// Read-side chat summary composed from gateway lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: ChatKind,
    pub created_by: Uuid,
    pub created_by_username: String,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    pub participant_count: u64,
    pub last_message: Option<MessageDto>,
}

impl ChatDto {
    /// Timestamp used to order a user's chat list, newest activity first.
    pub fn last_activity(&self) -> Timestamp {
        self.updated_at.unwrap_or(self.created_at)
    }
}
