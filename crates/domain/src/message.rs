use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ChatId, MessageId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "file" => Ok(Self::File),
            "system" => Ok(Self::System),
            other => Err(DomainError::unknown_variant("message kind", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    pub kind: MessageKind,
    pub sent_at: Timestamp,
    pub edited_at: Option<Timestamp>,
    pub is_deleted: bool,
}

impl Message {
    pub fn new(
        id: MessageId,
        chat_id: ChatId,
        sender_id: UserId,
        content: impl Into<String>,
        kind: MessageKind,
        sent_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::invalid_argument("content", "cannot be empty"));
        }

        Ok(Self {
            id,
            chat_id,
            sender_id,
            content,
            kind,
            sent_at,
            edited_at: None,
            is_deleted: false,
        })
    }
}
