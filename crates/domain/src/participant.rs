use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::value_objects::{ChatId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Owner,
    Admin,
    Member,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(DomainError::unknown_variant("participant role", other)),
        }
    }
}

/// Persisted chat membership row. The runtime membership index is derived
/// from active rows and never the other way around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub role: ParticipantRole,
    pub joined_at: Timestamp,
    pub left_at: Option<Timestamp>,
    pub is_active: bool,
}

impl Participant {
    pub fn new(chat_id: ChatId, user_id: UserId, role: ParticipantRole, joined_at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            user_id,
            role,
            joined_at,
            left_at: None,
            is_active: true,
        }
    }
}
