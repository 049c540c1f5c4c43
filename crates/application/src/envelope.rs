use serde::{Deserialize, Serialize};
use serde_json::Value;

use domain::{Timestamp, UserId};

use crate::dto::MessageDto;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    NewMessage,
    UserStatusChange,
}

/// Payload of a `USER_STATUS_CHANGE` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub user_id: UserId,
    pub is_online: bool,
    pub timestamp: Timestamp,
}

/// The typed event wrapper pushed over a live connection. Transient:
/// constructed fresh per push, never persisted.
///
/// Wire shape: `{"type": ..., "data": ..., "timestamp": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event: EventKind,
    pub data: Value,
    pub timestamp: Timestamp,
}

impl Envelope {
    pub fn new_message(message: &MessageDto, timestamp: Timestamp) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: EventKind::NewMessage,
            data: serde_json::to_value(message)?,
            timestamp,
        })
    }

    pub fn status_change(user_id: UserId, is_online: bool, timestamp: Timestamp) -> Self {
        let payload = StatusChange {
            user_id,
            is_online,
            timestamp,
        };
        Self {
            event: EventKind::UserStatusChange,
            // StatusChange serializes to plain JSON fields, this cannot fail
            data: serde_json::to_value(payload).unwrap_or(Value::Null),
            timestamp,
        }
    }
}
