use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{MessageId, Timestamp, UserId};

/// One (message, user) read marker. At most one per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub id: Uuid,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub read_at: Timestamp,
}

impl ReadReceipt {
    pub fn new(message_id: MessageId, user_id: UserId, read_at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_id,
            user_id,
            read_at,
        }
    }
}
