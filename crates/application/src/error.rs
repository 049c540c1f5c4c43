use domain::{DomainError, RepositoryError};
use thiserror::Error;

/// Application-level error taxonomy.
///
/// Transport failures never appear here: the dispatcher contains them and
/// surfaces them only as an implicit disconnect of the affected recipient.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("user is not a participant of this chat")]
    NotAParticipant,
    #[error("chat not found")]
    ChatNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("message not found")]
    MessageNotFound,
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
