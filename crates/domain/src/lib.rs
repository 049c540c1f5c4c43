//! Core domain model for the chat delivery system.
//!
//! Entities reference each other by identifier only; resolving a reference
//! is always an explicit lookup through a repository.

pub mod chat;
pub mod errors;
pub mod message;
pub mod participant;
pub mod read_receipt;
pub mod user;
pub mod value_objects;

pub use chat::{Chat, ChatKind};
pub use errors::{DomainError, RepositoryError};
pub use message::{Message, MessageKind};
pub use participant::{Participant, ParticipantRole};
pub use read_receipt::ReadReceipt;
pub use user::User;
pub use value_objects::{ChatId, ConnectionId, MessageId, Timestamp, UserId};
