//! Application layer: the real-time delivery core.
//!
//! Owns the connection registry, the chat membership index, presence
//! tracking, and the fan-out dispatcher, plus the use-case services that
//! orchestrate them against the persistence gateway.

pub mod clock;
pub mod dispatcher;
pub mod dto;
pub mod envelope;
pub mod error;
pub mod membership;
pub mod presence;
pub mod registry;
pub mod repository;
pub mod services;
pub mod transport;

pub use clock::{Clock, SystemClock};
pub use dispatcher::MessageDispatcher;
pub use dto::{ChatDto, MessageDto, UserDto};
pub use envelope::{Envelope, EventKind, StatusChange};
pub use error::ApplicationError;
pub use membership::ChatMembershipIndex;
pub use presence::PresenceTracker;
pub use registry::{Connection, ConnectionRegistry};
pub use repository::{
    ChatRepository, MessageRepository, ParticipantRepository, ReadReceiptRepository,
    UserRepository,
};
pub use services::{
    AddUserRequest, ChatService, ChatServiceDependencies, ConnectionService,
    ConnectionServiceDependencies, CreateChatRequest, CreateMessageRequest, CreateUserRequest,
    MessageService, MessageServiceDependencies, UserService,
};
pub use transport::{ClientTransport, TransportError};
