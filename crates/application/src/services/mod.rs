mod chat_service;
mod connection_service;
mod message_service;
mod user_service;

#[cfg(test)]
mod message_service_tests;

pub use chat_service::{AddUserRequest, ChatService, ChatServiceDependencies, CreateChatRequest};
pub use connection_service::{ConnectionService, ConnectionServiceDependencies};
pub use message_service::{CreateMessageRequest, MessageService, MessageServiceDependencies};
pub use user_service::{CreateUserRequest, UserService};
