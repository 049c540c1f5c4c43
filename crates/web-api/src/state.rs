use std::sync::Arc;

use application::{ChatService, ConnectionService, MessageService, UserService};

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub chat_service: Arc<ChatService>,
    pub message_service: Arc<MessageService>,
    pub connection_service: Arc<ConnectionService>,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        chat_service: Arc<ChatService>,
        message_service: Arc<MessageService>,
        connection_service: Arc<ConnectionService>,
    ) -> Self {
        Self {
            user_service,
            chat_service,
            message_service,
            connection_service,
        }
    }
}
