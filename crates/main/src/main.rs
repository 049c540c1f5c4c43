//! Server entry point: wires the Postgres repositories, the in-process
//! delivery components, and the HTTP/WebSocket surface together.

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use application::{
    ChatMembershipIndex, ChatService, ChatServiceDependencies, ConnectionRegistry,
    ConnectionService, ConnectionServiceDependencies, MessageDispatcher, MessageService,
    MessageServiceDependencies, PresenceTracker, SystemClock, UserService,
};
use application::repository::{
    ChatRepository, MessageRepository, ParticipantRepository, ReadReceiptRepository,
    UserRepository,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, PgChatRepository, PgMessageRepository, PgParticipantRepository,
    PgReadReceiptRepository, PgUserRepository,
};
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();

    let pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let chats: Arc<dyn ChatRepository> = Arc::new(PgChatRepository::new(pool.clone()));
    let participants: Arc<dyn ParticipantRepository> =
        Arc::new(PgParticipantRepository::new(pool.clone()));
    let messages: Arc<dyn MessageRepository> = Arc::new(PgMessageRepository::new(pool.clone()));
    let receipts: Arc<dyn ReadReceiptRepository> = Arc::new(PgReadReceiptRepository::new(pool));

    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);

    let registry = Arc::new(ConnectionRegistry::new());
    let membership = Arc::new(ChatMembershipIndex::new());
    let presence = Arc::new(PresenceTracker::new(users.clone(), clock.clone()));
    let dispatcher = Arc::new(MessageDispatcher::new(
        registry.clone(),
        membership.clone(),
        presence.clone(),
    ));

    let user_service = Arc::new(UserService::new(users.clone(), clock.clone()));
    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        chats,
        participants: participants.clone(),
        messages: messages.clone(),
        users: users.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        messages,
        participants: participants.clone(),
        users,
        receipts,
        dispatcher: dispatcher.clone(),
        clock,
    }));
    let connection_service = Arc::new(ConnectionService::new(ConnectionServiceDependencies {
        registry,
        membership,
        presence,
        dispatcher,
        participants,
    }));

    let state = AppState::new(user_service, chat_service, message_service, connection_service);

    let app = router(state).layer(TraceLayer::new_for_http());
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("chat server listening on http://{address}");
    axum::serve(listener, app).await?;

    Ok(())
}
