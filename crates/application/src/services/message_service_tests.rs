use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use domain::{
    ChatKind, MessageId, MessageKind, ParticipantRole, ReadReceipt, RepositoryError, User, UserId,
};

use crate::repository::memory::MemoryGateway;
use crate::repository::ReadReceiptRepository;
use crate::services::{
    AddUserRequest, ChatService, ChatServiceDependencies, ConnectionService,
    ConnectionServiceDependencies, CreateChatRequest, CreateMessageRequest, MessageService,
    MessageServiceDependencies,
};
use crate::transport::memory::RecordingTransport;
use crate::{
    ApplicationError, ChatMembershipIndex, ConnectionRegistry, MessageDispatcher, PresenceTracker,
    SystemClock,
};

struct TestEnv {
    gateway: Arc<MemoryGateway>,
    connections: ConnectionService,
    messages: MessageService,
    chats: ChatService,
}

fn test_env() -> TestEnv {
    let gateway = Arc::new(MemoryGateway::new());
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(ConnectionRegistry::new());
    let membership = Arc::new(ChatMembershipIndex::new());
    let presence = Arc::new(PresenceTracker::new(gateway.clone(), clock.clone()));
    let dispatcher = Arc::new(MessageDispatcher::new(
        registry.clone(),
        membership.clone(),
        presence.clone(),
    ));

    let connections = ConnectionService::new(ConnectionServiceDependencies {
        registry,
        membership,
        presence,
        dispatcher: dispatcher.clone(),
        participants: gateway.clone(),
    });
    let messages = MessageService::new(MessageServiceDependencies {
        messages: gateway.clone(),
        participants: gateway.clone(),
        users: gateway.clone(),
        receipts: gateway.clone(),
        dispatcher,
        clock: clock.clone(),
    });
    let chats = ChatService::new(ChatServiceDependencies {
        chats: gateway.clone(),
        participants: gateway.clone(),
        messages: gateway.clone(),
        users: gateway.clone(),
        clock,
    });

    TestEnv {
        gateway,
        connections,
        messages,
        chats,
    }
}

async fn seed_user(env: &TestEnv, username: &str) -> Uuid {
    use crate::repository::UserRepository;
    let user = User::new(
        UserId::generate(),
        username,
        format!("{username}@example.com"),
        None,
        chrono::Utc::now(),
    )
    .unwrap();
    let id = Uuid::from(user.id);
    env.gateway.create(user).await.unwrap();
    id
}

async fn seed_chat(env: &TestEnv, creator: Uuid, members: &[Uuid]) -> Uuid {
    let chat = env
        .chats
        .create_chat(CreateChatRequest {
            name: "general".to_owned(),
            description: None,
            kind: ChatKind::Group,
            creator_id: creator,
        })
        .await
        .unwrap();
    for member in members {
        env.chats
            .add_user(AddUserRequest {
                chat_id: chat.id,
                user_id: *member,
                role: ParticipantRole::Member,
            })
            .await
            .unwrap();
    }
    chat.id
}

fn text_message(chat_id: Uuid, sender_id: Uuid, content: &str) -> CreateMessageRequest {
    CreateMessageRequest {
        chat_id,
        sender_id,
        content: content.to_owned(),
        kind: MessageKind::Text,
    }
}

#[tokio::test]
async fn member_receives_push_sender_does_not() {
    let env = test_env();
    let alice = seed_user(&env, "alice").await;
    let bob = seed_user(&env, "bob").await;
    let chat_id = seed_chat(&env, alice, &[bob]).await;

    let alice_transport = Arc::new(RecordingTransport::new());
    let bob_transport = Arc::new(RecordingTransport::new());
    env.connections
        .connect(UserId::from(alice), alice_transport.clone())
        .await
        .unwrap();
    env.connections
        .connect(UserId::from(bob), bob_transport.clone())
        .await
        .unwrap();
    let alice_baseline = alice_transport.sent_count();
    let bob_baseline = bob_transport.sent_count();

    env.messages
        .create_message(text_message(chat_id, alice, "hi"))
        .await
        .unwrap();

    let frames = bob_transport.sent();
    assert_eq!(frames.len() - bob_baseline, 1);
    let pushed: serde_json::Value = serde_json::from_slice(frames.last().unwrap()).unwrap();
    assert_eq!(pushed["type"], "NEW_MESSAGE");
    assert_eq!(pushed["data"]["content"], "hi");
    assert_eq!(alice_transport.sent_count(), alice_baseline);
}

#[tokio::test]
async fn non_participant_post_is_rejected_without_side_effects() {
    let env = test_env();
    let alice = seed_user(&env, "alice").await;
    let bob = seed_user(&env, "bob").await;
    let outsider = seed_user(&env, "mallory").await;
    let chat_id = seed_chat(&env, alice, &[bob]).await;

    let bob_transport = Arc::new(RecordingTransport::new());
    env.connections
        .connect(UserId::from(bob), bob_transport.clone())
        .await
        .unwrap();
    let bob_baseline = bob_transport.sent_count();

    let result = env
        .messages
        .create_message(text_message(chat_id, outsider, "let me in"))
        .await;

    assert!(matches!(result, Err(ApplicationError::NotAParticipant)));
    use crate::repository::MessageRepository;
    let persisted = env
        .gateway
        .last_message(domain::ChatId::from(chat_id))
        .await
        .unwrap();
    assert!(persisted.is_none());
    assert_eq!(bob_transport.sent_count(), bob_baseline);
}

#[tokio::test]
async fn list_messages_returns_window_oldest_first() {
    let env = test_env();
    let alice = seed_user(&env, "alice").await;
    let chat_id = seed_chat(&env, alice, &[]).await;

    for i in 0..5 {
        env.messages
            .create_message(text_message(chat_id, alice, &format!("m{i}")))
            .await
            .unwrap();
        // distinct sent_at per message
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    // page 1 holds the two newest, rendered oldest first
    let page = env.messages.list_messages(chat_id, 1, 2).await.unwrap();
    let contents: Vec<&str> = page.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m3", "m4"]);

    let page_two = env.messages.list_messages(chat_id, 2, 2).await.unwrap();
    let contents: Vec<&str> = page_two.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m1", "m2"]);
}

#[tokio::test]
async fn mark_read_twice_writes_one_receipt() {
    let env = test_env();
    let alice = seed_user(&env, "alice").await;
    let bob = seed_user(&env, "bob").await;
    let chat_id = seed_chat(&env, alice, &[bob]).await;

    let message = env
        .messages
        .create_message(text_message(chat_id, alice, "read me"))
        .await
        .unwrap();

    env.messages.mark_read(message.id, bob).await.unwrap();
    env.messages.mark_read(message.id, bob).await.unwrap();

    let count = env
        .gateway
        .receipt_count(domain::MessageId::from(message.id))
        .await;
    assert_eq!(count, 1);
}

/// Simulates losing the check-then-insert race: the receipt does not exist
/// at check time but a concurrent writer lands it first.
struct PreemptedReceiptRepository;

#[async_trait]
impl ReadReceiptRepository for PreemptedReceiptRepository {
    async fn add(&self, _receipt: ReadReceipt) -> Result<ReadReceipt, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    async fn find(
        &self,
        _message_id: MessageId,
        _user_id: UserId,
    ) -> Result<Option<ReadReceipt>, RepositoryError> {
        Ok(None)
    }
}

#[tokio::test]
async fn mark_read_losing_the_insert_race_is_still_success() {
    let env = test_env();
    let alice = seed_user(&env, "alice").await;
    let bob = seed_user(&env, "bob").await;
    let chat_id = seed_chat(&env, alice, &[bob]).await;

    let message = env
        .messages
        .create_message(text_message(chat_id, alice, "read me"))
        .await
        .unwrap();

    let registry = Arc::new(ConnectionRegistry::new());
    let membership = Arc::new(ChatMembershipIndex::new());
    let presence = Arc::new(PresenceTracker::new(env.gateway.clone(), Arc::new(SystemClock)));
    let racing = MessageService::new(MessageServiceDependencies {
        messages: env.gateway.clone(),
        participants: env.gateway.clone(),
        users: env.gateway.clone(),
        receipts: Arc::new(PreemptedReceiptRepository),
        dispatcher: Arc::new(MessageDispatcher::new(registry, membership, presence)),
        clock: Arc::new(SystemClock),
    });

    racing.mark_read(message.id, bob).await.unwrap();
}

#[tokio::test]
async fn huge_page_number_yields_an_empty_window() {
    let env = test_env();
    let alice = seed_user(&env, "alice").await;
    let chat_id = seed_chat(&env, alice, &[]).await;

    env.messages
        .create_message(text_message(chat_id, alice, "only one"))
        .await
        .unwrap();

    let page = env
        .messages
        .list_messages(chat_id, u64::MAX, u64::MAX)
        .await
        .unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn offline_member_simply_misses_the_push() {
    let env = test_env();
    let alice = seed_user(&env, "alice").await;
    let bob = seed_user(&env, "bob").await;
    let chat_id = seed_chat(&env, alice, &[bob]).await;

    // nobody is connected; the message still persists
    let dto = env
        .messages
        .create_message(text_message(chat_id, alice, "into the void"))
        .await
        .unwrap();
    assert_eq!(dto.content, "into the void");
    assert_eq!(dto.sender_username, "alice");
}
