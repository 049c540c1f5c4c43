//! End-to-end flows over the in-memory gateway: connection lifecycle,
//! membership rebuild, presence broadcast and fan-out working together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use application::repository::memory::MemoryGateway;
use application::repository::{ParticipantRepository, UserRepository};
use application::transport::memory::RecordingTransport;
use application::{
    AddUserRequest, ChatMembershipIndex, ChatService, ChatServiceDependencies, ConnectionRegistry,
    ConnectionService, ConnectionServiceDependencies, CreateChatRequest, CreateMessageRequest,
    MessageDispatcher, MessageService, MessageServiceDependencies, PresenceTracker, SystemClock,
};
use domain::{ChatId, ChatKind, MessageKind, ParticipantRole, User, UserId};

struct Stack {
    gateway: Arc<MemoryGateway>,
    registry: Arc<ConnectionRegistry>,
    membership: Arc<ChatMembershipIndex>,
    connections: ConnectionService,
    messages: MessageService,
    chats: ChatService,
}

fn stack() -> Stack {
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

    Stack {
        connections: ConnectionService::new(ConnectionServiceDependencies {
            registry: registry.clone(),
            membership: membership.clone(),
            presence: presence.clone(),
            dispatcher: dispatcher.clone(),
            participants: gateway.clone(),
        }),
        messages: MessageService::new(MessageServiceDependencies {
            messages: gateway.clone(),
            participants: gateway.clone(),
            users: gateway.clone(),
            receipts: gateway.clone(),
            dispatcher,
            clock: clock.clone(),
        }),
        chats: ChatService::new(ChatServiceDependencies {
            chats: gateway.clone(),
            participants: gateway.clone(),
            messages: gateway.clone(),
            users: gateway.clone(),
            clock,
        }),
        gateway,
        registry,
        membership,
    }
}

async fn seed_user(stack: &Stack, username: &str) -> UserId {
    let user = User::new(
        UserId::generate(),
        username,
        format!("{username}@example.com"),
        None,
        chrono::Utc::now(),
    )
    .unwrap();
    let id = user.id;
    stack.gateway.create(user).await.unwrap();
    id
}

async fn seed_chat(stack: &Stack, creator: UserId, members: &[UserId]) -> ChatId {
    let chat = stack
        .chats
        .create_chat(CreateChatRequest {
            name: "general".to_owned(),
            description: None,
            kind: ChatKind::Group,
            creator_id: Uuid::from(creator),
        })
        .await
        .unwrap();
    for member in members {
        stack
            .chats
            .add_user(AddUserRequest {
                chat_id: chat.id,
                user_id: Uuid::from(*member),
                role: ParticipantRole::Member,
            })
            .await
            .unwrap();
    }
    ChatId::from(chat.id)
}

#[tokio::test]
async fn connect_rebuilds_membership_from_participant_rows() {
    let stack = stack();
    let alice = seed_user(&stack, "alice").await;
    let chat_a = seed_chat(&stack, alice, &[]).await;
    let chat_b = seed_chat(&stack, alice, &[]).await;

    stack
        .connections
        .connect(alice, Arc::new(RecordingTransport::new()))
        .await
        .unwrap();

    // in the index iff live connection AND active participant row
    assert_eq!(stack.membership.members_of(chat_a).await, vec![alice]);
    assert_eq!(stack.membership.members_of(chat_b).await, vec![alice]);
    assert!(stack.registry.is_online(alice).await);
}

#[tokio::test]
async fn disconnect_clears_membership_and_announces_offline() {
    let stack = stack();
    let alice = seed_user(&stack, "alice").await;
    let bob = seed_user(&stack, "bob").await;
    let chat_id = seed_chat(&stack, alice, &[bob]).await;

    let bob_transport = Arc::new(RecordingTransport::new());
    stack
        .connections
        .connect(alice, Arc::new(RecordingTransport::new()))
        .await
        .unwrap();
    stack
        .connections
        .connect(bob, bob_transport.clone())
        .await
        .unwrap();
    let baseline = bob_transport.sent_count();

    stack.connections.disconnect(alice).await;

    assert_eq!(stack.membership.members_of(chat_id).await, vec![bob]);
    assert!(!stack.registry.is_online(alice).await);

    let frames = bob_transport.sent();
    assert_eq!(frames.len() - baseline, 1);
    let status: serde_json::Value = serde_json::from_slice(frames.last().unwrap()).unwrap();
    assert_eq!(status["type"], "USER_STATUS_CHANGE");
    assert_eq!(status["data"]["is_online"], false);
    assert_eq!(
        status["data"]["user_id"],
        serde_json::json!(Uuid::from(alice))
    );

    let stored = stack.gateway.find_by_id(alice).await.unwrap().unwrap();
    assert!(!stored.is_online);
}

#[tokio::test]
async fn reconnect_restores_identical_membership() {
    let stack = stack();
    let alice = seed_user(&stack, "alice").await;
    let chat_a = seed_chat(&stack, alice, &[]).await;
    let chat_b = seed_chat(&stack, alice, &[]).await;

    stack
        .connections
        .connect(alice, Arc::new(RecordingTransport::new()))
        .await
        .unwrap();
    let before: Vec<Vec<UserId>> = vec![
        stack.membership.members_of(chat_a).await,
        stack.membership.members_of(chat_b).await,
    ];

    stack.connections.disconnect(alice).await;
    assert!(stack.membership.members_of(chat_a).await.is_empty());

    stack
        .connections
        .connect(alice, Arc::new(RecordingTransport::new()))
        .await
        .unwrap();
    let after = vec![
        stack.membership.members_of(chat_a).await,
        stack.membership.members_of(chat_b).await,
    ];

    assert_eq!(before, after);
}

#[tokio::test]
async fn broken_transport_is_dropped_on_first_push() {
    let stack = stack();
    let alice = seed_user(&stack, "alice").await;
    let bob = seed_user(&stack, "bob").await;
    let chat_id = seed_chat(&stack, alice, &[bob]).await;

    stack
        .connections
        .connect(alice, Arc::new(RecordingTransport::new()))
        .await
        .unwrap();
    stack
        .connections
        .connect(bob, Arc::new(RecordingTransport::failing()))
        .await
        .unwrap();

    // bob's transport refuses the push; the create itself still succeeds
    let dto = stack
        .messages
        .create_message(CreateMessageRequest {
            chat_id: Uuid::from(chat_id),
            sender_id: Uuid::from(alice),
            content: "hello?".to_owned(),
            kind: MessageKind::Text,
        })
        .await
        .unwrap();
    assert_eq!(dto.content, "hello?");

    assert!(!stack.registry.is_online(bob).await);
    assert_eq!(stack.membership.members_of(chat_id).await, vec![alice]);
    let stored = stack.gateway.find_by_id(bob).await.unwrap().unwrap();
    assert!(!stored.is_online);
}

/// Delegates to the in-memory gateway except that the participant listing
/// fails while `fail_listing` is set.
struct FlakyParticipantRepository {
    inner: Arc<MemoryGateway>,
    fail_listing: AtomicBool,
}

#[async_trait]
impl ParticipantRepository for FlakyParticipantRepository {
    async fn add(
        &self,
        participant: domain::Participant,
    ) -> Result<domain::Participant, domain::RepositoryError> {
        self.inner.add(participant).await
    }

    async fn find_active(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Option<domain::Participant>, domain::RepositoryError> {
        self.inner.find_active(chat_id, user_id).await
    }

    async fn list_active_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<domain::Participant>, domain::RepositoryError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(domain::RepositoryError::storage("listing unavailable"));
        }
        self.inner.list_active_for_user(user_id).await
    }

    async fn count_active(&self, chat_id: ChatId) -> Result<u64, domain::RepositoryError> {
        self.inner.count_active(chat_id).await
    }
}

#[tokio::test]
async fn failed_membership_rebuild_frees_the_registry_slot() {
    let stack = stack();
    let alice = seed_user(&stack, "alice").await;
    let chat_id = seed_chat(&stack, alice, &[]).await;

    let participants = Arc::new(FlakyParticipantRepository {
        inner: stack.gateway.clone(),
        fail_listing: AtomicBool::new(true),
    });
    let connections = ConnectionService::new(ConnectionServiceDependencies {
        registry: stack.registry.clone(),
        membership: stack.membership.clone(),
        presence: Arc::new(PresenceTracker::new(
            stack.gateway.clone(),
            Arc::new(SystemClock),
        )),
        dispatcher: Arc::new(MessageDispatcher::new(
            stack.registry.clone(),
            stack.membership.clone(),
            Arc::new(PresenceTracker::new(
                stack.gateway.clone(),
                Arc::new(SystemClock),
            )),
        )),
        participants: participants.clone(),
    });

    let result = connections
        .connect(alice, Arc::new(RecordingTransport::new()))
        .await;

    // the failed connect leaves nothing behind
    assert!(result.is_err());
    assert!(!stack.registry.is_online(alice).await);
    assert!(stack.membership.members_of(chat_id).await.is_empty());

    // and the user can connect again once the gateway recovers
    participants.fail_listing.store(false, Ordering::SeqCst);
    connections
        .connect(alice, Arc::new(RecordingTransport::new()))
        .await
        .unwrap();
    assert!(stack.registry.is_online(alice).await);
    assert_eq!(stack.membership.members_of(chat_id).await, vec![alice]);
}

#[tokio::test]
async fn duplicate_connect_keeps_first_transport() {
    let stack = stack();
    let alice = seed_user(&stack, "alice").await;
    let bob = seed_user(&stack, "bob").await;
    let chat_id = seed_chat(&stack, alice, &[bob]).await;

    let first = Arc::new(RecordingTransport::new());
    let second = Arc::new(RecordingTransport::new());
    stack.connections.connect(bob, first.clone()).await.unwrap();
    stack.connections.connect(bob, second.clone()).await.unwrap();
    let baseline = first.sent_count();

    stack
        .messages
        .create_message(CreateMessageRequest {
            chat_id: Uuid::from(chat_id),
            sender_id: Uuid::from(alice),
            content: "still there?".to_owned(),
            kind: MessageKind::Text,
        })
        .await
        .unwrap();

    assert_eq!(first.sent_count() - baseline, 1);
    assert_eq!(second.sent_count(), 0);
}
