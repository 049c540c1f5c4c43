use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use application::{
    ChatRepository, MessageRepository, ParticipantRepository, ReadReceiptRepository,
    UserRepository,
};
use domain::{
    Chat, ChatId, ChatKind, Message, MessageId, MessageKind, Participant, ParticipantRole,
    ReadReceipt, RepositoryError, User, UserId,
};

pub async fn create_pg_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    tracing::info!(max_connections, "postgres pool ready");
    Ok(pool)
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    display_name: Option<String>,
    created_at: DateTime<Utc>,
    last_seen: Option<DateTime<Utc>>,
    is_online: bool,
}

impl From<UserRecord> for User {
    fn from(value: UserRecord) -> Self {
        User {
            id: UserId::from(value.id),
            username: value.username,
            email: value.email,
            display_name: value.display_name,
            created_at: value.created_at,
            last_seen: value.last_seen,
            is_online: value.is_online,
        }
    }
}

#[derive(Debug, FromRow)]
struct ChatRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    kind: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ChatRecord> for Chat {
    type Error = RepositoryError;

    fn try_from(value: ChatRecord) -> Result<Self, Self::Error> {
        let kind = ChatKind::parse(&value.kind).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Chat {
            id: ChatId::from(value.id),
            name: value.name,
            description: value.description,
            kind,
            created_by: UserId::from(value.created_by),
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ParticipantRecord {
    id: Uuid,
    chat_id: Uuid,
    user_id: Uuid,
    role: String,
    joined_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl TryFrom<ParticipantRecord> for Participant {
    type Error = RepositoryError;

    fn try_from(value: ParticipantRecord) -> Result<Self, Self::Error> {
        let role =
            ParticipantRole::parse(&value.role).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Participant {
            id: value.id,
            chat_id: ChatId::from(value.chat_id),
            user_id: UserId::from(value.user_id),
            role,
            joined_at: value.joined_at,
            left_at: value.left_at,
            is_active: value.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    chat_id: Uuid,
    sender_id: Uuid,
    content: String,
    kind: String,
    sent_at: DateTime<Utc>,
    edited_at: Option<DateTime<Utc>>,
    is_deleted: bool,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let kind = MessageKind::parse(&value.kind).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Message {
            id: MessageId::from(value.id),
            chat_id: ChatId::from(value.chat_id),
            sender_id: UserId::from(value.sender_id),
            content: value.content,
            kind,
            sent_at: value.sent_at,
            edited_at: value.edited_at,
            is_deleted: value.is_deleted,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReceiptRecord {
    id: Uuid,
    message_id: Uuid,
    user_id: Uuid,
    read_at: DateTime<Utc>,
}

impl From<ReceiptRecord> for ReadReceipt {
    fn from(value: ReceiptRecord) -> Self {
        ReadReceipt {
            id: value.id,
            message_id: MessageId::from(value.message_id),
            user_id: UserId::from(value.user_id),
            read_at: value.read_at,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, email, display_name, created_at, last_seen, is_online)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, username, email, display_name, created_at, last_seen, is_online
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.created_at)
        .bind(user.last_seen)
        .bind(user.is_online)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(User::from(record))
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET username = $2, email = $3, display_name = $4, last_seen = $5, is_online = $6
            WHERE id = $1
            RETURNING id, username, email, display_name, created_at, last_seen, is_online
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.last_seen)
        .bind(user.is_online)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(User::from(record))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, display_name, created_at, last_seen, is_online FROM users WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, display_name, created_at, last_seen, is_online FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(User::from))
    }
}

#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    /// Chat row and owner participant row inside one database transaction;
    /// a failure on either insert rolls both back.
    async fn create_with_owner(
        &self,
        chat: Chat,
        owner: Participant,
    ) -> Result<Chat, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let record = sqlx::query_as::<_, ChatRecord>(
            r#"
            INSERT INTO chats (id, name, description, kind, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, description, kind, created_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(chat.id))
        .bind(&chat.name)
        .bind(&chat.description)
        .bind(chat.kind.as_str())
        .bind(Uuid::from(chat.created_by))
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            r#"
            INSERT INTO chat_participants (id, chat_id, user_id, role, joined_at, left_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(owner.id)
        .bind(Uuid::from(owner.chat_id))
        .bind(Uuid::from(owner.user_id))
        .bind(owner.role.as_str())
        .bind(owner.joined_at)
        .bind(owner.left_at)
        .bind(owner.is_active)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;

        Chat::try_from(record)
    }

    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        let record = sqlx::query_as::<_, ChatRecord>(
            "SELECT id, name, description, kind, created_by, created_at, updated_at FROM chats WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Chat::try_from).transpose()
    }
}

#[derive(Clone)]
pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantRepository for PgParticipantRepository {
    async fn add(&self, participant: Participant) -> Result<Participant, RepositoryError> {
        let record = sqlx::query_as::<_, ParticipantRecord>(
            r#"
            INSERT INTO chat_participants (id, chat_id, user_id, role, joined_at, left_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, chat_id, user_id, role, joined_at, left_at, is_active
            "#,
        )
        .bind(participant.id)
        .bind(Uuid::from(participant.chat_id))
        .bind(Uuid::from(participant.user_id))
        .bind(participant.role.as_str())
        .bind(participant.joined_at)
        .bind(participant.left_at)
        .bind(participant.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Participant::try_from(record)
    }

    async fn find_active(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Option<Participant>, RepositoryError> {
        let record = sqlx::query_as::<_, ParticipantRecord>(
            r#"
            SELECT id, chat_id, user_id, role, joined_at, left_at, is_active
            FROM chat_participants
            WHERE chat_id = $1 AND user_id = $2 AND is_active
            "#,
        )
        .bind(Uuid::from(chat_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Participant::try_from).transpose()
    }

    async fn list_active_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Participant>, RepositoryError> {
        let records = sqlx::query_as::<_, ParticipantRecord>(
            r#"
            SELECT id, chat_id, user_id, role, joined_at, left_at, is_active
            FROM chat_participants
            WHERE user_id = $1 AND is_active
            "#,
        )
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Participant::try_from).collect()
    }

    async fn count_active(&self, chat_id: ChatId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chat_participants WHERE chat_id = $1 AND is_active",
        )
        .bind(Uuid::from(chat_id))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(count as u64)
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, content, kind, sent_at, edited_at, is_deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, chat_id, sender_id, content, kind, sent_at, edited_at, is_deleted
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.chat_id))
        .bind(Uuid::from(message.sender_id))
        .bind(&message.content)
        .bind(message.kind.as_str())
        .bind(message.sent_at)
        .bind(message.edited_at)
        .bind(message.is_deleted)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, chat_id, sender_id, content, kind, sent_at, edited_at, is_deleted FROM messages WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn list_page(
        &self,
        chat_id: ChatId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, chat_id, sender_id, content, kind, sent_at, edited_at, is_deleted
            FROM messages
            WHERE chat_id = $1
            ORDER BY sent_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(Uuid::from(chat_id))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn last_message(&self, chat_id: ChatId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, chat_id, sender_id, content, kind, sent_at, edited_at, is_deleted
            FROM messages
            WHERE chat_id = $1
            ORDER BY sent_at DESC
            LIMIT 1
            "#,
        )
        .bind(Uuid::from(chat_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }
}

#[derive(Clone)]
pub struct PgReadReceiptRepository {
    pool: PgPool,
}

impl PgReadReceiptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadReceiptRepository for PgReadReceiptRepository {
    async fn add(&self, receipt: ReadReceipt) -> Result<ReadReceipt, RepositoryError> {
        let record = sqlx::query_as::<_, ReceiptRecord>(
            r#"
            INSERT INTO read_receipts (id, message_id, user_id, read_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, message_id, user_id, read_at
            "#,
        )
        .bind(receipt.id)
        .bind(Uuid::from(receipt.message_id))
        .bind(Uuid::from(receipt.user_id))
        .bind(receipt.read_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(ReadReceipt::from(record))
    }

    async fn find(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Result<Option<ReadReceipt>, RepositoryError> {
        let record = sqlx::query_as::<_, ReceiptRecord>(
            "SELECT id, message_id, user_id, read_at FROM read_receipts WHERE message_id = $1 AND user_id = $2",
        )
        .bind(Uuid::from(message_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(ReadReceipt::from))
    }
}
