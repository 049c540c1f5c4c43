//! PostgreSQL implementation of the persistence gateway.

pub mod repository;

pub use repository::{
    create_pg_pool, PgChatRepository, PgMessageRepository, PgParticipantRepository,
    PgReadReceiptRepository, PgUserRepository,
};
