use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use application::{
    AddUserRequest, ChatDto, CreateChatRequest, CreateMessageRequest, CreateUserRequest,
    MessageDto, UserDto,
};
use domain::{ChatKind, MessageKind, ParticipantRole};

use crate::{error::ApiError, state::AppState, websocket};

#[derive(Debug, Deserialize)]
struct CreateUserPayload {
    username: String,
    email: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateChatPayload {
    name: String,
    description: Option<String>,
    kind: ChatKind,
    creator_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct AddParticipantPayload {
    user_id: Uuid,
    role: Option<ParticipantRole>,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    sender_id: Uuid,
    content: String,
    kind: Option<MessageKind>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    page: Option<u64>,
    page_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MarkReadPayload {
    user_id: Uuid,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{user_id}", get(get_user))
        .route("/users/{user_id}/chats", get(user_chats))
        .route("/chats", post(create_chat))
        .route("/chats/{chat_id}", get(get_chat))
        .route("/chats/{chat_id}/participants", post(add_participant))
        .route(
            "/chats/{chat_id}/messages",
            post(send_message).get(get_history),
        )
        .route("/messages/{message_id}/read", post(mark_read))
        .route("/ws", get(websocket::websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let dto = state
        .user_service
        .create_user(CreateUserRequest {
            username: payload.username,
            email: payload.email,
            display_name: payload.display_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserDto>, ApiError> {
    let dto = state.user_service.get_user(user_id).await?;
    Ok(Json(dto))
}

async fn user_chats(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<ChatDto>>, ApiError> {
    let dtos = state.chat_service.user_chats(user_id).await?;
    Ok(Json(dtos))
}

async fn create_chat(
    State(state): State<AppState>,
    Json(payload): Json<CreateChatPayload>,
) -> Result<(StatusCode, Json<ChatDto>), ApiError> {
    let dto = state
        .chat_service
        .create_chat(CreateChatRequest {
            name: payload.name,
            description: payload.description,
            kind: payload.kind,
            creator_id: payload.creator_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn get_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<ChatDto>, ApiError> {
    let dto = state.chat_service.get_chat(chat_id).await?;
    Ok(Json(dto))
}

async fn add_participant(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Json(payload): Json<AddParticipantPayload>,
) -> Result<StatusCode, ApiError> {
    state
        .chat_service
        .add_user(AddUserRequest {
            chat_id,
            user_id: payload.user_id,
            role: payload.role.unwrap_or(ParticipantRole::Member),
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn send_message(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let dto = state
        .message_service
        .create_message(CreateMessageRequest {
            chat_id,
            sender_id: payload.sender_id,
            content: payload.content,
            kind: payload.kind.unwrap_or(MessageKind::Text),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn get_history(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(50).min(100);
    let items = state
        .message_service
        .list_messages(chat_id, page, page_size)
        .await?;

    Ok(Json(items))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Json(payload): Json<MarkReadPayload>,
) -> Result<StatusCode, ApiError> {
    state
        .message_service
        .mark_read(message_id, payload.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
