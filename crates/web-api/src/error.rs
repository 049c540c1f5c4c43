use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use domain::RepositoryError;

        match error {
            ApplicationError::NotAParticipant => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_A_PARTICIPANT",
                "user is not a participant of this chat",
            ),
            ApplicationError::ChatNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "CHAT_NOT_FOUND", "chat not found")
            }
            ApplicationError::UserNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "user not found")
            }
            ApplicationError::MessageNotFound => ApiError::new(
                StatusCode::NOT_FOUND,
                "MESSAGE_NOT_FOUND",
                "message not found",
            ),
            ApplicationError::Domain(err) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                err.to_string(),
            ),
            ApplicationError::Repository(RepositoryError::NotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "requested resource not found",
            ),
            ApplicationError::Repository(RepositoryError::Conflict) => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
            }
            ApplicationError::Repository(RepositoryError::Storage { message }) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                format!("database error: {message}"),
            ),
            ApplicationError::Serialization(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERIALIZATION_ERROR",
                err.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
