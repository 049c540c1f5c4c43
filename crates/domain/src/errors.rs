use thiserror::Error;

/// Errors raised by domain-level validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {field}: {reason}")]
    InvalidArgument {
        field: &'static str,
        reason: &'static str,
    },
    #[error("unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl DomainError {
    pub fn invalid_argument(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidArgument { field, reason }
    }

    pub fn unknown_variant(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.into(),
        }
    }
}

/// Errors surfaced by the persistence gateway.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("entity not found")]
    NotFound,
    #[error("conflicting entity already exists")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
