use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ChatId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Direct,
    Group,
    Channel,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Group => "group",
            Self::Channel => "channel",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "direct" => Ok(Self::Direct),
            "group" => Ok(Self::Group),
            "channel" => Ok(Self::Channel),
            other => Err(DomainError::unknown_variant("chat kind", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub description: Option<String>,
    pub kind: ChatKind,
    pub created_by: UserId,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

impl Chat {
    pub fn new(
        id: ChatId,
        name: impl Into<String>,
        description: Option<String>,
        kind: ChatKind,
        created_by: UserId,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        if name.len() > 255 {
            return Err(DomainError::invalid_argument("name", "too long"));
        }

        Ok(Self {
            id,
            name,
            description,
            kind,
            created_by,
            created_at,
            updated_at: None,
        })
    }
}
