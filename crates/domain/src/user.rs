use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: Timestamp,
    pub last_seen: Option<Timestamp>,
    pub is_online: bool,
}

impl User {
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
        display_name: Option<String>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let username = username.into().trim().to_owned();
        if username.is_empty() {
            return Err(DomainError::invalid_argument("username", "cannot be empty"));
        }
        if username.len() > 100 {
            return Err(DomainError::invalid_argument("username", "too long"));
        }
        let email = email.into().trim().to_owned();
        if !email.contains('@') {
            return Err(DomainError::invalid_argument("email", "not an email address"));
        }

        Ok(Self {
            id,
            username,
            email,
            display_name,
            created_at,
            last_seen: None,
            is_online: false,
        })
    }

    /// Records a presence transition together with the moment it was observed.
    pub fn set_online(&mut self, online: bool, at: Timestamp) {
        self.is_online = online;
        self.last_seen = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn rejects_blank_username() {
        let result = User::new(
            UserId::from(Uuid::new_v4()),
            "   ",
            "user@example.com",
            None,
            chrono::Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn set_online_updates_last_seen() {
        let now = chrono::Utc::now();
        let mut user = User::new(
            UserId::from(Uuid::new_v4()),
            "alice",
            "alice@example.com",
            None,
            now,
        )
        .unwrap();

        user.set_online(true, now);
        assert!(user.is_online);
        assert_eq!(user.last_seen, Some(now));
    }
}
