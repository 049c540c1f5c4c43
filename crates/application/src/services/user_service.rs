use std::sync::Arc;

use uuid::Uuid;

use domain::{User, UserId};

use crate::clock::Clock;
use crate::dto::UserDto;
use crate::error::ApplicationError;
use crate::repository::UserRepository;

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    pub async fn create_user(
        &self,
        request: CreateUserRequest,
    ) -> Result<UserDto, ApplicationError> {
        let user = User::new(
            UserId::generate(),
            request.username,
            request.email,
            request.display_name,
            self.clock.now(),
        )?;
        let user = self.users.create(user).await?;
        Ok(UserDto::from(&user))
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserDto, ApplicationError> {
        let user = self
            .users
            .find_by_id(UserId::from(user_id))
            .await?
            .ok_or(ApplicationError::UserNotFound)?;
        Ok(UserDto::from(&user))
    }
}
