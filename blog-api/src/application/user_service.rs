use std::sync::Arc;

use tracing::{instrument, warn};

use crate::data::user_repository::UserRepository;
use crate::domain::{
    error::DomainError,
    user::{NewUser, User},
};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_user(&self, id: i32) -> Result<User, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::UserNotFound(id))
    }

    pub async fn get_users(&self) -> Result<Vec<User>, DomainError> {
        self.repo.list(None).await
    }

    #[instrument(skip(self))]
    pub async fn create_user(&self, user: NewUser) -> Result<User, DomainError> {
        self.repo.create(user).await
    }

    /// Overwrites name and email and echoes them back under `id`, whether or
    /// not a row existed.
    #[instrument(skip(self))]
    pub async fn update_user(&self, id: i32, user: NewUser) -> Result<User, DomainError> {
        if !self.repo.update(id, user.clone()).await? {
            warn!(user_id = id, "update matched no user");
        }
        Ok(user.into_user(id))
    }

    /// Deleting an unknown id is a no-op.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i32) -> Result<(), DomainError> {
        if !self.repo.delete(id).await? {
            warn!(user_id = id, "delete matched no user");
        }
        Ok(())
    }
}
