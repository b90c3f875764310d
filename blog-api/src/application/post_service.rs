use std::sync::Arc;

use crate::data::post_repository::PostRepository;
use crate::domain::{error::DomainError, pagination::Pagination, post::Post};

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_post(&self, id: i32) -> Result<Post, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::PostNotFound(id))
    }

    pub async fn get_posts(&self, pagination: Pagination) -> Result<Vec<Post>, DomainError> {
        self.repo.list(pagination).await
    }
}
