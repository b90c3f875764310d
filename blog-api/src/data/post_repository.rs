use crate::domain::error::DomainError;
use crate::domain::pagination::Pagination;
use crate::domain::post::Post;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, DomainError>;
    async fn list(&self, pagination: Pagination) -> Result<Vec<Post>, DomainError>;
}

#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, DomainError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, created_at, updated_at
            FROM posts WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("db error find_by_id {}: {}", id, e);
            DomainError::from(e)
        })
    }

    async fn list(&self, pagination: Pagination) -> Result<Vec<Post>, DomainError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, created_at, updated_at
            FROM posts
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while fetching posts: {}", e);
            DomainError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_db;
    use chrono::Utc;

    async fn insert_post(pool: &PgPool, title: &str) -> i32 {
        let now = Utc::now();
        sqlx::query_scalar(
            "INSERT INTO posts (title, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $3) RETURNING id",
        )
        .bind(title)
        .bind("body")
        .bind(now)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn finds_inserted_post_and_misses_unknown_id() {
        let pool = test_db::pool().await;
        let repo = PostgresPostRepository::new(pool.clone());
        let id = insert_post(&pool, "hello").await;

        let post = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(post.title, "hello");
        assert!(post.created_at <= post.updated_at);

        assert!(repo.find_by_id(i32::MAX).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn list_respects_page_window() {
        let pool = test_db::pool().await;
        let repo = PostgresPostRepository::new(pool.clone());
        for i in 0..3 {
            insert_post(&pool, &format!("paged {i}")).await;
        }

        let first = repo.list(Pagination::new(1, 2)).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(first[0].id < first[1].id);

        let second = repo.list(Pagination::new(2, 2)).await.unwrap();
        assert!(second.iter().all(|p| p.id > first[1].id));
    }
}
