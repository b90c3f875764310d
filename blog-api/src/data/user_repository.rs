use crate::domain::error::DomainError;
use crate::domain::pagination::Pagination;
use crate::domain::user::{NewUser, User};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, DomainError>;
    /// `None` returns every user.
    async fn list(&self, pagination: Option<Pagination>) -> Result<Vec<User>, DomainError>;
    async fn create(&self, user: NewUser) -> Result<User, DomainError>;
    /// Returns whether a row was affected.
    async fn update(&self, id: i32, user: NewUser) -> Result<bool, DomainError>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: i32) -> Result<bool, DomainError>;
}

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_write_error(e: sqlx::Error, email: &str) -> DomainError {
    if e.as_database_error()
        .and_then(|db| db.constraint())
        .map(|c| c.contains("users_email"))
        == Some(true)
    {
        DomainError::EmailTaken(email.to_string())
    } else {
        DomainError::from(e)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, DomainError> {
        sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to find user by id {}: {}", id, e);
                DomainError::from(e)
            })
    }

    async fn list(&self, pagination: Option<Pagination>) -> Result<Vec<User>, DomainError> {
        let query = match pagination {
            Some(page) => sqlx::query_as::<_, User>(
                "SELECT id, name, email FROM users ORDER BY id LIMIT $1 OFFSET $2",
            )
            .bind(page.limit())
            .bind(page.offset()),
            None => sqlx::query_as::<_, User>("SELECT id, name, email FROM users ORDER BY id"),
        };

        query.fetch_all(&self.pool).await.map_err(|e| {
            error!("failed to list users: {}", e);
            DomainError::from(e)
        })
    }

    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email)
            VALUES ($1, $2)
            RETURNING id, name, email
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to create user: {}", e);
            map_write_error(e, &user.email)
        })?;

        info!(user_id = created.id, email = %created.email, "user created");
        Ok(created)
    }

    async fn update(&self, id: i32, user: NewUser) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE users SET name = $1, email = $2 WHERE id = $3")
            .bind(&user.name)
            .bind(&user.email)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to update user {}: {}", id, e);
                map_write_error(e, &user.email)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i32) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to delete user {}: {}", id, e);
                DomainError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}
