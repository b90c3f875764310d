use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::pagination::Pagination;
use crate::domain::post::Post;
use crate::domain::user::{NewUser, User};

#[derive(Debug, Default)]
struct Tables {
    posts: BTreeMap<i32, Post>,
    users: BTreeMap<i32, User>,
    next_post_id: i32,
    next_user_id: i32,
}

/// In-memory store backing both repositories. Intended for tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stands in for the seed data provisioned alongside the schema.
    pub fn seed_post(&self, title: &str, content: &str) -> Post {
        let mut tables = self.tables.write().unwrap();
        tables.next_post_id += 1;
        let now = Utc::now();
        let post = Post {
            id: tables.next_post_id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(post.id, post.clone());
        post
    }

    fn page<T: Clone>(rows: impl Iterator<Item = T>, pagination: Pagination) -> Vec<T> {
        rows.skip(pagination.offset() as usize)
            .take(pagination.size as usize)
            .collect()
    }
}

fn email_taken(tables: &Tables, email: &str, except: Option<i32>) -> bool {
    tables
        .users
        .values()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, DomainError> {
        Ok(self.tables.read().unwrap().posts.get(&id).cloned())
    }

    async fn list(&self, pagination: Pagination) -> Result<Vec<Post>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(Self::page(tables.posts.values().cloned(), pagination))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, DomainError> {
        Ok(self.tables.read().unwrap().users.get(&id).cloned())
    }

    async fn list(&self, pagination: Option<Pagination>) -> Result<Vec<User>, DomainError> {
        let tables = self.tables.read().unwrap();
        let rows = tables.users.values().cloned();
        Ok(match pagination {
            Some(p) => Self::page(rows, p),
            None => rows.collect(),
        })
    }

    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut tables = self.tables.write().unwrap();
        if email_taken(&tables, &user.email, None) {
            return Err(DomainError::EmailTaken(user.email));
        }
        tables.next_user_id += 1;
        let created = user.into_user(tables.next_user_id);
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, user: NewUser) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().unwrap();
        if email_taken(&tables, &user.email, Some(id)) {
            return Err(DomainError::EmailTaken(user.email));
        }
        match tables.users.get_mut(&id) {
            Some(row) => {
                *row = user.into_user(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i32) -> Result<bool, DomainError> {
        Ok(self.tables.write().unwrap().users.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_monotonic_and_never_reused() {
        let store = InMemoryStore::new();
        let a = store.create(NewUser::new("A", "a@x.com")).await.unwrap();
        let b = store.create(NewUser::new("B", "b@x.com")).await.unwrap();
        assert!(b.id > a.id);

        UserRepository::delete(&store, b.id).await.unwrap();
        let c = store.create(NewUser::new("C", "c@x.com")).await.unwrap();
        assert!(c.id > b.id);
    }

    #[tokio::test]
    async fn update_keeps_email_unique_across_other_users() {
        let store = InMemoryStore::new();
        let a = store.create(NewUser::new("A", "a@x.com")).await.unwrap();
        store.create(NewUser::new("B", "b@x.com")).await.unwrap();

        let err = store
            .update(a.id, NewUser::new("A", "b@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::EmailTaken(_)));

        // Rewriting one's own email is not a conflict.
        assert!(store.update(a.id, NewUser::new("Ann", "a@x.com")).await.unwrap());
    }

    #[tokio::test]
    async fn post_listing_pages_by_id() {
        let store = InMemoryStore::new();
        for i in 1..=5 {
            store.seed_post(&format!("post {i}"), "body");
        }

        let page = PostRepository::list(&store, Pagination::new(2, 2)).await.unwrap();
        let ids: Vec<i32> = page.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 4]);

        let past_end = PostRepository::list(&store, Pagination::new(4, 2)).await.unwrap();
        assert!(past_end.is_empty());
    }
}
