//! In-memory repositories.
//!
//! Used when no database is configured and in tests. Users and posts share
//! one lock so the owned-posts list changes together with the post rows.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Post, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository, UserRepository};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
}

/// Shared backing store for the in-memory repositories.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            store: self.clone(),
        }
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository {
            store: self.clone(),
        }
    }
}

/// In-memory user repository.
pub struct InMemoryUserRepository {
    store: InMemoryStore,
}

/// In-memory post repository.
pub struct InMemoryPostRepository {
    store: InMemoryStore,
}

fn email_taken(tables: &Tables, email: &str, except: Uuid) -> bool {
    tables
        .users
        .values()
        .any(|u| u.id != except && u.email == email)
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.store.tables.read().await.users.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;

        if tables.users.contains_key(&user.id) {
            return Err(RepoError::Constraint("user id already exists".to_string()));
        }
        if email_taken(&tables, &user.email, user.id) {
            return Err(RepoError::Constraint("email already exists".to_string()));
        }

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;

        if !tables.users.contains_key(&user.id) {
            return Err(RepoError::NotFound);
        }
        if email_taken(&tables, &user.email, user.id) {
            return Err(RepoError::Constraint("email already exists".to_string()));
        }

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;

        tables.users.remove(&id).ok_or(RepoError::NotFound)?;
        // Mirrors the ON DELETE CASCADE of the posts table.
        tables.posts.retain(|_, p| p.creator_id != id);

        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;

        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.store.tables.read().await;

        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn update_status(&self, id: Uuid, status: &str) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;

        let user = tables.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.status = status.to_string();
        user.updated_at = Utc::now();

        Ok(())
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.store.tables.read().await.posts.get(&id).cloned())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;

        if tables.posts.contains_key(&post.id) {
            return Err(RepoError::Constraint("post id already exists".to_string()));
        }
        if !tables.users.contains_key(&post.creator_id) {
            return Err(RepoError::Constraint("creator does not exist".to_string()));
        }

        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;

        match tables.posts.get_mut(&post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(post)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;

        tables.posts.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self) -> Result<u64, RepoError> {
        Ok(self.store.tables.read().await.posts.len() as u64)
    }

    async fn find_page(&self, offset: u64, limit: u64) -> Result<Vec<Post>, RepoError> {
        let tables = self.store.tables.read().await;

        let mut posts: Vec<Post> = tables.posts.values().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(posts
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn insert_for_creator(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;

        if tables.posts.contains_key(&post.id) {
            return Err(RepoError::Constraint("post id already exists".to_string()));
        }
        let owner = tables
            .users
            .get_mut(&post.creator_id)
            .ok_or(RepoError::NotFound)?;
        owner.posts.push(post.id);

        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete_for_creator(&self, post: &Post) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;

        tables.posts.remove(&post.id).ok_or(RepoError::NotFound)?;
        if let Some(owner) = tables.users.get_mut(&post.creator_id) {
            owner.posts.retain(|id| *id != post.id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn user(email: &str) -> User {
        User::new(email.to_string(), "hash".to_string(), "Tester".to_string())
    }

    fn new_post(creator_id: Uuid, title: &str) -> Post {
        Post::new(
            creator_id,
            title.to_string(),
            "Content".to_string(),
            "images/a.png".to_string(),
        )
    }

    #[tokio::test]
    async fn test_user_email_is_unique() {
        let store = InMemoryStore::new();
        let users = store.users();

        users.insert(user("a@x.com")).await.unwrap();
        let result = users.insert(user("a@x.com")).await;

        assert!(matches!(result, Err(RepoError::Constraint(_))));
        assert!(users.find_by_email("a@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_and_delete_for_creator_keep_list_in_sync() {
        let store = InMemoryStore::new();
        let users = store.users();
        let posts = store.posts();
        let owner = users.insert(user("a@x.com")).await.unwrap();

        let post = new_post(owner.id, "Title");
        posts.insert_for_creator(post.clone()).await.unwrap();

        let owner_after = users.find_by_id(owner.id).await.unwrap().unwrap();
        assert_eq!(owner_after.posts, vec![post.id]);

        posts.delete_for_creator(&post).await.unwrap();

        let owner_after = users.find_by_id(owner.id).await.unwrap().unwrap();
        assert!(owner_after.posts.is_empty());
        assert!(posts.find_by_id(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_for_missing_creator_fails() {
        let store = InMemoryStore::new();
        let post = new_post(Uuid::new_v4(), "Title");

        let result = store.posts().insert_for_creator(post).await;

        assert!(matches!(result, Err(RepoError::NotFound)));
        assert_eq!(store.posts().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_page_is_newest_first() {
        let store = InMemoryStore::new();
        let owner = store.users().insert(user("a@x.com")).await.unwrap();
        let posts = store.posts();
        let now = Utc::now();

        let mut ids = Vec::new();
        for minutes in 0..3 {
            let mut post = new_post(owner.id, &format!("Post {minutes}"));
            post.created_at = now + Duration::minutes(minutes);
            ids.push(post.id);
            posts.insert_for_creator(post).await.unwrap();
        }

        let first = posts.find_page(0, 2).await.unwrap();
        let second = posts.find_page(2, 2).await.unwrap();

        let ids_of = |page: &[Post]| page.iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids_of(&first), vec![ids[2], ids[1]]);
        assert_eq!(ids_of(&second), vec![ids[0]]);
        assert!(posts.find_page(u64::MAX, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_status_keeps_owned_posts() {
        let store = InMemoryStore::new();
        let users = store.users();
        let owner = users.insert(user("a@x.com")).await.unwrap();
        let created = store
            .posts()
            .insert_for_creator(new_post(owner.id, "Title"))
            .await
            .unwrap();

        users.update_status(owner.id, "Busy").await.unwrap();

        let owner_after = users.find_by_id(owner.id).await.unwrap().unwrap();
        assert_eq!(owner_after.status, "Busy");
        assert_eq!(owner_after.posts, vec![created.id]);

        let missing = users.update_status(Uuid::new_v4(), "Busy").await;
        assert!(matches!(missing, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_posts() {
        let store = InMemoryStore::new();
        let owner = store.users().insert(user("a@x.com")).await.unwrap();
        let post = new_post(owner.id, "Title");
        store.posts().insert_for_creator(post).await.unwrap();

        store.users().delete(owner.id).await.unwrap();

        assert_eq!(store.posts().count().await.unwrap(), 0);
    }
}
