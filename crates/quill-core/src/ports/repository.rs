use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Post, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Overwrite an existing entity. Fails with `RepoError::NotFound` if it is gone.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their (normalized) email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Fetch every user whose id is in `ids`. Missing ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;

    /// Set the status line only; the owned-posts list is left untouched.
    /// Fails with `RepoError::NotFound` if the user is gone.
    async fn update_status(&self, id: Uuid, status: &str) -> Result<(), RepoError>;
}

/// Post repository.
///
/// Creating and deleting a post also maintains the creator's owned-posts
/// list; both records change together or not at all.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Total number of posts.
    async fn count(&self) -> Result<u64, RepoError>;

    /// Posts newest first, skipping `offset` and returning at most `limit`.
    async fn find_page(&self, offset: u64, limit: u64) -> Result<Vec<Post>, RepoError>;

    /// Insert `post` and append its id to the creator's owned-posts list.
    async fn insert_for_creator(&self, post: Post) -> Result<Post, RepoError>;

    /// Delete `post` and remove its id from the creator's owned-posts list.
    async fn delete_for_creator(&self, post: &Post) -> Result<(), RepoError>;
}
