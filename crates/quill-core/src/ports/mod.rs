//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod notify;
mod repository;
mod storage;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use notify::{POSTS_CHANNEL, PostEvent, PostNotifier};
pub use repository::{BaseRepository, PostRepository, UserRepository};
pub use storage::{ACCEPTED_IMAGE_TYPES, ImageStore, ImageUpload, StorageError};
