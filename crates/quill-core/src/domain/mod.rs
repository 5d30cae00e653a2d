//! Domain entities - the core business objects.

mod user;

mod post;

pub use post::{Creator, Post, PostPage, PostView};
pub use user::{DEFAULT_STATUS, User};
