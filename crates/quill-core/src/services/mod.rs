//! Application services - the use cases exposed by the API.

mod auth;
mod feed;

pub use auth::{AuthService, LoginOutcome, SignupInput};
pub use feed::{FeedService, ImageSource, POSTS_PER_PAGE, PostInput, normalize_page};
