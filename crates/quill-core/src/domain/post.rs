use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post entity - a blog post with an attached image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub content: String,
    /// Public path of the stored image, e.g. `images/2026-01-01T10-00-00Z_cat.png`.
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post.
    pub fn new(creator_id: Uuid, title: String, content: String, image_url: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            creator_id,
            title,
            content,
            image_url,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_created_by(&self, user_id: Uuid) -> bool {
        self.creator_id == user_id
    }
}

/// Minimal public view of a post's author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub id: Uuid,
    pub name: String,
}

/// A post together with its creator summary, as returned by the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub post: Post,
    pub creator: Creator,
}

/// One page of the feed.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<PostView>,
    pub total_items: u64,
}
