//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Auth
// =============================================================================

/// Request to create an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request to login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// Bearer token issued on login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Body for operations that only report an outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Feed
// =============================================================================

/// JSON body accepted by post updates.
///
/// `image` is the post's current image path when the client keeps it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostJsonRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator: CreatorResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsPageResponse {
    pub message: String,
    pub posts: Vec<PostResponse>,
    pub total_items: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub message: String,
    pub post: PostResponse,
    pub creator: CreatorResponse,
}

/// A single post with an outcome message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEnvelope {
    pub message: String,
    pub post: PostResponse,
}

// =============================================================================
// Realtime
// =============================================================================

/// Payload of the `posts` realtime event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEventPayload {
    pub action: String,
    pub post: PostEventBody,
}

/// Created and updated events carry the full post; deletions only the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostEventBody {
    Post(Box<PostResponse>),
    Id(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> PostResponse {
        let now = Utc::now();
        PostResponse {
            id: Uuid::nil(),
            title: "First post".to_string(),
            content: "Hello there".to_string(),
            image_url: "images/a.png".to_string(),
            creator: CreatorResponse {
                id: Uuid::nil(),
                name: "A".to_string(),
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_post_uses_client_field_names() {
        let json = serde_json::to_value(sample_post()).unwrap();

        assert!(json.get("_id").is_some());
        assert_eq!(json["imageUrl"], "images/a.png");
        assert_eq!(json["creator"]["name"], "A");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn test_delete_event_carries_bare_id() {
        let id = Uuid::new_v4();
        let payload = PostEventPayload {
            action: "delete".to_string(),
            post: PostEventBody::Id(id),
        };

        let json = serde_json::to_value(payload).unwrap();

        assert_eq!(json["action"], "delete");
        assert_eq!(json["post"], id.to_string());
    }

    #[test]
    fn test_post_json_request_image_is_optional() {
        let req: PostJsonRequest =
            serde_json::from_str(r#"{"title":"Hello","content":"World!"}"#).unwrap();

        assert!(req.image.is_none());
    }
}
