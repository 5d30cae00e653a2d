//! Post change notification port.

use uuid::Uuid;

use crate::domain::PostView;

/// Realtime channel every post event is published on.
pub const POSTS_CHANNEL: &str = "posts";

/// A change to the feed, fanned out to connected listeners.
#[derive(Debug, Clone)]
pub enum PostEvent {
    Created(PostView),
    Updated(PostView),
    Deleted(Uuid),
}

impl PostEvent {
    /// Action name as seen by listeners.
    pub fn action(&self) -> &'static str {
        match self {
            PostEvent::Created(_) => "create",
            PostEvent::Updated(_) => "update",
            PostEvent::Deleted(_) => "delete",
        }
    }

    pub fn post_id(&self) -> Uuid {
        match self {
            PostEvent::Created(view) | PostEvent::Updated(view) => view.post.id,
            PostEvent::Deleted(id) => *id,
        }
    }
}

/// Broadcasts post events to every connected listener.
///
/// Delivery is at-most-once and fire-and-forget: implementations log
/// failures and never report them to the caller.
pub trait PostNotifier: Send + Sync {
    fn broadcast(&self, event: &PostEvent);
}
