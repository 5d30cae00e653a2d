//! In-process post notifier.
//!
//! Fans events out to every subscriber within a single process. Used when
//! the Socket.IO transport is disabled and in tests.

use tokio::sync::broadcast;

use quill_core::ports::{POSTS_CHANNEL, PostEvent, PostNotifier};

/// Broadcast-channel backed notifier.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<PostEvent>,
}

impl BroadcastNotifier {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self { sender }
    }

    /// Receive every event broadcast after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PostEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PostNotifier for BroadcastNotifier {
    fn broadcast(&self, event: &PostEvent) {
        match self.sender.send(event.clone()) {
            Ok(listeners) => tracing::debug!(
                channel = POSTS_CHANNEL,
                action = event.action(),
                post_id = %event.post_id(),
                listeners,
                "Post event published"
            ),
            // No subscribers: the event is dropped.
            Err(_) => tracing::debug!(
                channel = POSTS_CHANNEL,
                action = event.action(),
                "No listeners for post event"
            ),
        }
    }
}
