//! Realtime post events over Socket.IO, using socketioxide.
//!
//! The Socket.IO endpoint runs on its own hyper server next to the actix
//! HTTP server. Clients only listen; every post change is emitted as a
//! `posts` event to the default namespace.

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use socketioxide::{SocketIo, extract::SocketRef};
use tokio::net::TcpListener;

use quill_core::ports::{POSTS_CHANNEL, PostEvent, PostNotifier};
use quill_shared::dto::{PostEventBody, PostEventPayload};

use crate::handlers::post_response;

/// Post notifier emitting to every connected Socket.IO client.
#[derive(Clone)]
pub struct SocketIoNotifier {
    io: SocketIo,
}

impl SocketIoNotifier {
    pub fn new(io: SocketIo) -> Self {
        Self { io }
    }
}

impl PostNotifier for SocketIoNotifier {
    fn broadcast(&self, event: &PostEvent) {
        let payload = event_payload(event);

        let Some(operators) = self.io.of("/") else {
            tracing::warn!("Default namespace missing - post event dropped");
            return;
        };

        match operators.emit(POSTS_CHANNEL, &payload) {
            Ok(()) => tracing::debug!(
                action = event.action(),
                post_id = %event.post_id(),
                "Post event emitted"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                action = event.action(),
                post_id = %event.post_id(),
                "Failed to emit post event"
            ),
        }
    }
}

/// Wire form of a post event.
pub fn event_payload(event: &PostEvent) -> PostEventPayload {
    let post = match event {
        PostEvent::Created(view) | PostEvent::Updated(view) => {
            PostEventBody::Post(Box::new(post_response(view.clone())))
        }
        PostEvent::Deleted(id) => PostEventBody::Id(*id),
    };

    PostEventPayload {
        action: event.action().to_string(),
        post,
    }
}

/// Start the Socket.IO server on `listener` and return its notifier.
///
/// Each accepted connection is served on its own task; the accept loop
/// runs until the process exits.
pub fn spawn(listener: TcpListener) -> SocketIoNotifier {
    let (svc, io) = SocketIo::new_svc();
    io.ns("/", on_connect);

    tokio::spawn(async move {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "Socket.IO accept failed");
                    continue;
                }
            };

            let svc = svc.clone();
            tokio::spawn(async move {
                let conn = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), svc)
                    .with_upgrades();
                if let Err(e) = conn.await {
                    tracing::debug!(%peer, error = %e, "Socket.IO connection ended with error");
                }
            });
        }
    });

    SocketIoNotifier::new(io)
}

fn on_connect(socket: SocketRef) {
    tracing::info!(socket_id = %socket.id, "Client connected");

    socket.on_disconnect(|socket: SocketRef| {
        tracing::info!(socket_id = %socket.id, "Client disconnected");
    });
}
