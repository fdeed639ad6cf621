/**
 * Session Registry and Local Broadcasting
 *
 * Every connected socket session owns an unbounded outbound queue. The
 * registry keeps the sending halves keyed by session id, so a broadcast is
 * one serialization followed by a queue push per session.
 *
 * # Delivery
 *
 * Queues are unbounded: a slow client never causes an event to be dropped
 * for it. Each session's writer task drains its queue in order, so every
 * session observes broadcasts in the order they were pushed.
 *
 * Sessions whose queue has closed (the writer task ended) are pruned the
 * next time a broadcast reaches them.
 */

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;
use crate::shared::RealtimeEvent;

/// Identifier of one connected socket session
pub type SessionId = Uuid;

/// A serialized event frame, shared by every session it is sent to
pub type Frame = Arc<String>;

/// Connected sessions of one server instance
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, mpsc::UnboundedSender<Frame>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and return its outbound queue
    pub async fn register(&self) -> (SessionId, mpsc::UnboundedReceiver<Frame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(id, sender);
        tracing::debug!(target: "realtime", "[Realtime] Session {} registered", id);
        (id, receiver)
    }

    pub async fn unregister(&self, id: SessionId) {
        if self.sessions.write().await.remove(&id).is_some() {
            tracing::debug!(target: "realtime", "[Realtime] Session {} unregistered", id);
        }
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Queue an event for one session
    pub async fn send_to(&self, id: SessionId, event: &RealtimeEvent) -> bool {
        let frame = match event.to_frame() {
            Ok(frame) => Arc::new(frame),
            Err(e) => {
                tracing::error!(target: "realtime", "[Realtime] Failed to encode event '{}': {}", event.event, e);
                return false;
            }
        };
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .map(|sender| sender.send(frame).is_ok())
            .unwrap_or(false)
    }

    /// Queue an event for every session
    ///
    /// # Returns
    ///
    /// Number of sessions the event was queued for (0 if none are connected)
    pub async fn broadcast(&self, event: &RealtimeEvent) -> usize {
        let frame = match event.to_frame() {
            Ok(frame) => Arc::new(frame),
            Err(e) => {
                tracing::error!(target: "realtime", "[Realtime] Failed to encode event '{}': {}", event.event, e);
                return 0;
            }
        };

        let mut closed = Vec::new();
        let mut delivered = 0;
        {
            let sessions = self.sessions.read().await;
            for (id, sender) in sessions.iter() {
                if sender.send(Arc::clone(&frame)).is_ok() {
                    delivered += 1;
                } else {
                    closed.push(*id);
                }
            }
        }

        if !closed.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in closed {
                sessions.remove(&id);
            }
        }

        if delivered == 0 {
            tracing::debug!(target: "realtime", "[Realtime] No sessions to receive '{}'", event.event);
        } else {
            tracing::debug!(target: "realtime", "[Realtime] Event '{}' queued for {} sessions", event.event, delivered);
        }
        delivered
    }
}
