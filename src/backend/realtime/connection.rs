/**
 * Connection Handlers
 *
 * Application code plugs per-connection behaviour into the transport by
 * implementing `ConnectionHandler`. Every hook has an empty default, so a
 * handler only overrides what it needs.
 *
 * The `SocketContext` passed to each hook identifies the session and lets
 * the handler reply to it or broadcast to every session on every instance.
 */

use std::sync::Arc;
use async_trait::async_trait;
use crate::backend::realtime::adapter::{RealtimeError, RealtimeServer};
use crate::backend::realtime::broadcast::SessionId;
use crate::shared::RealtimeEvent;

/// One connected session as seen by a handler
#[derive(Clone)]
pub struct SocketContext {
    session_id: SessionId,
    server: Arc<RealtimeServer>,
}

impl SocketContext {
    pub(crate) fn new(session_id: SessionId, server: Arc<RealtimeServer>) -> Self {
        Self { session_id, server }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn server(&self) -> &Arc<RealtimeServer> {
        &self.server
    }

    /// Send an event to this session only
    pub async fn emit(&self, event: RealtimeEvent) -> bool {
        self.server.sessions().send_to(self.session_id, &event).await
    }

    /// Send an event to every session on every instance
    pub async fn broadcast(&self, event: RealtimeEvent) -> Result<usize, RealtimeError> {
        self.server.broadcast(event).await
    }
}

/// Per-connection event hooks
#[async_trait]
pub trait ConnectionHandler: Send + Sync {
    async fn on_connect(&self, _socket: &SocketContext) {}

    async fn on_event(&self, _socket: &SocketContext, _event: RealtimeEvent) {}

    async fn on_disconnect(&self, _socket: &SocketContext) {}
}

/// Accepts connections and ignores their events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl ConnectionHandler for NoopHandler {}

/// Rebroadcasts every received event to all sessions
#[derive(Debug, Default, Clone, Copy)]
pub struct RelayHandler;

#[async_trait]
impl ConnectionHandler for RelayHandler {
    async fn on_event(&self, socket: &SocketContext, event: RealtimeEvent) {
        if let Err(e) = socket.broadcast(event).await {
            tracing::error!(target: "realtime", "[Realtime] Relay from session {} failed: {}", socket.session_id(), e);
        }
    }
}
