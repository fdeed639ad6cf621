/**
 * Socket Endpoint
 *
 * `GET /socket` upgrades to a WebSocket carrying JSON `RealtimeEvent`
 * frames in both directions.
 *
 * # Admission
 *
 * - **503** while no real-time transport is attached (startup, or the broker
 *   could not be reached)
 * - **405** for a method outside the configured realtime methods
 * - **403** when the request `Origin` is not the configured client origin
 * - otherwise the upgrade proceeds; upgrade rejections keep their status
 *
 * # Session lifecycle
 *
 * 1. register with the instance's `SessionRegistry`
 * 2. `on_connect` hook
 * 3. writer task drains the outbound queue; the read loop feeds `on_event`
 * 4. on close or read error: unregister, `on_disconnect`, stop the writer
 */

use std::sync::Arc;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header::ORIGIN, HeaderMap, Method},
    response::Response,
    routing::any,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use crate::backend::error::{AppError, DomainError};
use crate::backend::realtime::adapter::{RealtimeServer, RealtimeSlot};
use crate::backend::realtime::connection::SocketContext;
use crate::backend::server::state::AppState;
use crate::shared::RealtimeEvent;

pub const SOCKET_PATH: &str = "/socket";

/// Socket route, mounted by the orchestrator next to the application routes
///
/// Every method reaches the handler, which admits the configured set.
pub fn socket_routes() -> Router<AppState> {
    Router::new().route(SOCKET_PATH, any(socket_upgrade))
}

/// Handle a socket upgrade request
pub async fn socket_upgrade(
    State(slot): State<RealtimeSlot>,
    method: Method,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let server = slot
        .get()
        .ok_or_else(|| DomainError::service_unavailable("Real-time transport is not available"))?;

    if !server.permits_method(&method) {
        return Err(DomainError::rejected(
            axum::http::StatusCode::METHOD_NOT_ALLOWED,
            format!("Method {} not allowed", method),
        )
        .into());
    }

    if !server.permits_origin(headers.get(ORIGIN)) {
        tracing::warn!(target: "realtime", "[Realtime] Rejected socket from origin {:?}", headers.get(ORIGIN));
        return Err(DomainError::forbidden("Origin not allowed").into());
    }

    let upgrade = upgrade
        .map_err(|rejection| DomainError::rejected(rejection.status(), rejection.body_text()))?;

    Ok(upgrade.on_upgrade(move |socket| serve_session(server, socket)))
}

async fn serve_session(server: Arc<RealtimeServer>, socket: WebSocket) {
    let (session_id, mut outbound) = server.sessions().register().await;
    let context = SocketContext::new(session_id, Arc::clone(&server));
    let handler = server.handler();
    tracing::info!(target: "realtime", "[Realtime] Session {} connected", session_id);

    let (mut sink, mut stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame.as_str().into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    handler.on_connect(&context).await;

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<RealtimeEvent>(text.as_str()) {
                Ok(event) => handler.on_event(&context, event).await,
                Err(e) => {
                    tracing::warn!(target: "realtime", "[Realtime] Session {} sent an invalid frame: {}", session_id, e);
                }
            },
            Ok(Message::Close(_)) => break,
            // Ping/pong is answered by the transport; binary frames are not part of the protocol
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(target: "realtime", "[Realtime] Session {} read error: {}", session_id, e);
                break;
            }
        }
    }

    server.sessions().unregister(session_id).await;
    handler.on_disconnect(&context).await;
    writer.abort();
    tracing::info!(target: "realtime", "[Realtime] Session {} disconnected", session_id);
}
