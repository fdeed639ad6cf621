/**
 * Health Route
 *
 * `GET /health` reports whether the process is serving and the state of its
 * two long-lived dependencies. It always answers 200 while the listener is
 * up; a degraded dependency shows in the body, not the status.
 */

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use crate::backend::server::state::AppState;

/// Health response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// `connected`, `connecting` or `disconnected`
    pub storage: String,
    /// Whether the real-time transport is attached
    pub realtime: bool,
}

/// Handle health check (GET /health)
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        storage: state.storage.state().as_str().to_string(),
        realtime: state.realtime.is_attached(),
    })
}

/// Add the health route to a router
pub fn configure_health_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/health", get(health))
}
