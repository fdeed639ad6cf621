/**
 * Router Configuration
 *
 * This module assembles the application routes the orchestrator mounts
 * between the standard and the security middleware groups.
 *
 * # Route Order
 *
 * 1. Built-in routes (`/health`)
 * 2. Routes supplied by the embedding application
 *
 * The socket endpoint and the catch-all are not part of this router; the
 * orchestrator adds them so that they are present whatever routes the
 * application supplies.
 */

use axum::Router;
use crate::backend::routes::health::configure_health_routes;
use crate::backend::server::state::AppState;

/// Create the built-in application routes
///
/// # Routes
///
/// - `GET /health` - process and dependency status
pub fn application_routes() -> Router<AppState> {
    configure_health_routes(Router::new())
}

/// Built-in routes merged with routes supplied by the application
pub fn create_router(extra: Router<AppState>) -> Router<AppState> {
    application_routes().merge(extra)
}
