//! Route Configuration Module
//!
//! This module configures the HTTP routes the server always provides.
//! Business routes are supplied by the embedding application through
//! `ChattyServer::with_routes` and merged here.
//!
//! # Architecture
//!
//! - **`router`** - router assembly
//! - **`health`** - `GET /health`
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Router assembly
//! └── health.rs       - Health check handler
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use chatty::backend::routes::create_router;
//! use chatty::backend::server::state::AppState;
//!
//! let extra: Router<AppState> = Router::new().route("/ping", get(|| async { "pong" }));
//! let routes = create_router(extra);
//! ```

/// Router assembly
pub mod router;

/// Health check route
pub mod health;

pub use health::HealthResponse;
pub use router::{application_routes, create_router};
