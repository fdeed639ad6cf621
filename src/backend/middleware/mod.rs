//! Middleware Module
//!
//! This module contains the request-processing stages that run before any
//! handler, and the `MiddlewarePipeline` that orders them.
//!
//! # Architecture
//!
//! - **`pipeline`** - `Stage` and `MiddlewarePipeline`, plus the CORS layer
//! - **`session`** - signed session cookies with two rotating keys
//! - **`hpp`** - HTTP parameter pollution guard
//! - **`security`** - hardening response headers
//! - **`body`** - `JsonBody` / `FormBody` extractors that report rejections
//!   as domain errors
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::Router;
//! use chatty::backend::middleware::MiddlewarePipeline;
//! use chatty::backend::server::config::Config;
//!
//! # fn example(config: Config, routes: Router) -> Result<Router, Box<dyn std::error::Error>> {
//! let pipeline = MiddlewarePipeline::standard(&config.middleware)?
//!     .then(MiddlewarePipeline::security(&config.middleware));
//! let app = pipeline.apply(routes);
//! # Ok(app)
//! # }
//! ```

pub mod body;
pub mod hpp;
pub mod pipeline;
pub mod security;
pub mod session;

pub use body::{FormBody, JsonBody};
pub use hpp::{PollutedParameters, PollutionGuard};
pub use pipeline::{cors_layer, MiddlewarePipeline, Stage};
pub use security::security_headers;
pub use session::{Session, SessionSettings};
