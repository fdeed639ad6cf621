//! Backend Module
//!
//! This module contains all server-side code for Chatty: the bootstrap of
//! the HTTP server and the real-time fan-out layer.
//!
//! # Overview
//!
//! The backend module includes:
//! - Axum HTTP server setup and the ordered start sequence
//! - The middleware pipeline that runs before every handler
//! - Structured error responses and the error reporting sink
//! - The supervised persistent-storage connection
//! - WebSocket sessions fanned out across instances through a broker
//! - The media upload pass-through
//!
//! # Architecture
//!
//! - **`server`** - configuration, application state, start sequence
//! - **`middleware`** - compression, body ceiling, session, parameter
//!   pollution, security headers, CORS
//! - **`error`** - domain errors, response conversion, error sink
//! - **`storage`** - connection supervisor and reconnect policies
//! - **`realtime`** - broker adapter, session registry, socket endpoint
//! - **`routes`** - built-in routes and router assembly
//! - **`upload`** - upload provider trait and Cloudinary implementation
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Binary entry point
//! ├── server/         - Configuration, state, start sequence
//! ├── middleware/     - Request processing stages
//! ├── error/          - Error types and reporting
//! ├── storage/        - Storage connection supervision
//! ├── realtime/       - Real-time transport
//! ├── routes/         - Route configuration
//! └── upload/         - Upload provider
//! ```
//!
//! # Ownership
//!
//! The long-lived collaborators are constructed once and injected:
//!
//! - the storage connection is written only by the `StorageSupervisor` and
//!   read through `StorageHandle`
//! - the real-time transport is created only by `ChattyServer::start` and
//!   read through `RealtimeSlot`
//!
//! # Logging
//!
//! Every component logs through `tracing` under its own target: `server`,
//! `storage`, `realtime`, `upload`, `errors`.

/// Server initialization and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Request processing middleware
pub mod middleware;

/// Error types and reporting
pub mod error;

/// Persistent-storage connection supervision
pub mod storage;

/// Real-time transport
pub mod realtime;

/// Media upload pass-through
pub mod upload;
