//! Chatty - Server Bootstrap and Real-time Fan-out
//!
//! Chatty is the bootstrap layer of a chat backend built with Rust: it
//! brings up the HTTP server behind an ordered middleware pipeline, keeps the
//! database connection supervised, and fans real-time events out to every
//! connected WebSocket session across all server instances through a
//! publish/subscribe broker.
//!
//! # Module Structure
//!
//! - **`shared`** - wire types shared with clients
//!   - real-time event frames
//!   - error response bodies
//!
//! - **`backend`** - server-side code
//!   - configuration, middleware, error sink
//!   - storage supervisor
//!   - real-time transport and broker adapters
//!   - upload provider
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chatty::backend::server::{AppState, ChattyServer, Config};
//! use chatty::backend::storage::{PgConnector, StorageSupervisor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Config::from_env()?);
//! let supervisor = StorageSupervisor::new(PgConnector::new(
//!     config.database_url.clone(),
//!     config.storage_probe_interval,
//! ));
//! let state = AppState::new(Arc::clone(&config), supervisor.handle());
//! tokio::spawn(supervisor.run());
//!
//! let server = ChattyServer::new(state).start().await?;
//! server.wait().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - `Result<T, E>` with `thiserror` enums per component
//! - `backend::error::DomainError` for errors shown to clients
//! - `backend::error::AppError` for everything a handler can fail with

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
pub mod backend;
