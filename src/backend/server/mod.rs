//! Server Module
//!
//! This module contains the server-side code that configures and starts the
//! Axum HTTP server and attaches the real-time transport to it.
//!
//! # Architecture
//!
//! - **`config`** - every recognized option, loaded and validated once
//! - **`state`** - `AppState` and its `FromRef` implementations
//! - **`init`** - `ChattyServer`, the ordered start sequence, `RunningServer`
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── config.rs       - Configuration loading and validation
//! ├── state.rs        - AppState and FromRef implementations
//! └── init.rs         - Server start sequence
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration**: `Config::from_env()` (fatal on error)
//! 2. **Storage**: the storage supervisor publishes a `StorageHandle`
//! 3. **Router**: middleware pipeline, routes, catch-all, error sink
//! 4. **Listen**: bind and serve
//! 5. **Real-time**: broker clients, then attach (non-fatal on error)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chatty::backend::server::{AppState, ChattyServer, Config};
//! use chatty::backend::storage::StorageHandle;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Config::from_env()?);
//! let state = AppState::new(config, StorageHandle::detached());
//! let server = ChattyServer::new(state).start().await?;
//! println!("listening on {}", server.local_addr());
//! server.wait().await?;
//! # Ok(())
//! # }
//! ```

/// Server configuration loading
pub mod config;

/// Application state management
pub mod state;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use init::{ChattyServer, RunningServer, ServerError};
pub use state::AppState;
