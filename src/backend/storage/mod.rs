//! Storage Module
//!
//! Keeps the persistent-storage connection alive for the whole process.
//!
//! - **`supervisor`** - connection state machine, `StorageHandle`, connector trait
//! - **`policy`** - reconnect pacing (`AlwaysRetry`, `ExponentialBackoff`)
//! - **`postgres`** - the `PgPool` connector with a liveness probe
//!
//! The supervisor runs on its own task, independent of the HTTP server:
//!
//! ```rust,no_run
//! use chatty::backend::storage::{PgConnector, StorageSupervisor};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let supervisor = StorageSupervisor::new(PgConnector::new(
//!     "postgres://localhost/chatty",
//!     Duration::from_secs(5),
//! ));
//! let handle = supervisor.handle();
//! tokio::spawn(supervisor.run());
//! let pool = handle.connected().await;
//! # }
//! ```

pub mod policy;
pub mod postgres;
pub mod supervisor;

pub use policy::{AlwaysRetry, ExponentialBackoff, ReconnectPolicy};
pub use postgres::PgConnector;
pub use supervisor::{ConnectionState, StorageConnector, StorageError, StorageHandle, StorageSupervisor};
