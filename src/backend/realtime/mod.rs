//! Real-time Module
//!
//! Server-to-client push over WebSockets, fanned out across server instances
//! through a publish/subscribe broker.
//!
//! # Architecture
//!
//! - **`broker`** - publisher/subscriber roles (`redis`, `memory`)
//! - **`broadcast`** - `SessionRegistry`, the local sessions of one instance
//! - **`adapter`** - `RealtimeServer`, local delivery plus broker relay, and
//!   the `RealtimeSlot` it is attached through
//! - **`connection`** - `ConnectionHandler` hooks and `SocketContext`
//! - **`socket`** - the `GET /socket` upgrade endpoint and session loop
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs          - Module exports and documentation
//! ├── adapter.rs      - Broker-backed real-time server
//! ├── broadcast.rs    - Session registry
//! ├── connection.rs   - Connection handler hooks
//! ├── socket.rs       - WebSocket endpoint
//! └── broker/         - Broker implementations
//! ```
//!
//! # Lifecycle
//!
//! The transport is created only after the HTTP listener is up. Until it is
//! attached, `/socket` answers 503 and the rest of the server works
//! normally. If the broker cannot be reached the failure is logged and the
//! slot stays empty.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatty::backend::realtime::{broker::MemoryBroker, RealtimeServer};
//! use chatty::backend::server::config::Config;
//! use chatty::shared::RealtimeEvent;
//!
//! # async fn example(config: Config) -> Result<(), Box<dyn std::error::Error>> {
//! let server = RealtimeServer::create(&config.realtime, &MemoryBroker::new()).await?;
//! let event = RealtimeEvent::notification("Title".to_string(), "Body".to_string());
//! server.broadcast(event).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod broadcast;
pub mod broker;
pub mod connection;
pub mod socket;

pub use adapter::{RealtimeError, RealtimeServer, RealtimeSlot};
pub use broadcast::{SessionId, SessionRegistry};
pub use connection::{ConnectionHandler, NoopHandler, RelayHandler, SocketContext};
pub use socket::{socket_routes, SOCKET_PATH};
