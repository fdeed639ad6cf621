//! Broker Module
//!
//! The broker is the external publish/subscribe bus that carries broadcasts
//! between server instances. The adapter needs two roles from it:
//!
//! - a **publisher**, used for every local broadcast
//! - a **subscriber**, bound to one channel, streaming what other instances
//!   published
//!
//! Both roles are opened from the same `BrokerConnector`, so the subscriber
//! is always a duplicate of the publisher's configuration.
//!
//! # Implementations
//!
//! - **`redis`** - `redis://` URLs, one multiplexed connection for publishing
//!   and one dedicated pub/sub connection
//! - **`memory`** - `memory://`, an in-process bus for single-node runs and
//!   tests; instances sharing one `MemoryBroker` value see each other

use std::sync::Arc;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

pub mod memory;
pub mod redis;

pub use memory::MemoryBroker;
pub use self::redis::RedisBroker;

/// Raw payloads delivered on a subscribed channel
pub type MessageStream = BoxStream<'static, Vec<u8>>;

/// Broker errors
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid broker url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("broker publish failed: {0}")]
    Publish(String),

    #[error("broker subscribe failed: {0}")]
    Subscribe(String),
}

/// Publishing role
#[async_trait]
pub trait BrokerPublisher: Send + Sync {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), BrokerError>;
}

/// Subscribing role; consumed when bound to a channel
#[async_trait]
pub trait BrokerSubscriber: Send {
    async fn subscribe(self: Box<Self>, channel: &str) -> Result<MessageStream, BrokerError>;
}

/// Opens both roles from one configuration
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect_publisher(&self) -> Result<Box<dyn BrokerPublisher>, BrokerError>;
    async fn connect_subscriber(&self) -> Result<Box<dyn BrokerSubscriber>, BrokerError>;
}

/// Pick a connector from the broker URL scheme
pub fn connector_for(url: &str) -> Result<Arc<dyn BrokerConnector>, BrokerError> {
    if url.starts_with("memory://") {
        tracing::warn!(
            target: "realtime",
            "[Realtime] Using in-process broker; broadcasts will not leave this instance"
        );
        return Ok(Arc::new(MemoryBroker::new()));
    }
    Ok(Arc::new(RedisBroker::open(url)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_scheme() {
        assert!(connector_for("memory://").is_ok());
    }

    #[test]
    fn test_redis_scheme() {
        assert!(connector_for("redis://127.0.0.1:6379").is_ok());
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let result = connector_for("carrier-pigeon://coop");
        assert!(matches!(result, Err(BrokerError::InvalidUrl { .. })));
    }
}
