/**
 * Redis Broker
 *
 * Publishing goes through a multiplexed connection (cheap to clone, safe to
 * share). Subscribing needs a connection in pub/sub mode, so the subscriber
 * role opens its own connection from the same `redis::Client`.
 */

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use crate::backend::realtime::broker::{
    BrokerConnector, BrokerError, BrokerPublisher, BrokerSubscriber, MessageStream,
};

/// Connector for a `redis://` URL
#[derive(Debug, Clone)]
pub struct RedisBroker {
    client: Client,
}

impl RedisBroker {
    /// Parse the URL; no connection is made until a role is requested
    pub fn open(url: &str) -> Result<Self, BrokerError> {
        let client = Client::open(url).map_err(|e| BrokerError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BrokerConnector for RedisBroker {
    async fn connect_publisher(&self) -> Result<Box<dyn BrokerPublisher>, BrokerError> {
        let connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        tracing::info!(target: "realtime", "[Realtime] Redis publish client connected");
        Ok(Box::new(RedisPublisher { connection }))
    }

    async fn connect_subscriber(&self) -> Result<Box<dyn BrokerSubscriber>, BrokerError> {
        let pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        tracing::info!(target: "realtime", "[Realtime] Redis subscribe client connected");
        Ok(Box::new(RedisSubscriber { pubsub }))
    }
}

struct RedisPublisher {
    connection: MultiplexedConnection,
}

#[async_trait]
impl BrokerPublisher for RedisPublisher {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        let mut connection = self.connection.clone();
        let _receivers: i64 = connection
            .publish(channel, payload)
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;
        Ok(())
    }
}

struct RedisSubscriber {
    pubsub: redis::aio::PubSub,
}

#[async_trait]
impl BrokerSubscriber for RedisSubscriber {
    async fn subscribe(self: Box<Self>, channel: &str) -> Result<MessageStream, BrokerError> {
        let mut pubsub = self.pubsub;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;
        let messages = pubsub
            .into_on_message()
            .map(|message| message.get_payload_bytes().to_vec());
        Ok(messages.boxed())
    }
}
