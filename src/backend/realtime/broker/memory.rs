//! In-process broker backed by a `tokio::sync::broadcast` bus.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use crate::backend::realtime::broker::{
    BrokerConnector, BrokerError, BrokerPublisher, BrokerSubscriber, MessageStream,
};

const BUS_CAPACITY: usize = 1024;

type Envelope = (String, Vec<u8>);

/// Shared bus; clones publish to and subscribe from the same bus
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    bus: broadcast::Sender<Envelope>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        let (bus, _) = broadcast::channel(BUS_CAPACITY);
        Self { bus }
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerConnector for MemoryBroker {
    async fn connect_publisher(&self) -> Result<Box<dyn BrokerPublisher>, BrokerError> {
        Ok(Box::new(MemoryPublisher {
            bus: self.bus.clone(),
        }))
    }

    async fn connect_subscriber(&self) -> Result<Box<dyn BrokerSubscriber>, BrokerError> {
        // Subscribe now so nothing published after connect is missed
        Ok(Box::new(MemorySubscriber {
            receiver: self.bus.subscribe(),
        }))
    }
}

struct MemoryPublisher {
    bus: broadcast::Sender<Envelope>,
}

#[async_trait]
impl BrokerPublisher for MemoryPublisher {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        // No subscribers is not an error
        let _ = self.bus.send((channel.to_string(), payload));
        Ok(())
    }
}

struct MemorySubscriber {
    receiver: broadcast::Receiver<Envelope>,
}

#[async_trait]
impl BrokerSubscriber for MemorySubscriber {
    async fn subscribe(self: Box<Self>, channel: &str) -> Result<MessageStream, BrokerError> {
        let channel = channel.to_string();
        let messages = BroadcastStream::new(self.receiver).filter_map(move |item| {
            let wanted = match item {
                Ok((published_on, payload)) if published_on == channel => Some(payload),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "realtime", "[Realtime] Memory broker lagged, skipped {} messages", skipped);
                    None
                }
            };
            async move { wanted }
        });
        Ok(messages.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_subscriber_receives_only_its_channel() {
        let broker = MemoryBroker::new();
        let publisher = broker.connect_publisher().await.unwrap();
        let subscriber = broker.connect_subscriber().await.unwrap();
        let mut messages = subscriber.subscribe("room").await.unwrap();

        publisher.publish("elsewhere", b"skip".to_vec()).await.unwrap();
        publisher.publish("room", b"hello".to_vec()).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), messages.next())
            .await
            .unwrap();
        assert_eq!(received, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let broker = MemoryBroker::new();
        let publisher = broker.connect_publisher().await.unwrap();
        assert!(publisher.publish("room", b"nobody".to_vec()).await.is_ok());
    }

    #[tokio::test]
    async fn test_order_preserved_per_publisher() {
        let broker = MemoryBroker::new();
        let publisher = broker.connect_publisher().await.unwrap();
        let mut messages = broker
            .connect_subscriber()
            .await
            .unwrap()
            .subscribe("room")
            .await
            .unwrap();

        for n in 0..10u8 {
            publisher.publish("room", vec![n]).await.unwrap();
        }
        for n in 0..10u8 {
            assert_eq!(messages.next().await, Some(vec![n]));
        }
    }
}
