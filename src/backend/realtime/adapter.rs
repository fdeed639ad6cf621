/**
 * Broker-backed Real-time Server
 *
 * `RealtimeServer` is the per-instance real-time transport. It owns the
 * local `SessionRegistry` plus a publisher and a subscriber on the broker,
 * so that one broadcast reaches every session on every instance.
 *
 * # Fan-out
 *
 * ```text
 *  broadcast(event)
 *     ├── local sessions        (queued directly)
 *     └── broker publish        {origin, event} on the shared channel
 *            └── other instances' relay task
 *                   └── their local sessions
 * ```
 *
 * Envelopes carry the publishing instance id. The relay task skips its own
 * envelopes, so a local session receives each broadcast exactly once.
 */

use std::sync::{Arc, OnceLock, RwLock};
use axum::http::{HeaderValue, Method};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;
use crate::backend::realtime::broadcast::SessionRegistry;
use crate::backend::realtime::broker::{BrokerConnector, BrokerError, BrokerPublisher, MessageStream};
use crate::backend::realtime::connection::{ConnectionHandler, NoopHandler};
use crate::backend::server::config::RealtimeConfig;
use crate::shared::RealtimeEvent;

/// Real-time transport errors
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("failed to encode broker envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What travels over the broker channel
#[derive(Debug, Serialize, Deserialize)]
struct BrokerEnvelope {
    origin: Uuid,
    event: RealtimeEvent,
}

/// Real-time transport of one server instance
pub struct RealtimeServer {
    instance_id: Uuid,
    channel: String,
    client_origin: String,
    methods: Vec<Method>,
    sessions: Arc<SessionRegistry>,
    publisher: Box<dyn BrokerPublisher>,
    handler: RwLock<Arc<dyn ConnectionHandler>>,
    relay: JoinHandle<()>,
}

impl RealtimeServer {
    /// Connect both broker roles concurrently and start relaying
    ///
    /// Fails if either role fails to connect or the channel cannot be
    /// subscribed.
    pub async fn create(
        config: &RealtimeConfig,
        connector: &dyn BrokerConnector,
    ) -> Result<Arc<Self>, RealtimeError> {
        tracing::info!(target: "realtime", "[Realtime] Connecting broker clients...");
        let (publisher, subscriber) = tokio::try_join!(
            connector.connect_publisher(),
            connector.connect_subscriber()
        )?;
        let messages = subscriber.subscribe(&config.channel).await?;

        let instance_id = Uuid::new_v4();
        let sessions = Arc::new(SessionRegistry::new());
        let relay = tokio::spawn(relay_remote_events(
            instance_id,
            messages,
            Arc::clone(&sessions),
        ));

        tracing::info!(
            target: "realtime",
            "[Realtime] Instance {} subscribed to '{}'",
            instance_id,
            config.channel
        );

        Ok(Arc::new(Self {
            instance_id,
            channel: config.channel.clone(),
            client_origin: config.client_origin.clone(),
            methods: config.methods.clone(),
            sessions,
            publisher,
            handler: RwLock::new(Arc::new(NoopHandler)),
            relay,
        }))
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.count().await
    }

    /// Install the per-connection handler used for new sessions
    pub fn on_connection(&self, handler: Arc<dyn ConnectionHandler>) {
        match self.handler.write() {
            Ok(mut current) => *current = handler,
            Err(poisoned) => *poisoned.into_inner() = handler,
        }
    }

    pub(crate) fn handler(&self) -> Arc<dyn ConnectionHandler> {
        match self.handler.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether a socket request from this origin may connect
    ///
    /// Requests without an `Origin` header come from non-browser clients and
    /// are accepted.
    pub fn permits_origin(&self, origin: Option<&HeaderValue>) -> bool {
        let allowed = self.client_origin.trim_end_matches('/');
        if allowed.is_empty() || allowed == "*" {
            return true;
        }
        match origin.map(|value| value.to_str()) {
            None => true,
            Some(Ok(origin)) => origin.trim_end_matches('/') == allowed,
            Some(Err(_)) => false,
        }
    }

    pub fn permits_method(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Deliver an event to local sessions and publish it for other instances
    ///
    /// # Returns
    ///
    /// Number of local sessions the event was queued for
    pub async fn broadcast(&self, event: RealtimeEvent) -> Result<usize, RealtimeError> {
        let payload = serde_json::to_vec(&BrokerEnvelope {
            origin: self.instance_id,
            event: event.clone(),
        })?;
        let delivered = self.sessions.broadcast(&event).await;
        self.publisher.publish(&self.channel, payload).await?;
        Ok(delivered)
    }
}

impl Drop for RealtimeServer {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

async fn relay_remote_events(
    instance_id: Uuid,
    mut messages: MessageStream,
    sessions: Arc<SessionRegistry>,
) {
    while let Some(payload) = messages.next().await {
        let envelope: BrokerEnvelope = match serde_json::from_slice(&payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(target: "realtime", "[Realtime] Dropping malformed broker message: {}", e);
                continue;
            }
        };
        if envelope.origin == instance_id {
            continue;
        }
        let delivered = sessions.broadcast(&envelope.event).await;
        tracing::debug!(
            target: "realtime",
            "[Realtime] Relayed '{}' from {} to {} sessions",
            envelope.event.event,
            envelope.origin,
            delivered
        );
    }
    tracing::warn!(target: "realtime", "[Realtime] Broker subscription ended");
}

/// The attach point between the HTTP server and its real-time transport
///
/// Empty until the transport has been created after the listener is up;
/// set at most once.
#[derive(Clone, Default)]
pub struct RealtimeSlot(Arc<OnceLock<Arc<RealtimeServer>>>);

impl RealtimeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the transport; returns false if one was already attached
    pub fn attach(&self, server: Arc<RealtimeServer>) -> bool {
        self.0.set(server).is_ok()
    }

    pub fn get(&self) -> Option<Arc<RealtimeServer>> {
        self.0.get().cloned()
    }

    pub fn is_attached(&self) -> bool {
        self.0.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::realtime::broker::{BrokerSubscriber, MemoryBroker};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    fn realtime_config() -> RealtimeConfig {
        RealtimeConfig {
            broker_url: "memory://".to_string(),
            client_origin: "http://localhost:3000".to_string(),
            methods: vec![Method::GET, Method::POST],
            channel: "chatty#/".to_string(),
        }
    }

    struct FailingBroker;

    #[async_trait]
    impl BrokerConnector for FailingBroker {
        async fn connect_publisher(&self) -> Result<Box<dyn BrokerPublisher>, BrokerError> {
            Err(BrokerError::Connection("connection refused".to_string()))
        }

        async fn connect_subscriber(&self) -> Result<Box<dyn BrokerSubscriber>, BrokerError> {
            Err(BrokerError::Connection("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_create_fails_when_broker_unreachable() {
        let result = RealtimeServer::create(&realtime_config(), &FailingBroker).await;
        assert!(matches!(result, Err(RealtimeError::Broker(BrokerError::Connection(_)))));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_instance_once() {
        let broker = MemoryBroker::new();
        let first = RealtimeServer::create(&realtime_config(), &broker).await.unwrap();
        let second = RealtimeServer::create(&realtime_config(), &broker).await.unwrap();

        let (_, mut on_first) = first.sessions().register().await;
        let (_, mut on_second) = second.sessions().register().await;

        let delivered = first
            .broadcast(RealtimeEvent::message(json!({"text": "hi"})))
            .await
            .unwrap();
        assert_eq!(delivered, 1);

        let local = tokio::time::timeout(Duration::from_secs(1), on_first.recv()).await.unwrap();
        let remote = tokio::time::timeout(Duration::from_secs(1), on_second.recv()).await.unwrap();
        assert!(local.unwrap().contains("hi"));
        assert!(remote.unwrap().contains("hi"));

        // Own envelopes come back over the broker and must be skipped
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(on_first.try_recv().is_err());
        assert!(on_second.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_order_across_instances() {
        let broker = MemoryBroker::new();
        let first = RealtimeServer::create(&realtime_config(), &broker).await.unwrap();
        let second = RealtimeServer::create(&realtime_config(), &broker).await.unwrap();
        let (_, mut on_second) = second.sessions().register().await;

        for n in 0..5 {
            first.broadcast(RealtimeEvent::message(json!({"n": n}))).await.unwrap();
        }
        for n in 0..5 {
            let frame = tokio::time::timeout(Duration::from_secs(1), on_second.recv())
                .await
                .unwrap()
                .unwrap();
            let event: RealtimeEvent = serde_json::from_str(&frame).unwrap();
            assert_eq!(event.payload["n"], n);
        }
    }

    #[tokio::test]
    async fn test_malformed_broker_message_is_skipped() {
        let broker = MemoryBroker::new();
        let server = RealtimeServer::create(&realtime_config(), &broker).await.unwrap();
        let (_, mut session) = server.sessions().register().await;

        let raw = broker.connect_publisher().await.unwrap();
        raw.publish("chatty#/", b"not json".to_vec()).await.unwrap();
        let envelope = serde_json::to_vec(&BrokerEnvelope {
            origin: Uuid::new_v4(),
            event: RealtimeEvent::message(json!({"text": "after"})),
        })
        .unwrap();
        raw.publish("chatty#/", envelope).await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(1), session.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(frame.contains("after"));
    }

    #[tokio::test]
    async fn test_origin_check() {
        let broker = MemoryBroker::new();
        let server = RealtimeServer::create(&realtime_config(), &broker).await.unwrap();

        let allowed = HeaderValue::from_static("http://localhost:3000");
        let denied = HeaderValue::from_static("http://evil.example");
        assert!(server.permits_origin(Some(&allowed)));
        assert!(!server.permits_origin(Some(&denied)));
        assert!(server.permits_origin(None));
    }

    #[tokio::test]
    async fn test_slot_attaches_once() {
        let broker = MemoryBroker::new();
        let slot = RealtimeSlot::new();
        assert!(slot.get().is_none());

        let server = RealtimeServer::create(&realtime_config(), &broker).await.unwrap();
        assert!(slot.attach(Arc::clone(&server)));
        assert!(slot.is_attached());

        let other = RealtimeServer::create(&realtime_config(), &broker).await.unwrap();
        assert!(!slot.attach(other));
        assert_eq!(slot.get().unwrap().instance_id(), server.instance_id());
    }
}
