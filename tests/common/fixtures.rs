//! Server fixtures
//!
//! Builds a valid configuration that needs no external services and starts
//! servers on ephemeral ports. Servers started with the same `MemoryBroker`
//! behave like instances sharing one Redis.

use std::sync::Arc;
use std::time::Duration;
use chatty::backend::realtime::broker::{BrokerConnector, MemoryBroker};
use chatty::backend::realtime::ConnectionHandler;
use chatty::backend::server::{AppState, ChattyServer, Config, RunningServer};
use chatty::backend::storage::StorageHandle;

pub const CLIENT_URL: &str = "http://localhost:3000";

/// Configuration for a test instance
pub fn test_config() -> Config {
    Config::builder()
        .database_url("postgres://localhost/chatty_test")
        .broker_url("memory://")
        .client_url(CLIENT_URL)
        .session_keys(
            "integration-primary-secret-0123456789",
            "integration-secondary-secret-0123456789",
        )
        .server_port(0)
        .build()
        .expect("test configuration is valid")
}

/// State with no database attached
pub fn test_state() -> AppState {
    AppState::new(Arc::new(test_config()), StorageHandle::detached())
}

/// Start one instance on the given broker
pub async fn start_instance(
    broker: Arc<dyn BrokerConnector>,
    handler: Arc<dyn ConnectionHandler>,
) -> RunningServer {
    ChattyServer::new(test_state())
        .with_broker(broker)
        .with_connection_handler(handler)
        .start()
        .await
        .expect("server starts")
}

/// Start `count` instances sharing one in-process broker
pub async fn start_cluster(count: usize, handler: Arc<dyn ConnectionHandler>) -> Vec<RunningServer> {
    let broker: Arc<dyn BrokerConnector> = Arc::new(MemoryBroker::new());
    let mut servers = Vec::with_capacity(count);
    for _ in 0..count {
        servers.push(start_instance(Arc::clone(&broker), Arc::clone(&handler)).await);
    }
    servers
}

pub fn http_url(server: &RunningServer, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", server.local_addr().port(), path)
}

pub fn socket_url(server: &RunningServer) -> String {
    format!("ws://127.0.0.1:{}/socket", server.local_addr().port())
}

/// Wait until the instance has `expected` registered sessions
pub async fn wait_for_sessions(server: &RunningServer, expected: usize) {
    let realtime = server.realtime().expect("real-time transport attached");
    tokio::time::timeout(Duration::from_secs(5), async {
        while realtime.session_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("sessions registered in time");
}

pub async fn stop(server: RunningServer) {
    server.shutdown();
    let _ = server.wait().await;
}
