/**
 * Storage Connection Supervisor
 *
 * Owns the lifecycle of the single persistent-storage connection.
 *
 * # State Machine
 *
 * ```text
 * Disconnected -> Connecting -> Connected -> (drop) -> Disconnected -> Connecting -> ...
 * ```
 *
 * The first connection attempt is fatal: if it fails, `run` returns the
 * error and the binary exits. After the first success every "disconnected"
 * event from the connector triggers a new attempt, paced by the configured
 * `ReconnectPolicy`. Only one attempt is ever in flight because a single task
 * drives the whole loop.
 *
 * # Sharing
 *
 * The supervisor is the only writer. Readers hold a `StorageHandle`, which is
 * a pair of `watch` receivers: cloning it is cheap and reading never blocks
 * the supervisor.
 */

use std::sync::Arc;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use crate::backend::storage::policy::{AlwaysRetry, ReconnectPolicy};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("reconnect policy gave up after {attempts} attempts")]
    GaveUp { attempts: u32 },
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

/// Opens connections and reports when one is lost
#[async_trait]
pub trait StorageConnector: Send + Sync + 'static {
    type Connection: Clone + Send + Sync + 'static;

    /// Open a new connection using the configured address
    async fn connect(&self) -> Result<Self::Connection, StorageError>;

    /// Resolve once `connection` has been lost
    async fn disconnected(&self, connection: &Self::Connection);
}

/// Read side of the supervised connection
#[derive(Debug, Clone)]
pub struct StorageHandle<T> {
    state: watch::Receiver<ConnectionState>,
    connection: watch::Receiver<Option<T>>,
}

impl<T: Clone> StorageHandle<T> {
    /// A handle that is permanently disconnected
    ///
    /// Useful for running the HTTP surface without storage, e.g. in tests.
    pub fn detached() -> Self {
        let (_, state) = watch::channel(ConnectionState::Disconnected);
        let (_, connection) = watch::channel(None);
        Self { state, connection }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// The current connection, if connected
    pub fn get(&self) -> Option<T> {
        self.connection.borrow().clone()
    }

    /// Wait until the supervisor reports `Connected`
    ///
    /// Returns `None` if the supervisor has gone away.
    pub async fn connected(&self) -> Option<T> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| *s == ConnectionState::Connected)
            .await
            .ok()?;
        self.get()
    }
}

/// Drives connect / reconnect for one connector
pub struct StorageSupervisor<C: StorageConnector> {
    connector: Arc<C>,
    policy: Arc<dyn ReconnectPolicy>,
    state: watch::Sender<ConnectionState>,
    connection: watch::Sender<Option<C::Connection>>,
}

impl<C: StorageConnector> StorageSupervisor<C> {
    /// Supervisor with the default `AlwaysRetry` policy
    pub fn new(connector: C) -> Self {
        Self::with_policy(connector, AlwaysRetry)
    }

    pub fn with_policy(connector: C, policy: impl ReconnectPolicy + 'static) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (connection, _) = watch::channel(None);
        Self {
            connector: Arc::new(connector),
            policy: Arc::new(policy),
            state,
            connection,
        }
    }

    pub fn handle(&self) -> StorageHandle<C::Connection> {
        StorageHandle {
            state: self.state.subscribe(),
            connection: self.connection.subscribe(),
        }
    }

    /// Make one connection attempt and publish the outcome
    pub async fn connect(&self) -> Result<C::Connection, StorageError> {
        self.state.send_replace(ConnectionState::Connecting);
        match self.connector.connect().await {
            Ok(connection) => {
                self.connection.send_replace(Some(connection.clone()));
                self.state.send_replace(ConnectionState::Connected);
                tracing::info!(target: "storage", "[Storage] DB connected");
                Ok(connection)
            }
            Err(e) => {
                self.connection.send_replace(None);
                self.state.send_replace(ConnectionState::Disconnected);
                tracing::error!(target: "storage", "[Storage] Failed to connect DB: {}", e);
                Err(e)
            }
        }
    }

    /// Connect, then keep the connection alive for the life of the process
    ///
    /// Returns an error immediately if the first attempt fails. Afterwards it
    /// only returns if the reconnect policy gives up.
    pub async fn run(self) -> Result<(), StorageError> {
        let mut connection = self.connect().await?;
        loop {
            self.connector.disconnected(&connection).await;
            self.connection.send_replace(None);
            self.state.send_replace(ConnectionState::Disconnected);
            tracing::warn!(target: "storage", "[Storage] DB disconnected, reconnecting");
            connection = self.reconnect().await?;
        }
    }

    async fn reconnect(&self) -> Result<C::Connection, StorageError> {
        let mut attempt = 0u32;
        loop {
            attempt = attempt.saturating_add(1);
            let Some(delay) = self.policy.next_delay(attempt) else {
                let attempts = attempt - 1;
                tracing::error!(
                    target: "storage",
                    attempts,
                    "[Storage] Reconnect policy gave up, storage stays disconnected"
                );
                return Err(StorageError::GaveUp { attempts });
            };
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            tracing::debug!(target: "storage", attempt, "[Storage] Reconnect attempt");
            if let Ok(connection) = self.connect().await {
                return Ok(connection);
            }
        }
    }
}
