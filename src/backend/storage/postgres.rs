/**
 * PostgreSQL Connector
 *
 * Opens the process-wide `PgPool` and watches it for loss. A pool has no
 * "disconnected" event of its own, so liveness is probed on a fixed
 * interval with `SELECT 1`; the first failed probe closes the pool and
 * reports the disconnect to the supervisor.
 */

use std::time::Duration;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use crate::backend::storage::supervisor::{StorageConnector, StorageError};

/// Connector for a single PostgreSQL database URL
#[derive(Debug, Clone)]
pub struct PgConnector {
    database_url: String,
    probe_interval: Duration,
    max_connections: u32,
}

impl PgConnector {
    pub fn new(database_url: impl Into<String>, probe_interval: Duration) -> Self {
        Self {
            database_url: database_url.into(),
            probe_interval,
            max_connections: 10,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

#[async_trait]
impl StorageConnector for PgConnector {
    type Connection = PgPool;

    async fn connect(&self) -> Result<PgPool, StorageError> {
        tracing::info!(target: "storage", "[Storage] Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&self.database_url)
            .await?;
        Ok(pool)
    }

    async fn disconnected(&self, pool: &PgPool) {
        let mut interval = tokio::time::interval(self.probe_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
                tracing::warn!(target: "storage", "[Storage] Liveness probe failed: {:?}", e);
                pool.close().await;
                return;
            }
        }
    }
}
