/**
 * Chatty Server Entry Point
 *
 * Loads configuration, starts the storage supervisor and the HTTP +
 * real-time server, and shuts down on Ctrl-C.
 *
 * Exits with a non-zero status if the configuration is invalid, the first
 * database connection fails, or the listener cannot be bound.
 */

use std::sync::Arc;
use chatty::backend::server::{AppState, ChattyServer, Config};
use chatty::backend::storage::{PgConnector, StorageError, StorageSupervisor};
use chatty::backend::upload::CloudinaryUploader;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(target: "server", "[Server] Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    match config.deployment {
        Some(mode) => tracing::info!(target: "server", "[Server] Starting in {:?} mode", mode),
        None => tracing::info!(target: "server", "[Server] Starting with NODE_ENV unset"),
    }

    let supervisor = StorageSupervisor::new(PgConnector::new(
        config.database_url.clone(),
        config.storage_probe_interval,
    ));
    let mut state = AppState::new(Arc::clone(&config), supervisor.handle());

    tokio::spawn(async move {
        match supervisor.run().await {
            Ok(()) => {}
            Err(StorageError::GaveUp { attempts }) => {
                tracing::error!(target: "storage", attempts, "[Storage] Giving up on the database");
            }
            Err(e) => {
                tracing::error!(target: "storage", "[Storage] Error connecting to database: {}", e);
                std::process::exit(1);
            }
        }
    });

    if let Some(cloudinary) = &config.cloudinary {
        state = state.with_uploader(Arc::new(CloudinaryUploader::new(cloudinary.clone())));
    }

    let server = match ChattyServer::new(state).start().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(target: "server", "[Server] {}", e);
            std::process::exit(1);
        }
    };

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!(target: "server", "[Server] Shutting down");
            server.shutdown();
        }
        Err(e) => {
            tracing::error!(target: "server", "[Server] Failed to listen for shutdown signal: {}", e);
        }
    }
    if let Err(e) = server.wait().await {
        tracing::error!(target: "server", "[Server] {}", e);
        std::process::exit(1);
    }
}
