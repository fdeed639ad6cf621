/**
 * Server Initialization
 *
 * `ChattyServer` assembles the HTTP application and brings it up together
 * with the real-time transport.
 *
 * # Start Sequence
 *
 * `start()` runs these steps strictly in order:
 *
 * 1. standard middleware (compression, body ceiling, session, parameter
 *    pollution)
 * 2. mount routes (application routes and the socket endpoint)
 * 3. security middleware (security headers, CORS)
 * 4. catch-all route and error reporting
 * 5. bind the listener and start serving
 * 6. create the real-time transport (broker publish + subscribe clients)
 * 7. install the connection handler and attach the transport
 *
 * Axum layers wrap the routes already present, so steps 1-4 are assembled
 * as a pipeline and applied to the routed application in one pass; the
 * observable order (stages 1-3 before any handler, the sink outermost) is
 * the one listed above.
 *
 * # Failure Handling
 *
 * - steps 1-5 fail `start()` with a `ServerError`
 * - a failure in step 6 is logged and swallowed: HTTP keeps serving and
 *   `/socket` answers 503
 */

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{middleware::from_fn, Router};
use thiserror::Error;
use tokio::{net::TcpListener, sync::watch, task::JoinHandle};
use crate::backend::error::sink::{not_found, report_errors};
use crate::backend::middleware::MiddlewarePipeline;
use crate::backend::realtime::{
    broker::{connector_for, BrokerConnector},
    socket_routes, ConnectionHandler, NoopHandler, RealtimeError, RealtimeServer, RealtimeSlot,
};
use crate::backend::routes::create_router;
use crate::backend::server::config::{Config, ConfigError};
use crate::backend::server::state::AppState;

/// Server startup errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// The HTTP + real-time server of one instance
pub struct ChattyServer {
    state: AppState,
    routes: Router<AppState>,
    broker: Option<Arc<dyn BrokerConnector>>,
    handler: Arc<dyn ConnectionHandler>,
}

impl ChattyServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            routes: Router::new(),
            broker: None,
            handler: Arc::new(NoopHandler),
        }
    }

    /// Routes supplied by the application, merged with the built-in ones
    pub fn with_routes(mut self, routes: Router<AppState>) -> Self {
        self.routes = self.routes.merge(routes);
        self
    }

    /// Use this broker instead of the one named by the configuration
    pub fn with_broker(mut self, broker: Arc<dyn BrokerConnector>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Per-connection hooks for the real-time transport
    pub fn with_connection_handler(mut self, handler: Arc<dyn ConnectionHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn config(&self) -> &Config {
        &self.state.config
    }

    /// Step 1
    fn standard_middleware(&self) -> Result<MiddlewarePipeline, ServerError> {
        Ok(MiddlewarePipeline::standard(&self.config().middleware)?)
    }

    /// Step 2
    fn routes_middleware(&self) -> Router<AppState> {
        create_router(self.routes.clone()).merge(socket_routes())
    }

    /// Step 3
    fn security_middleware(&self) -> MiddlewarePipeline {
        MiddlewarePipeline::security(&self.config().middleware)
    }

    /// Step 4: unknown paths and known paths with an unrouted method
    fn global_error_handler(routes: Router<AppState>) -> Router<AppState> {
        routes.fallback(not_found).method_not_allowed_fallback(not_found)
    }

    /// Steps 1-4: the complete application, ready to serve
    pub fn build_router(&self) -> Result<Router, ServerError> {
        let standard = self.standard_middleware()?;
        let routes = self.routes_middleware();
        let security = self.security_middleware();

        let pipeline = standard.then(security);
        tracing::debug!(target: "server", stages = ?pipeline.stage_names(), "[Server] Middleware pipeline");

        let app = pipeline
            .apply(Self::global_error_handler(routes))
            .layer(from_fn(report_errors));
        Ok(app.with_state(self.state.clone()))
    }

    /// Bind, serve, then bring up the real-time transport
    pub async fn start(self) -> Result<RunningServer, ServerError> {
        let app = self.build_router()?;

        // Step 5
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config().server_port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;

        tracing::info!(target: "server", "[Server] Server has started with process {}", std::process::id());
        tracing::info!(target: "server", "[Server] Server running on port {}", local_addr.port());

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(shutdown_rx))
                .await
        });

        // Steps 6-7
        let slot = self.state.realtime.clone();
        match self.create_realtime().await {
            Ok(realtime) => {
                self.realtime_connections(&realtime);
                slot.attach(realtime);
            }
            Err(e) => {
                tracing::error!(target: "server", "[Server] err_startServer: {}", e);
            }
        }

        Ok(RunningServer {
            local_addr,
            realtime: slot,
            shutdown,
            task,
        })
    }

    /// Step 6
    async fn create_realtime(&self) -> Result<Arc<RealtimeServer>, RealtimeError> {
        let connector = match &self.broker {
            Some(broker) => Arc::clone(broker),
            None => connector_for(&self.config().realtime.broker_url)?,
        };
        RealtimeServer::create(&self.config().realtime, connector.as_ref()).await
    }

    /// Step 7
    fn realtime_connections(&self, realtime: &RealtimeServer) {
        realtime.on_connection(Arc::clone(&self.handler));
        tracing::info!(target: "server", "[Server] Real-time transport accepting connections");
    }
}

async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        // Dropping the sender also shuts the server down
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Handle to a started server
pub struct RunningServer {
    local_addr: SocketAddr,
    realtime: RealtimeSlot,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<io::Result<()>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The attached real-time transport, if its setup succeeded
    pub fn realtime(&self) -> Option<Arc<RealtimeServer>> {
        self.realtime.get()
    }

    /// Stop accepting connections and let in-flight requests finish
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Wait for the server to stop
    pub async fn wait(self) -> Result<(), ServerError> {
        match self.task.await {
            Ok(result) => result.map_err(ServerError::Serve),
            Err(e) => Err(ServerError::Serve(io::Error::other(e))),
        }
    }
}
