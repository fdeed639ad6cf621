//! Orchestrator integration tests
//!
//! Exercises a bound server over real HTTP: the middleware pipeline, the
//! catch-all and the rule that a broken broker never takes HTTP down.

use std::sync::Arc;
use async_trait::async_trait;
use axum::{routing::get, Router};
use chatty::backend::error::{AppError, DomainError};
use chatty::backend::middleware::Session;
use chatty::backend::realtime::broker::{
    BrokerConnector, BrokerError, BrokerPublisher, BrokerSubscriber,
};
use chatty::backend::server::{AppState, ChattyServer};
use pretty_assertions::assert_eq;
use serde_json::json;
use crate::common::*;

/// A broker that is never reachable
struct UnreachableBroker;

#[async_trait]
impl BrokerConnector for UnreachableBroker {
    async fn connect_publisher(&self) -> Result<Box<dyn BrokerPublisher>, BrokerError> {
        Err(BrokerError::Connection("connection refused".to_string()))
    }

    async fn connect_subscriber(&self) -> Result<Box<dyn BrokerSubscriber>, BrokerError> {
        Err(BrokerError::Connection("connection refused".to_string()))
    }
}

fn demo_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/fail",
            get(|| async { Err::<(), AppError>(DomainError::validation("email", "Email must be valid").into()) }),
        )
        .route(
            "/visits",
            get(|session: Session| async move {
                let visits = session.get::<u64>("visits").unwrap_or(0) + 1;
                session.insert("visits", visits)?;
                Ok::<_, AppError>(visits.to_string())
            }),
        )
}

#[tokio::test]
async fn test_unmatched_path_is_json_404() {
    let server = ChattyServer::new(test_state()).start().await.unwrap();

    let response = reqwest::get(http_url(&server, "/no/such/route")).await.unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({"message": "/no/such/route not found"}));

    stop(server).await;
}

#[tokio::test]
async fn test_domain_error_reaches_client() {
    let server = ChattyServer::new(test_state())
        .with_routes(demo_routes())
        .start()
        .await
        .unwrap();

    let response = reqwest::get(http_url(&server, "/fail")).await.unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"errors": [{"message": "Email must be valid", "field": "email"}]})
    );

    stop(server).await;
}

#[tokio::test]
async fn test_session_survives_requests() {
    let server = ChattyServer::new(test_state())
        .with_routes(demo_routes())
        .start()
        .await
        .unwrap();
    let client = reqwest::Client::new();

    let first = client.get(http_url(&server, "/visits")).send().await.unwrap();
    let cookie = first
        .headers()
        .get("set-cookie")
        .expect("session cookie issued")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert_eq!(first.text().await.unwrap(), "1");

    let second = client
        .get(http_url(&server, "/visits"))
        .header("cookie", cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(second.text().await.unwrap(), "2");

    stop(server).await;
}

#[tokio::test]
async fn test_broker_failure_keeps_http_serving() {
    let server = ChattyServer::new(test_state())
        .with_broker(Arc::new(UnreachableBroker))
        .start()
        .await
        .expect("startup survives a broken broker");

    assert!(server.realtime().is_none());

    let health: serde_json::Value = reqwest::get(http_url(&server, "/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["realtime"], false);

    let socket = reqwest::get(http_url(&server, "/socket")).await.unwrap();
    assert_eq!(socket.status(), 503);

    stop(server).await;
}

#[tokio::test]
async fn test_port_in_use_fails_start() {
    let first = ChattyServer::new(test_state()).start().await.unwrap();

    let config = chatty::backend::server::Config::builder()
        .database_url("postgres://localhost/chatty_test")
        .broker_url("memory://")
        .client_url(CLIENT_URL)
        .session_keys(
            "integration-primary-secret-0123456789",
            "integration-secondary-secret-0123456789",
        )
        .server_port(first.local_addr().port())
        .build()
        .unwrap();
    let state = AppState::new(
        Arc::new(config),
        chatty::backend::storage::StorageHandle::detached(),
    );

    let result = ChattyServer::new(state).start().await;
    assert!(matches!(
        result,
        Err(chatty::backend::server::ServerError::Bind { .. })
    ));

    stop(first).await;
}
