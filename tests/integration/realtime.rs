//! Real-time fan-out integration tests
//!
//! Two instances share one in-process broker. A socket client on either
//! instance must see every broadcast exactly once, in publish order.

use std::sync::Arc;
use chatty::backend::realtime::{NoopHandler, RelayHandler};
use chatty::shared::RealtimeEvent;
use pretty_assertions::assert_eq;
use serde_json::json;
use crate::common::*;

#[tokio::test]
async fn test_broadcast_reaches_sockets_on_every_instance() {
    let servers = start_cluster(2, Arc::new(NoopHandler)).await;
    let mut on_first = connect(&socket_url(&servers[0])).await;
    let mut on_second = connect(&socket_url(&servers[1])).await;
    wait_for_sessions(&servers[0], 1).await;
    wait_for_sessions(&servers[1], 1).await;

    let event = RealtimeEvent::message(json!({"text": "hello"}));
    servers[0].realtime().unwrap().broadcast(event.clone()).await.unwrap();

    assert_eq!(next_event(&mut on_first).await, event);
    assert_eq!(next_event(&mut on_second).await, event);
    assert_silent(&mut on_first).await;
    assert_silent(&mut on_second).await;

    for server in servers {
        stop(server).await;
    }
}

#[tokio::test]
async fn test_broadcasts_keep_publish_order() {
    let servers = start_cluster(2, Arc::new(NoopHandler)).await;
    let mut remote = connect(&socket_url(&servers[1])).await;
    wait_for_sessions(&servers[1], 1).await;

    let realtime = servers[0].realtime().unwrap();
    for n in 0..5 {
        realtime
            .broadcast(RealtimeEvent::new("tick", json!({"n": n})))
            .await
            .unwrap();
    }

    for n in 0..5 {
        assert_eq!(next_event(&mut remote).await.payload, json!({"n": n}));
    }

    for server in servers {
        stop(server).await;
    }
}

#[tokio::test]
async fn test_client_event_relayed_across_instances() {
    let servers = start_cluster(2, Arc::new(RelayHandler)).await;
    let mut sender = connect(&socket_url(&servers[0])).await;
    let mut neighbour = connect(&socket_url(&servers[0])).await;
    let mut remote = connect(&socket_url(&servers[1])).await;
    wait_for_sessions(&servers[0], 2).await;
    wait_for_sessions(&servers[1], 1).await;

    let event = RealtimeEvent::typing("alice".to_string(), true);
    send_event(&mut sender, &event).await;

    assert_eq!(next_event(&mut sender).await, event);
    assert_eq!(next_event(&mut neighbour).await, event);
    assert_eq!(next_event(&mut remote).await, event);
    assert_silent(&mut remote).await;

    for server in servers {
        stop(server).await;
    }
}

#[tokio::test]
async fn test_closed_socket_leaves_registry() {
    let servers = start_cluster(1, Arc::new(NoopHandler)).await;
    let socket = connect(&socket_url(&servers[0])).await;
    wait_for_sessions(&servers[0], 1).await;

    drop(socket);
    wait_for_sessions(&servers[0], 0).await;

    for server in servers {
        stop(server).await;
    }
}

#[tokio::test]
async fn test_foreign_origin_rejected() {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    let servers = start_cluster(1, Arc::new(NoopHandler)).await;
    let mut request = socket_url(&servers[0]).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("origin", "http://evil.example".parse().unwrap());

    let result = tokio_tungstenite::connect_async(request).await;
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 403);
        }
        other => panic!("expected a 403 handshake failure, got {:?}", other.map(|_| ())),
    }

    for server in servers {
        stop(server).await;
    }
}
