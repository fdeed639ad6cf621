//! Socket client helpers

use std::time::Duration;
use chatty::shared::RealtimeEvent;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type TestSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn connect(url: &str) -> TestSocket {
    let (socket, _) = connect_async(url).await.expect("socket handshake");
    socket
}

pub async fn send_event(socket: &mut TestSocket, event: &RealtimeEvent) {
    let frame = serde_json::to_string(event).expect("event serializes");
    socket.send(Message::text(frame)).await.expect("frame sent");
}

/// Next event frame, skipping control frames
pub async fn next_event(socket: &mut TestSocket) -> RealtimeEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).expect("event frame");
                }
                Some(Ok(_)) => continue,
                other => panic!("socket closed while waiting for an event: {:?}", other),
            }
        }
    })
    .await
    .expect("event received in time")
}

/// Assert nothing else arrives within a short window
pub async fn assert_silent(socket: &mut TestSocket) {
    let result = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
    if let Ok(Some(Ok(Message::Text(text)))) = result {
        panic!("unexpected frame: {}", text.as_str());
    }
}
