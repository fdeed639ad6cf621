/**
 * Real-time Event System
 *
 * This module defines the event frame exchanged over the socket transport
 * and relayed through the broker. Events are named (`event`) and carry an
 * arbitrary JSON payload, mirroring the emit/on model of socket clients.
 */
use serde::{Deserialize, Serialize};

/// Real-time event that can be broadcast to all sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RealtimeEvent {
    /// Event name (e.g. `"message"`, `"typing"`)
    pub event: String,
    /// Event payload (JSON-serializable data)
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Timestamp when the event was created, RFC3339
    #[serde(default = "get_timestamp")]
    pub timestamp: String,
}

impl RealtimeEvent {
    /// Create a new real-time event
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
            timestamp: get_timestamp(),
        }
    }

    /// Create a message event
    pub fn message(payload: serde_json::Value) -> Self {
        Self::new("message", payload)
    }

    /// Create a notification event
    pub fn notification(title: String, message: String) -> Self {
        Self::new(
            "notification",
            serde_json::json!({
                "title": title,
                "message": message,
            }),
        )
    }

    /// Create a typing event
    pub fn typing(user: String, is_typing: bool) -> Self {
        Self::new(
            "typing",
            serde_json::json!({
                "user": user,
                "is_typing": is_typing,
            }),
        )
    }

    /// Serialize into the text frame sent to sockets
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Get the current timestamp as an RFC3339 string
fn get_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
