//! Shared Module
//!
//! This module contains types that cross the wire: the real-time event frame
//! and the JSON error bodies. They carry no server state and can be used by
//! clients as well as by the backend.

/// Real-time event frame
pub mod event;

/// Client-visible error bodies
pub mod error;

/// Re-export commonly used types for convenience
pub use error::{ErrorItem, ErrorResponse, NotFoundResponse};
pub use event::RealtimeEvent;
