//! Integration tests against started servers

pub mod realtime;
pub mod server;
pub mod upload;
