//! Shared Error Shapes
//!
//! This module defines the JSON bodies clients receive when a request fails.
//! They are shared between the server (which serializes them) and any Rust
//! client (which deserializes them).
//!
//! # Shapes
//!
//! - `ErrorResponse` - `{ "errors": [ { "message": "...", "field": "..." } ] }`
//!   for domain errors raised by application code
//! - `NotFoundResponse` - `{ "message": "<path> not found" }` for unmatched routes
//!
//! # Usage
//!
//! ```rust
//! use chatty::shared::error::{ErrorItem, ErrorResponse};
//!
//! let body = ErrorResponse::single(ErrorItem::new("bad input"));
//! assert_eq!(body.errors.len(), 1);
//! ```
use serde::{Deserialize, Serialize};

/// One entry of a domain error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorItem {
    /// Human-readable error message
    pub message: String,
    /// The request field the error refers to, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorItem {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

/// Body written for every domain error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorItem>,
}

impl ErrorResponse {
    pub fn single(item: ErrorItem) -> Self {
        Self { errors: vec![item] }
    }
}

/// Body written by the catch-all route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub message: String,
}

impl NotFoundResponse {
    pub fn for_path(path: &str) -> Self {
        Self {
            message: format!("{} not found", path),
        }
    }
}
