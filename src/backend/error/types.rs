/**
 * Backend Error Types
 *
 * Every failure on the request path ends up as an `AppError`, which is a
 * two-way tagged dispatch:
 *
 * - `AppError::Domain` - raised on purpose by application code. It carries a
 *   status code and knows how to serialize itself into the client body.
 * - `AppError::Unclassified` - anything else. It is logged by the sink and
 *   left to the HTTP stack's default response; no body is fabricated for it.
 *
 * # Error Categories
 *
 * Domain errors cover request problems (bad input, validation, oversized
 * bodies), access problems (not authorized, forbidden), missing resources and
 * temporarily unavailable subsystems such as the real-time transport.
 */

use axum::http::StatusCode;
use thiserror::Error;
use crate::shared::ErrorItem;

/// Errors explicitly raised by application code
///
/// # Usage
///
/// ```rust
/// use chatty::backend::error::DomainError;
/// use axum::http::StatusCode;
///
/// let err = DomainError::bad_request("bad input");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{message}")]
    NotAuthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    PayloadTooLarge { message: String },

    #[error("{message}")]
    ServiceUnavailable { message: String },

    /// An extractor rejected the request with its own status
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl DomainError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::NotAuthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge { message: message.into() }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable { message: message.into() }
    }

    /// Wrap an extractor rejection, keeping its status
    ///
    /// Oversized bodies are reported as `PayloadTooLarge` so handlers and
    /// logs see the same kind whichever extractor hit the ceiling.
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::payload_too_large(message);
        }
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotAuthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Rejected { status, .. } => *status,
        }
    }

    /// Short tag used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::Validation { .. } => "validation",
            Self::NotAuthorized { .. } => "not_authorized",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Rejected { .. } => "rejected",
        }
    }

    /// The items written under `errors` in the response body
    pub fn serialize_errors(&self) -> Vec<ErrorItem> {
        match self {
            Self::Validation { field, message } => {
                vec![ErrorItem::for_field(field.clone(), message.clone())]
            }
            Self::BadRequest { message }
            | Self::NotAuthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::PayloadTooLarge { message }
            | Self::ServiceUnavailable { message }
            | Self::Rejected { message, .. } => vec![ErrorItem::new(message.clone())],
        }
    }
}

/// Any error surfaced while handling a request
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Unclassified(Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    /// Wrap an arbitrary failure that application code did not classify
    pub fn unclassified<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unclassified(Box::new(error))
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::unclassified(error)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::unclassified(error)
    }
}
