/**
 * Error Conversion
 *
 * This module turns an `AppError` into an HTTP response. The error itself is
 * attached to the response extensions as an `ErrorReport` so the reporting
 * sink (see `sink.rs`) can log it with the request that produced it.
 *
 * # Response Format
 *
 * Domain errors are written as:
 * ```json
 * { "errors": [ { "message": "bad input" } ] }
 * ```
 * with the status carried by the error. Unclassified errors get the stack's
 * bare `500 Internal Server Error` with an empty body.
 */

use std::sync::Arc;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::backend::error::types::{AppError, DomainError};
use crate::shared::ErrorResponse;

/// The error behind a response, for the sink to log
#[derive(Debug, Clone)]
pub struct ErrorReport(pub Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = match &self {
            AppError::Domain(error) => {
                let body = ErrorResponse {
                    errors: error.serialize_errors(),
                };
                (error.status_code(), Json(body)).into_response()
            }
            AppError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        response.extensions_mut().insert(ErrorReport(Arc::new(self)));
        response
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        AppError::Domain(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_domain_error_body() {
        let response = AppError::from(DomainError::bad_request("bad input")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<ErrorReport>().is_some());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"errors": [{"message": "bad input"}]}));
    }

    #[tokio::test]
    async fn test_unclassified_error_has_no_body() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let response = AppError::unclassified(io).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let report = response.extensions().get::<ErrorReport>().cloned().unwrap();
        assert!(!report.0.is_domain());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}
