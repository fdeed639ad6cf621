/**
 * Error Reporting Sink
 *
 * The single place request errors are logged. It is installed after the
 * routes (so it observes every handler and the catch-all) and inspects each
 * outgoing response for an `ErrorReport`:
 *
 * - domain errors are logged with their kind and status; the structured body
 *   they already produced is sent unchanged
 * - unclassified errors are logged and the stack's default response passes
 *   through untouched
 *
 * Errors are never retried here.
 */

use axum::{
    extract::{OriginalUri, Request},
    http::{Method, StatusCode, Uri},
    middleware::Next,
    response::Response,
    Json,
};
use crate::backend::error::conversion::ErrorReport;
use crate::backend::error::types::AppError;
use crate::shared::NotFoundResponse;

/// Log any error carried by the response of this request
pub async fn report_errors(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;

    if let Some(ErrorReport(error)) = response.extensions().get::<ErrorReport>() {
        handle(error, &method, &uri);
    }
    response
}

/// Classify and log one error
pub fn handle(error: &AppError, method: &Method, uri: &Uri) {
    match error {
        AppError::Domain(domain) => {
            tracing::error!(
                target: "errors",
                %method,
                %uri,
                kind = domain.kind(),
                status = domain.status_code().as_u16(),
                "[Error] {}",
                domain
            );
        }
        AppError::Unclassified(source) => {
            tracing::error!(
                target: "errors",
                %method,
                %uri,
                "[Error] unclassified: {}",
                source
            );
        }
    }
}

/// Catch-all for any method and path without a handler
pub async fn not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<NotFoundResponse>) {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    (StatusCode::NOT_FOUND, Json(NotFoundResponse::for_path(path)))
}
