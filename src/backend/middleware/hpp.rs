/**
 * HTTP Parameter Pollution Guard
 *
 * A repeated key (`?sort=asc&sort=desc`) can make a handler that expects a
 * single value see a list, or see a different value than an upstream
 * filter checked. This stage collapses duplicates before any handler runs:
 *
 * - the query string is rewritten with one value per key
 * - `application/x-www-form-urlencoded` bodies are read (within the size
 *   ceiling) and rewritten the same way
 *
 * Keys keep the order of their first occurrence. Which value survives
 * depends on the `PollutionRule` (last occurrence by default). Discarded
 * values are available to handlers through the `PollutedParameters`
 * extension.
 */

use std::collections::HashMap;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, Uri,
    },
    middleware::Next,
    response::Response,
};
use url::form_urlencoded;
use crate::backend::error::{AppError, DomainError};
use crate::backend::server::config::PollutionRule;

/// Duplicate values removed from this request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollutedParameters {
    pub query: Vec<(String, String)>,
    pub body: Vec<(String, String)>,
}

impl PollutedParameters {
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.body.is_empty()
    }
}

/// Settings of the pollution stage
#[derive(Debug, Clone, Copy)]
pub struct PollutionGuard {
    pub rule: PollutionRule,
    pub body_limit: usize,
}

/// Collapse duplicate keys
///
/// Returns the kept pairs and the discarded ones.
pub fn collapse<I>(pairs: I, rule: PollutionRule) -> (Vec<(String, String)>, Vec<(String, String)>)
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut kept: Vec<(String, String)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut discarded = Vec::new();

    for (key, value) in pairs {
        match positions.get(&key) {
            Some(&at) => match rule {
                PollutionRule::LastWins => {
                    let previous = std::mem::replace(&mut kept[at].1, value);
                    discarded.push((key, previous));
                }
                PollutionRule::FirstWins => discarded.push((key, value)),
            },
            None => {
                positions.insert(key.clone(), kept.len());
                kept.push((key, value));
            }
        }
    }
    (kept, discarded)
}

fn encode(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn with_query(uri: &Uri, query: &str) -> Result<Uri, AppError> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().map_err(AppError::unclassified)?);
    Uri::from_parts(parts).map_err(AppError::unclassified)
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

/// Parameter pollution stage
pub async fn parameter_pollution(
    State(guard): State<PollutionGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let mut polluted = PollutedParameters::default();

    if let Some(query) = parts.uri.query() {
        let (kept, discarded) = collapse(
            form_urlencoded::parse(query.as_bytes()).into_owned(),
            guard.rule,
        );
        if !discarded.is_empty() {
            tracing::debug!(target: "server", "[Middleware] Collapsed {} duplicate query parameters", discarded.len());
            parts.uri = with_query(&parts.uri, &encode(&kept))?;
            polluted.query = discarded;
        }
    }

    let body = if is_form(&parts.headers) {
        if declared_length(&parts.headers).is_some_and(|length| length > guard.body_limit) {
            return Err(DomainError::payload_too_large("Request body is too large").into());
        }
        // With a ceiling set, a failed read is the ceiling being hit
        let bytes = axum::body::to_bytes(body, guard.body_limit)
            .await
            .map_err(|_| DomainError::payload_too_large("Request body is too large"))?;
        let (kept, discarded) = collapse(form_urlencoded::parse(&bytes).into_owned(), guard.rule);
        if discarded.is_empty() {
            Body::from(bytes)
        } else {
            tracing::debug!(target: "server", "[Middleware] Collapsed {} duplicate body parameters", discarded.len());
            polluted.body = discarded;
            let rewritten = encode(&kept);
            parts.headers.insert(CONTENT_LENGTH, rewritten.len().into());
            Body::from(rewritten)
        }
    } else {
        body
    };

    parts.extensions.insert(polluted);
    Ok(next.run(Request::from_parts(parts, body)).await)
}
