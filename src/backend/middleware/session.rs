/**
 * Signed Session Cookies
 *
 * Session data lives entirely in the client cookie: a base64url-encoded JSON
 * object, signed (HMAC) so it cannot be altered. Two keys are configured:
 *
 * - new and changed sessions are always signed with the **primary** key
 * - incoming cookies are verified against the primary key, then the
 *   **secondary** key; a cookie only the secondary key accepts is re-issued
 *   under the primary key, which lets secrets rotate without logging anyone out
 *
 * A missing, tampered or undecodable cookie yields an empty session. It is
 * never an error.
 *
 * Handlers read and write the session through the `Session` extractor.
 */

use std::sync::{Arc, Mutex, MutexGuard};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cookie::{time, Cookie, CookieJar, Key, SameSite};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use crate::backend::error::AppError;
use crate::backend::server::config::{ConfigError, SessionConfig, MIN_SECRET_LEN};

/// Keys and cookie attributes of the session stage
pub struct SessionSettings {
    name: String,
    primary: Key,
    secondary: Key,
    max_age: std::time::Duration,
    secure: bool,
}

impl std::fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSettings")
            .field("name", &self.name)
            .field("max_age", &self.max_age)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionSettings {
    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        let [primary, secondary] = &config.keys;
        Ok(Self {
            name: config.name.clone(),
            primary: derive_key("SECRET_KEY_ONE", primary)?,
            secondary: derive_key("SECRET_KEY_TWO", secondary)?,
            max_age: config.max_age,
            secure: config.secure,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.name
    }

    /// Restore the session from request cookies
    ///
    /// The flag is true when the cookie was accepted by the secondary key
    /// only and must be re-issued.
    fn load(&self, jar: &CookieJar) -> (Session, bool) {
        if let Some(cookie) = jar.signed(&self.primary).get(&self.name) {
            return (Session::from_data(decode_payload(cookie.value())), false);
        }
        if let Some(cookie) = jar.signed(&self.secondary).get(&self.name) {
            tracing::debug!(target: "server", "[Session] Cookie signed with secondary key, re-issuing");
            return (Session::from_data(decode_payload(cookie.value())), true);
        }
        (Session::default(), false)
    }

    /// The `Set-Cookie` value for the response, if one is needed
    fn outgoing(&self, session: &Session, rotated: bool) -> Option<String> {
        let state = session.lock();
        if state.cleared && state.data.is_empty() {
            let mut cookie = Cookie::build((self.name.clone(), ""))
                .path("/")
                .http_only(true)
                .build();
            cookie.make_removal();
            return Some(cookie.encoded().to_string());
        }
        if !state.changed && !rotated {
            return None;
        }

        let max_age = time::Duration::seconds(i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX));
        let cookie = Cookie::build((self.name.clone(), encode_payload(&state.data)))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build();

        let mut jar = CookieJar::new();
        jar.signed_mut(&self.primary).add(cookie);
        jar.get(&self.name).map(|c| c.encoded().to_string())
    }

    #[cfg(test)]
    fn sign_with_secondary(&self, data: &Map<String, Value>) -> String {
        let mut jar = CookieJar::new();
        jar.signed_mut(&self.secondary)
            .add(Cookie::new(self.name.clone(), encode_payload(data)));
        jar.get(&self.name).unwrap().encoded().to_string()
    }
}

fn derive_key(key: &'static str, secret: &str) -> Result<Key, ConfigError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::InvalidValue {
            key,
            message: format!("must be at least {} bytes", MIN_SECRET_LEN),
        });
    }
    Ok(Key::derive_from(secret.as_bytes()))
}

fn encode_payload(data: &Map<String, Value>) -> String {
    let json = serde_json::to_vec(data).unwrap_or_else(|_| b"{}".to_vec());
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_payload(value: &str) -> Map<String, Value> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

fn request_jar(headers: &HeaderMap) -> CookieJar {
    let mut jar = CookieJar::new();
    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for pair in header.split(';') {
            if let Ok(cookie) = Cookie::parse_encoded(pair.trim().to_owned()) {
                jar.add_original(cookie);
            }
        }
    }
    jar
}

#[derive(Debug, Default)]
struct SessionState {
    data: Map<String, Value>,
    changed: bool,
    cleared: bool,
}

/// The current request's session
///
/// Cloning shares the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    fn from_data(data: Map<String, Value>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                data,
                ..SessionState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.lock()
            .data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        let mut state = self.lock();
        state.data.insert(key.to_string(), value);
        state.changed = true;
        state.cleared = false;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut state = self.lock();
        let removed = state.data.remove(key);
        if removed.is_some() {
            state.changed = true;
        }
        removed
    }

    /// Drop all data; the response expires the cookie
    pub fn clear(&self) {
        let mut state = self.lock();
        state.data.clear();
        state.changed = true;
        state.cleared = true;
    }

    pub fn is_empty(&self) -> bool {
        self.lock().data.is_empty()
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            AppError::unclassified(std::io::Error::other("session stage is not installed"))
        })
    }
}

/// Session stage
pub async fn session_cookies(
    State(settings): State<Arc<SessionSettings>>,
    mut request: Request,
    next: Next,
) -> Response {
    let (session, rotated) = settings.load(&request_jar(request.headers()));
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if let Some(cookie) = settings.outgoing(&session, rotated) {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::error!(target: "server", "[Session] Could not encode session cookie: {}", e),
        }
    }
    response
}
