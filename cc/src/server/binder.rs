//! Request session binder
//!
//! Middleware that gives every request a live session before the handler
//! runs. A `session_id` cookie the store still recognizes is reused as-is;
//! anything else (no cookie, a forged or expired token, a token whose record
//! is gone) gets a freshly created session, sent back in `Set-Cookie`.

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use sessionstore::SESSION_EXPIRATION;
use tracing::{debug, warn};

use super::AppState;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "session_id";

/// Session bound to the current request, available to handlers as an
/// `Extension<SessionId>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Attach a session to every request
///
/// A presented `session_id` cookie is kept only when the store still holds a
/// live session for it. This departs on purpose from binding a presented
/// token as-is: `is_live` verifies the signature and age, and it removes an
/// expired record as a side effect. Any cookie it rejects (forged, expired,
/// or minted before a restart) is replaced by a fresh session and a
/// `Set-Cookie`.
pub async fn bind_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let presented = cookie_token(req.headers());
    let (token, fresh) = match presented {
        Some(token) if state.sessions.is_live(&token) => (token, false),
        presented => {
            if presented.is_some() {
                debug!("bind_session: presented session not recognized, creating a new one");
            }
            (state.sessions.create().into_string(), true)
        }
    };

    req.extensions_mut().insert(SessionId(token.clone()));
    let mut response = next.run(req).await;

    if fresh {
        match HeaderValue::from_str(&set_cookie_value(&token)) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "bind_session: token is not a valid header value"),
        }
    }
    response
}

/// Value of the `session_id` cookie, if the request carries one
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

pub fn set_cookie_value(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        token,
        SESSION_EXPIRATION.as_secs()
    )
}
