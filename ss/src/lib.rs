//! SessionStore - signed session tokens over an in-memory session store
//!
//! Correlates a sequence of otherwise stateless HTTP calls by handing the
//! client an opaque, signed, time-limited token and keeping a small bag of
//! named values per token in process memory.
//!
//! # Architecture
//!
//! ```text
//! TokenCodec ── mint/verify ──┐
//!                             ▼
//! SessionStore { Mutex<HashMap<token, SessionRecord>> }
//!     create() -> SessionToken
//!     get(token) -> SessionData        (empty when no live session)
//!     set(token, key, value) -> Result (NoActiveSession when dead)
//! ```
//!
//! Expiry is lazy: a record is dropped the next time someone touches its
//! token after the window has elapsed. [`SessionStore::purge_expired`] is
//! available for callers that want a periodic sweep.
//!
//! # Example
//!
//! ```ignore
//! use sessionstore::{SessionStore, TokenCodec};
//!
//! let store = SessionStore::new(TokenCodec::new("secret")?);
//! let token = store.create();
//! store.set(token.as_str(), "tasks", serde_json::json!([]))?;
//! let data = store.get(token.as_str());
//! ```

mod clock;
mod error;
mod store;
mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SessionError, TokenError};
pub use store::{SESSION_EXPIRATION, SessionData, SessionStore};
pub use token::{SessionToken, TokenCodec};
