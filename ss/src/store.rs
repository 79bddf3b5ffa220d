//! SessionStore - in-memory session records keyed by signed token
//!
//! One coarse lock protects the whole map. Every operation holds it for a
//! single lookup, insert or delete, so two requests racing on the same
//! session never lose an update.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::SessionError;
use crate::token::{SessionToken, TokenCodec};

/// Sessions expire 30 minutes after creation
pub const SESSION_EXPIRATION: Duration = Duration::from_secs(30 * 60);

/// Named values held for one session
pub type SessionData = HashMap<String, Value>;

/// Server-held state for one session token
#[derive(Debug, Clone)]
pub(crate) struct SessionRecord {
    created_at: DateTime<Utc>,
    data: SessionData,
}

impl SessionRecord {
    fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            data: SessionData::new(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let age_ms = now.timestamp_millis() - self.created_at.timestamp_millis();
        age_ms >= window.as_millis() as i64
    }
}

/// Process-wide session store
///
/// Construct once at startup and share behind an `Arc`.
#[derive(Debug)]
pub struct SessionStore {
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    pub fn new(codec: TokenCodec) -> Self {
        Self::with_clock(codec, Arc::new(SystemClock))
    }

    pub fn with_clock(codec: TokenCodec, clock: Arc<dyn Clock>) -> Self {
        debug!("SessionStore::with_clock: called");
        Self {
            codec,
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// The codec used to mint and verify tokens
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Mint a token and register an empty record for it
    pub fn create(&self) -> SessionToken {
        let now = self.clock.now();
        let token = self.codec.mint_at(now);
        let mut records = self.records.lock();
        records.insert(token.as_str().to_string(), SessionRecord::new(now));
        debug!(session_count = records.len(), "SessionStore::create: session created");
        token
    }

    /// Data for `token`, or an empty map when there is no live session
    ///
    /// A dead entry (bad signature, expired, or never issued) is removed as
    /// a side effect.
    pub fn get(&self, token: &str) -> SessionData {
        let now = self.clock.now();
        let mut records = self.records.lock();
        match self.resolve(&mut records, token, now) {
            Some(record) => record.data.clone(),
            None => {
                debug!("SessionStore::get: no live session");
                SessionData::new()
            }
        }
    }

    /// Store `value` under `key` for the live session `token`
    ///
    /// Fails with [`SessionError::NoActiveSession`] instead of writing into a
    /// record that is about to be discarded.
    pub fn set(&self, token: &str, key: impl Into<String>, value: Value) -> Result<(), SessionError> {
        let key = key.into();
        let now = self.clock.now();
        let mut records = self.records.lock();
        match self.resolve(&mut records, token, now) {
            Some(record) => {
                debug!(%key, "SessionStore::set: stored value");
                record.data.insert(key, value);
                Ok(())
            }
            None => {
                debug!(%key, "SessionStore::set: no live session");
                Err(SessionError::NoActiveSession)
            }
        }
    }

    /// True when `token` verifies and still maps to an unexpired record
    pub fn is_live(&self, token: &str) -> bool {
        let now = self.clock.now();
        let mut records = self.records.lock();
        self.resolve(&mut records, token, now).is_some()
    }

    /// Drop every record whose window has elapsed, returning how many went
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now, SESSION_EXPIRATION));
        let purged = before - records.len();
        if purged > 0 {
            info!(purged, remaining = records.len(), "Purged expired sessions");
        }
        purged
    }

    /// Number of records currently held, live or not yet purged
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Look up the live record for `token`, purging it when it is dead
    fn resolve<'a>(
        &self,
        records: &'a mut HashMap<String, SessionRecord>,
        token: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a mut SessionRecord> {
        let token_valid = self.codec.verify_at(token, now, SESSION_EXPIRATION);
        let record_live = token_valid
            && records
                .get(token)
                .is_some_and(|record| !record.is_expired(now, SESSION_EXPIRATION));

        if !record_live {
            if records.remove(token).is_some() {
                debug!("SessionStore::resolve: purged dead session");
            }
            return None;
        }
        records.get_mut(token)
    }
}
