//! Token codec - mint and verify signed, timestamped session identifiers
//!
//! Token layout (all parts base64url, no padding):
//!
//! ```text
//! session.<nonce>.<issued-ms>.<hmac-sha256>
//! ```
//!
//! The signature covers `session.<nonce>.<issued-ms>`. The random nonce keeps
//! two tokens minted in the same millisecond apart.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::error::{SessionError, TokenError};

type HmacSha256 = Hmac<Sha256>;

/// Constant payload carried by every token
const TOKEN_PAYLOAD: &str = "session";

/// Random bytes mixed into each token
const NONCE_LEN: usize = 16;

/// Anything longer is rejected before decoding
const MAX_TOKEN_LEN: usize = 256;

/// Opaque session identifier handed to clients
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Signs and verifies session tokens with the process secret
///
/// Holds no per-token state; the signature carries the trust. Cloning is
/// cheap.
#[derive(Clone)]
pub struct TokenCodec {
    mac: Arc<HmacSha256>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a codec keyed with `secret`
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SessionError> {
        let secret = secret.as_ref();
        debug!(secret_len = secret.len(), "TokenCodec::new: called");
        if secret.is_empty() {
            return Err(SessionError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| SessionError::EmptySecret)?;
        Ok(Self { mac: Arc::new(mac) })
    }

    /// Create a codec from the secret stored in environment variable `var`
    ///
    /// An unset secret would leave every session forgeable or unverifiable,
    /// so callers are expected to treat this error as fatal.
    pub fn from_env(var: &str) -> Result<Self, SessionError> {
        debug!(%var, "TokenCodec::from_env: called");
        match std::env::var(var) {
            Ok(secret) if !secret.is_empty() => Self::new(secret),
            _ => Err(SessionError::MissingSecret(var.to_string())),
        }
    }

    /// Mint a token stamped with the current time
    pub fn mint(&self) -> SessionToken {
        self.mint_at(Utc::now())
    }

    /// Mint a token stamped with `issued_at`
    pub fn mint_at(&self, issued_at: DateTime<Utc>) -> SessionToken {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let issued_ms = u64::try_from(issued_at.timestamp_millis()).unwrap_or(0);
        let unsigned = format!(
            "{}.{}.{}",
            TOKEN_PAYLOAD,
            URL_SAFE_NO_PAD.encode(nonce),
            URL_SAFE_NO_PAD.encode(issued_ms.to_be_bytes())
        );
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&unsigned));
        debug!(%issued_ms, "TokenCodec::mint_at: minted token");
        SessionToken(format!("{}.{}", unsigned, signature))
    }

    /// True when `token` carries a valid signature and is at most `max_age` old
    pub fn verify(&self, token: &str, max_age: Duration) -> bool {
        self.verify_at(token, Utc::now(), max_age)
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.check_at(token, now, max_age) {
            Ok(_) => true,
            Err(e) => {
                debug!(reason = %e, "TokenCodec::verify_at: rejected token");
                false
            }
        }
    }

    /// Verify `token` at `now`, returning its issue time or the rejection reason
    pub fn check_at(&self, token: &str, now: DateTime<Utc>, max_age: Duration) -> Result<DateTime<Utc>, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::Malformed);
        }

        let (unsigned, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let mut parts = unsigned.split('.');
        let (Some(payload), Some(_nonce), Some(issued), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };
        if payload != TOKEN_PAYLOAD {
            return Err(TokenError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = (*self.mac).clone();
        mac.update(unsigned.as_bytes());
        mac.verify_slice(&signature).map_err(|_| TokenError::BadSignature)?;

        let issued_bytes: [u8; 8] = URL_SAFE_NO_PAD
            .decode(issued)
            .map_err(|_| TokenError::Malformed)?
            .try_into()
            .map_err(|_| TokenError::Malformed)?;
        let issued_ms = i64::try_from(u64::from_be_bytes(issued_bytes)).map_err(|_| TokenError::Malformed)?;
        let issued_at = DateTime::from_timestamp_millis(issued_ms).ok_or(TokenError::Malformed)?;

        let age_ms = now.timestamp_millis() - issued_ms;
        if age_ms > max_age.as_millis() as i64 {
            return Err(TokenError::Expired);
        }

        Ok(issued_at)
    }

    fn sign(&self, message: &str) -> Vec<u8> {
        let mut mac = (*self.mac).clone();
        mac.update(message.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}
