//! Session error types

use thiserror::Error;

/// Errors surfaced by the session store and codec construction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session secret not found. Set the {0} environment variable.")]
    MissingSecret(String),

    #[error("Session secret must not be empty")]
    EmptySecret,

    #[error("No active session")]
    NoActiveSession,
}

/// Why a token failed verification
///
/// Callers normally only care that a token is invalid; the reason is kept
/// for logging.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token has expired")]
    Expired,
}
