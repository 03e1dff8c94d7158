//! Error returned by every manager call.
//!
//! Kept as one enum so the retry classifier can tell transient failures from
//! terminal ones without string matching.

use crate::control::CancelReason;
use crate::credentials::CredentialError;
use std::fmt;
use thiserror::Error;

/// What went wrong below HTTP: no response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Timeout,
    Tls,
    Send,
    Receive,
    /// The request could not be built (bad URL, unsupported option). Not
    /// retried: it fails the same way every time.
    Setup,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransportErrorKind::Dns => "dns",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Tls => "tls",
            TransportErrorKind::Send => "send",
            TransportErrorKind::Receive => "receive",
            TransportErrorKind::Setup => "setup",
            TransportErrorKind::Other => "other",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// The token source failed; nothing was sent.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Request payload could not be serialized (strict mode only).
    #[error("encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Non-2xx response. `message` is the response body verbatim, or the
    /// status reason phrase when the body was empty.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The caller's scope ended.
    #[error("{0}")]
    Cancelled(CancelReason),
}

impl ClientError {
    /// HTTP status code, for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled(_))
    }
}
