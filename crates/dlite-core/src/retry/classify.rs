//! Classify failed attempts into retry policy error kinds.

use crate::error::{ClientError, TransportErrorKind};

/// Classifier's view of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Token source failed.
    Credential,
    /// Request payload could not be serialized.
    Encode,
    /// No response received (DNS, connect, timeout, reset).
    Transport,
    /// Request could not be built by the transport.
    Setup,
    /// Status above 501 (502, 503, 504, ...): infrastructure trouble.
    ServerRetryable(u16),
    /// 500 or 501: treated as an application error on the manager.
    ServerTerminal(u16),
    /// 3xx/4xx.
    Client(u16),
    /// 2xx body did not match the expected shape.
    Decode,
    /// The caller's scope ended.
    Cancelled,
}

impl ErrorKind {
    /// Only transport failures and statuses above 501 are retried.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transport | ErrorKind::ServerRetryable(_))
    }
}

/// Classify an HTTP status code. `None` for success (< 300).
pub fn classify_http_status(code: u16) -> Option<ErrorKind> {
    match code {
        0..=299 => None,
        300..=499 => Some(ErrorKind::Client(code)),
        500 | 501 => Some(ErrorKind::ServerTerminal(code)),
        _ => Some(ErrorKind::ServerRetryable(code)),
    }
}

pub fn classify(err: &ClientError) -> ErrorKind {
    match err {
        ClientError::Credential(_) => ErrorKind::Credential,
        ClientError::Encode(_) => ErrorKind::Encode,
        ClientError::Transport(t) if t.kind == TransportErrorKind::Setup => ErrorKind::Setup,
        ClientError::Transport(_) => ErrorKind::Transport,
        ClientError::Status { status, .. } => {
            classify_http_status(*status).unwrap_or(ErrorKind::Client(*status))
        }
        ClientError::Decode(_) => ErrorKind::Decode,
        ClientError::Cancelled(_) => ErrorKind::Cancelled,
    }
}
