//! HTTP transport seam.
//!
//! The executor hands a fully built [`WireRequest`] to a [`Transport`] and
//! gets back the status and body. The default transport is libcurl
//! ([`CurlTransport`]); tests substitute scripted transports.

mod easy;

pub use easy::{classify_curl_error, CurlTransport};

use crate::control::CancelScope;
use crate::error::ClientError;
use std::time::Duration;

/// One outgoing request, ready for the wire.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireRequest {
    /// First header value with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends one request and waits for the response.
///
/// Implementations must consume the whole response body and release the
/// connection before returning, on success and on error. Errors are limited
/// to `ClientError::Transport` (nothing usable came back) and
/// `ClientError::Cancelled` (the scope ended while waiting).
pub trait Transport: Send + Sync {
    fn send(&self, request: &WireRequest, scope: &CancelScope) -> Result<WireResponse, ClientError>;
}

/// Knobs for the curl transport.
#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    /// Whole-transfer timeout; zero disables it. Always clamped to the
    /// scope's deadline.
    pub request_timeout: Duration,
    /// Disable TLS peer and host verification.
    pub skip_verify: bool,
    /// Bytes of response body kept; the rest is read and dropped.
    pub max_body_bytes: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(60),
            skip_verify: false,
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}
