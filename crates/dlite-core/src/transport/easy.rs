//! libcurl transport built on `curl::easy`.
//!
//! Easy handles are pooled so their connection caches survive between calls.
//! Transfers are aborted through the progress callback when the caller's
//! scope ends, and the transfer timeout never exceeds the scope's deadline.

use super::{Transport, TransportOptions, WireRequest, WireResponse};
use crate::control::{CancelReason, CancelScope};
use crate::error::{ClientError, TransportError, TransportErrorKind};
use curl::easy::{Easy, List};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Idle handles kept for reuse.
const MAX_IDLE_HANDLES: usize = 8;

pub struct CurlTransport {
    options: TransportOptions,
    idle: Mutex<Vec<Easy>>,
}

impl CurlTransport {
    pub fn new(options: TransportOptions) -> Self {
        if options.skip_verify {
            tracing::warn!("TLS certificate verification disabled for manager connections");
        }
        Self {
            options,
            idle: Mutex::new(Vec::new()),
        }
    }

    fn checkout(&self) -> Easy {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(Easy::new)
    }

    fn checkin(&self, mut easy: Easy) {
        // reset() clears options but keeps the connection cache.
        easy.reset();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < MAX_IDLE_HANDLES {
            idle.push(easy);
        }
    }

    /// Returns true when the scope's deadline, not the configured request
    /// timeout, bounds the transfer.
    fn configure(
        &self,
        easy: &mut Easy,
        request: &WireRequest,
        scope: &CancelScope,
    ) -> Result<bool, curl::Error> {
        easy.url(&request.url)?;
        // Redirects surface to the caller as 3xx errors.
        easy.follow_location(false)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        let (timeout, deadline_bound) =
            transfer_timeout(self.options.request_timeout, scope.remaining());
        easy.timeout(timeout)?;
        easy.progress(true)?;
        if self.options.skip_verify {
            easy.ssl_verify_peer(false)?;
            easy.ssl_verify_host(false)?;
        }

        match request.method {
            http::Method::GET => easy.get(true)?,
            http::Method::POST => {
                easy.post(true)?;
                easy.post_fields_copy(&request.body)?;
            }
            ref other => {
                easy.custom_request(other.as_str())?;
                easy.post(true)?;
                easy.post_fields_copy(&request.body)?;
            }
        }

        let mut list = List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        // No 100-continue round trip for small JSON bodies.
        list.append("Expect:")?;
        easy.http_headers(list)?;
        Ok(deadline_bound)
    }

    fn perform(
        &self,
        easy: &mut Easy,
        request: &WireRequest,
        scope: &CancelScope,
    ) -> Result<WireResponse, ClientError> {
        let deadline_bound = self
            .configure(easy, request, scope)
            .map_err(|e| TransportError::new(TransportErrorKind::Setup, e.to_string()))?;

        let mut body = Vec::new();
        if let Err(e) = transfer(easy, &mut body, self.options.max_body_bytes, scope) {
            return Err(transfer_error(&e, scope, deadline_bound));
        }

        let status = easy
            .response_code()
            .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?;
        Ok(WireResponse {
            status: u16::try_from(status).unwrap_or(u16::MAX),
            body,
        })
    }
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(TransportOptions::default())
    }
}

impl Transport for CurlTransport {
    fn send(&self, request: &WireRequest, scope: &CancelScope) -> Result<WireResponse, ClientError> {
        if let Some(reason) = scope.reason() {
            return Err(ClientError::Cancelled(reason));
        }
        let mut easy = self.checkout();
        let result = self.perform(&mut easy, request, scope);
        self.checkin(easy);
        result
    }
}

/// Run the transfer, keeping at most `cap` bytes of the body. The rest is
/// still read so the connection ends in a reusable state.
fn transfer(
    easy: &mut Easy,
    body: &mut Vec<u8>,
    cap: usize,
    scope: &CancelScope,
) -> Result<(), curl::Error> {
    let mut transfer = easy.transfer();
    transfer.write_function(|data| {
        let room = cap.saturating_sub(body.len());
        body.extend_from_slice(&data[..data.len().min(room)]);
        Ok(data.len())
    })?;
    // Returning false aborts the transfer.
    transfer.progress_function(|_, _, _, _| !scope.is_done())?;
    transfer.perform()
}

/// Curl timeout for the transfer, and whether it comes from the scope's
/// deadline. Curl treats 0 as "no timeout"; the scope deadline always wins.
fn transfer_timeout(configured: Duration, remaining: Option<Duration>) -> (Duration, bool) {
    match remaining {
        Some(left) => {
            let left = left.max(Duration::from_millis(1));
            if configured.is_zero() || left < configured {
                (left, true)
            } else {
                (configured, false)
            }
        }
        None => (configured, false),
    }
}

/// Error for a failed transfer. A curl timeout set from the scope's deadline
/// can fire just before the deadline itself passes; it is still the deadline.
fn transfer_error(e: &curl::Error, scope: &CancelScope, deadline_bound: bool) -> ClientError {
    if let Some(reason) = scope.reason() {
        return ClientError::Cancelled(reason);
    }
    if deadline_bound && e.is_operation_timedout() {
        return ClientError::Cancelled(CancelReason::DeadlineExceeded);
    }
    TransportError::new(classify_curl_error(e), e.to_string()).into()
}

/// Map a curl error to the transport failure it represents.
pub fn classify_curl_error(e: &curl::Error) -> TransportErrorKind {
    if e.is_operation_timedout() {
        return TransportErrorKind::Timeout;
    }
    if e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
        return TransportErrorKind::Dns;
    }
    if e.is_couldnt_connect() {
        return TransportErrorKind::Connect;
    }
    if e.is_ssl_connect_error()
        || e.is_peer_failed_verification()
        || e.is_ssl_certproblem()
        || e.is_ssl_cacert_badfile()
    {
        return TransportErrorKind::Tls;
    }
    if e.is_send_error() {
        return TransportErrorKind::Send;
    }
    if e.is_recv_error() || e.is_read_error() || e.is_got_nothing() || e.is_partial_file() {
        return TransportErrorKind::Receive;
    }
    if e.is_url_malformed() || e.is_unsupported_protocol() {
        return TransportErrorKind::Setup;
    }
    TransportErrorKind::Other
}
