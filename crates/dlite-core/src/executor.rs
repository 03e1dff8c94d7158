//! One request/response cycle against the manager.
//!
//! Serialize the payload, fetch a token, send through the transport, turn the
//! status into success or a `ClientError`, and decode the body when the
//! caller asked for one. No retrying happens here; see `retry`.

use crate::control::CancelScope;
use crate::credentials::TokenSource;
use crate::error::ClientError;
use crate::transport::{Transport, WireRequest, WireResponse};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Path, method and optional JSON payload of one call.
#[derive(Debug, Clone)]
pub struct Request<'a, I: ?Sized = ()> {
    pub method: Method,
    pub path: String,
    pub body: Option<&'a I>,
}

impl Request<'static, ()> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }
}

impl<'a, I: ?Sized> Request<'a, I> {
    /// Attach a payload to be sent as JSON.
    pub fn json<'b, J: Serialize + ?Sized>(self, body: &'b J) -> Request<'b, J> {
        Request {
            method: self.method,
            path: self.path,
            body: Some(body),
        }
    }
}

/// Sends single requests. Cheap to share: the token source and transport are
/// reference counted.
#[derive(Clone)]
pub struct Executor {
    endpoint: String,
    tokens: Arc<dyn TokenSource>,
    transport: Arc<dyn Transport>,
    strict_encode: bool,
}

impl Executor {
    pub fn new(
        endpoint: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            tokens,
            transport,
            strict_encode: false,
        }
    }

    /// Fail with `ClientError::Encode` instead of sending an empty body when
    /// the payload cannot be serialized.
    pub fn strict_encode(mut self, strict: bool) -> Self {
        self.strict_encode = strict;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send and discard any response body.
    pub fn execute<I>(&self, request: &Request<'_, I>, scope: &CancelScope) -> Result<(), ClientError>
    where
        I: Serialize + ?Sized,
    {
        self.perform(request, scope).map(|_| ())
    }

    /// Send and decode the response body as `O`. `Ok(None)` on 204: nothing
    /// is decoded even though an output was requested.
    pub fn execute_json<I, O>(
        &self,
        request: &Request<'_, I>,
        scope: &CancelScope,
    ) -> Result<Option<O>, ClientError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        match self.perform(request, scope)? {
            Some(body) => serde_json::from_slice(&body)
                .map(Some)
                .map_err(ClientError::Decode),
            None => Ok(None),
        }
    }

    fn perform<I>(
        &self,
        request: &Request<'_, I>,
        scope: &CancelScope,
    ) -> Result<Option<Vec<u8>>, ClientError>
    where
        I: Serialize + ?Sized,
    {
        let body = self.encode(request)?;
        let token = self.tokens.token()?;

        let wire = WireRequest {
            method: request.method.clone(),
            url: format!("{}{}", self.endpoint, request.path),
            headers: vec![
                ("Authorization".to_string(), format!("Delegate {}", token)),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        };
        let response = self.transport.send(&wire, scope)?;
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            "http: response"
        );
        into_body(response)
    }

    fn encode<I>(&self, request: &Request<'_, I>) -> Result<Vec<u8>, ClientError>
    where
        I: Serialize + ?Sized,
    {
        let Some(payload) = request.body else {
            return Ok(Vec::new());
        };
        match serde_json::to_vec(payload) {
            Ok(bytes) => Ok(bytes),
            Err(e) if self.strict_encode => Err(ClientError::Encode(e)),
            Err(e) => {
                // Degraded mode: the manager gets an empty body and decides.
                tracing::warn!(path = %request.path, "http: cannot encode request body, sending empty body: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

/// 204 → no body; > 299 → status error; otherwise the body.
fn into_body(response: WireResponse) -> Result<Option<Vec<u8>>, ClientError> {
    if response.status == 204 {
        return Ok(None);
    }
    if response.status > 299 {
        let message = if response.body.is_empty() {
            reason_phrase(response.status)
        } else {
            String::from_utf8_lossy(&response.body).into_owned()
        };
        return Err(ClientError::Status {
            status: response.status,
            message,
        });
    }
    Ok(Some(response.body))
}

/// Standard reason phrase, or `status code <n>` for unregistered codes.
pub fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("status code {}", status))
}
