//! Bearer token supply.
//!
//! The request executor only depends on [`TokenSource`] and asks it for a
//! token on every attempt, so a token rotated in the middle of a retry loop is
//! picked up by the next attempt. Minting tokens is somebody else's job; a
//! [`TokenCache`] wraps a [`TokenMinter`] and re-mints once the cached token
//! is older than its TTL.

use crate::clock::{Clock, SystemClock};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("no delegate token configured")]
    Missing,
    #[error("token mint failed: {0}")]
    Mint(String),
}

/// Capability to retrieve the current bearer token. Must be safe to call from
/// many threads at once.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Result<String, CredentialError>;
}

/// A fixed token (e.g. the account secret from config).
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Result<String, CredentialError> {
        if self.0.is_empty() {
            return Err(CredentialError::Missing);
        }
        Ok(self.0.clone())
    }
}

/// Produces a new token. Implemented for plain closures.
pub trait TokenMinter: Send + Sync {
    fn mint(&self) -> anyhow::Result<String>;
}

impl<F> TokenMinter for F
where
    F: Fn() -> anyhow::Result<String> + Send + Sync,
{
    fn mint(&self) -> anyhow::Result<String> {
        self()
    }
}

struct Cached {
    token: String,
    minted_at: Instant,
}

/// Caches a minted token for `ttl`. Concurrent callers share one cached
/// value; only one of them re-mints when it goes stale.
pub struct TokenCache<M> {
    minter: M,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    cached: RwLock<Option<Cached>>,
}

impl<M: TokenMinter> TokenCache<M> {
    pub fn new(minter: M, ttl: Duration) -> Self {
        Self::with_clock(minter, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(minter: M, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            minter,
            ttl,
            clock,
            cached: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call re-mints.
    pub fn invalidate(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn fresh(&self, cached: &Option<Cached>) -> Option<String> {
        cached
            .as_ref()
            .filter(|c| self.clock.now().saturating_duration_since(c.minted_at) < self.ttl)
            .map(|c| c.token.clone())
    }
}

impl<M: TokenMinter> TokenSource for TokenCache<M> {
    fn token(&self) -> Result<String, CredentialError> {
        {
            let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(token) = self.fresh(&cached) {
                return Ok(token);
            }
        }

        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have re-minted while we waited for the lock.
        if let Some(token) = self.fresh(&cached) {
            return Ok(token);
        }
        let token = self
            .minter
            .mint()
            .map_err(|e| CredentialError::Mint(format!("{:#}", e)))?;
        if token.is_empty() {
            return Err(CredentialError::Missing);
        }
        tracing::debug!("minted new delegate token");
        *cached = Some(Cached {
            token: token.clone(),
            minted_at: self.clock.now(),
        });
        Ok(token)
    }
}
