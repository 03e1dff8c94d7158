//! Retry state machine: repeat an attempt until it succeeds, fails terminally,
//! the backoff ceiling is reached, or the caller's scope ends.

use super::classify::classify;
use super::policy::ExponentialBackoff;
use crate::clock::Sleeper;
use crate::control::CancelScope;
use crate::error::ClientError;
use std::time::Duration;

enum State<T> {
    Attempting,
    Retrying(Duration),
    Success(T),
    Failed(ClientError),
}

/// State of one resilient call. Created when the call starts and consumed by
/// [`RetrySession::run`], so it cannot outlive the call.
pub struct RetrySession<'a> {
    backoff: ExponentialBackoff,
    sleeper: &'a dyn Sleeper,
    scope: &'a CancelScope,
    attempts: u32,
}

impl<'a> RetrySession<'a> {
    pub fn new(backoff: ExponentialBackoff, sleeper: &'a dyn Sleeper, scope: &'a CancelScope) -> Self {
        Self {
            backoff,
            sleeper,
            scope,
            attempts: 0,
        }
    }

    /// Drive `attempt` to a terminal result. Attempts run strictly one after
    /// another on the calling thread.
    pub fn run<T, F>(mut self, mut attempt: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Result<T, ClientError>,
    {
        let mut state = State::Attempting;
        loop {
            state = match state {
                State::Attempting => {
                    self.attempts += 1;
                    let outcome = attempt();
                    // A cancelled scope overrides whatever the attempt returned.
                    if let Some(reason) = self.scope.reason() {
                        tracing::warn!(attempt = self.attempts, "http: {}", reason);
                        State::Failed(ClientError::Cancelled(reason))
                    } else {
                        match outcome {
                            Ok(value) => State::Success(value),
                            Err(err) => self.after_failure(err),
                        }
                    }
                }
                State::Retrying(wait) => match self.sleeper.sleep(wait, self.scope) {
                    Ok(()) => State::Attempting,
                    Err(reason) => {
                        tracing::warn!(attempt = self.attempts, "http: {} during backoff", reason);
                        State::Failed(ClientError::Cancelled(reason))
                    }
                },
                State::Success(value) => {
                    if self.attempts > 1 {
                        tracing::debug!(attempts = self.attempts, "http: succeeded after retry");
                    }
                    return Ok(value);
                }
                State::Failed(err) => return Err(err),
            };
        }
    }

    fn after_failure<T>(&mut self, err: ClientError) -> State<T> {
        let kind = classify(&err);
        if !kind.is_retryable() {
            tracing::debug!(attempt = self.attempts, ?kind, "http: not retrying: {}", err);
            return State::Failed(err);
        }
        match self.backoff.next_backoff() {
            Some(wait) => {
                tracing::warn!(
                    attempt = self.attempts,
                    ?kind,
                    wait_ms = wait.as_millis() as u64,
                    "http: retryable failure, backing off: {}",
                    err
                );
                State::Retrying(wait)
            }
            None => {
                tracing::error!(
                    attempts = self.attempts,
                    elapsed_ms = self.backoff.elapsed().as_millis() as u64,
                    max_elapsed_ms = self.backoff.max_elapsed().as_millis() as u64,
                    "http: retry budget exhausted: {}",
                    err
                );
                State::Failed(err)
            }
        }
    }
}

/// Run `attempt` with retries under `backoff`, sleeping through `sleeper`.
pub fn run_with_retry<T, F>(
    backoff: ExponentialBackoff,
    sleeper: &dyn Sleeper,
    scope: &CancelScope,
    attempt: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Result<T, ClientError>,
{
    RetrySession::new(backoff, sleeper, scope).run(attempt)
}
