//! Retry and backoff for resilient manager calls.
//!
//! `classify` decides whether a failed attempt is worth repeating, `policy`
//! produces the waits between attempts under an elapsed-time ceiling, and
//! `run` ties them together into the per-call retry state machine.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_http_status, ErrorKind};
pub use policy::{BackoffSettings, ExponentialBackoff};
pub use run::{run_with_retry, RetrySession};
