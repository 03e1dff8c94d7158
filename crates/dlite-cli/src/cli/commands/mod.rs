//! CLI command handlers, one endpoint per file.

mod acquire;
mod heartbeat;
mod poll;
mod register;
mod send_status;

pub use acquire::run_acquire;
pub use heartbeat::run_heartbeat;
pub use poll::run_poll;
pub use register::run_register;
pub use send_status::run_send_status;
pub(crate) use send_status::parse_data;

use crate::cli::IdentityArgs;
use dlite_core::RegisterRequest;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity payload shared by register and heartbeat.
pub(crate) fn identity_request(
    account_id: &str,
    delegate_id: &str,
    identity: &IdentityArgs,
) -> RegisterRequest {
    let host_name = identity
        .host_name
        .clone()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| identity.name.clone());
    RegisterRequest {
        account_id: account_id.to_string(),
        name: identity.name.clone(),
        id: delegate_id.to_string(),
        last_heartbeat: now_millis(),
        polling: true,
        host_name,
        tags: identity.tags.clone(),
        heartbeat_as_object: true,
        ..RegisterRequest::default()
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
