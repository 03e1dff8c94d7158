//! `dlite heartbeat` – send one heartbeat.

use anyhow::{Context, Result};
use dlite_core::{CancelScope, ManagerClient};

use super::identity_request;
use crate::cli::IdentityArgs;

pub fn run_heartbeat(
    client: &ManagerClient,
    delegate_id: &str,
    identity: &IdentityArgs,
    scope: &CancelScope,
) -> Result<()> {
    let req = identity_request(client.account_id(), delegate_id, identity);
    client.heartbeat(&req, scope).context("heartbeat failed")?;
    println!("heartbeat sent");
    Ok(())
}
