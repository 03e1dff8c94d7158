//! `dlite register` – register and print the assigned delegate id.

use anyhow::{Context, Result};
use dlite_core::{CancelScope, ManagerClient};

use super::identity_request;
use crate::cli::IdentityArgs;

pub fn run_register(client: &ManagerClient, identity: &IdentityArgs, scope: &CancelScope) -> Result<()> {
    let req = identity_request(client.account_id(), "", identity);
    let resp = client.register(&req, scope).context("register failed")?;
    if resp.id.is_empty() {
        println!("registered (manager returned no id)");
    } else {
        println!("{}", resp.id);
    }
    Ok(())
}
