//! `dlite acquire` – claim a task and print it as JSON.

use anyhow::{Context, Result};
use dlite_core::{CancelScope, ManagerClient};

pub fn run_acquire(
    client: &ManagerClient,
    delegate_id: &str,
    task_id: &str,
    scope: &CancelScope,
) -> Result<()> {
    let task = client
        .acquire(delegate_id, task_id, scope)
        .with_context(|| format!("acquiring task {}", task_id))?;
    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}
