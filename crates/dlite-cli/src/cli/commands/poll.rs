//! `dlite poll` – list pending task events.

use anyhow::{Context, Result};
use dlite_core::{CancelScope, ManagerClient};

pub fn run_poll(client: &ManagerClient, delegate_id: &str, scope: &CancelScope) -> Result<()> {
    let events = client
        .get_task_events(delegate_id, scope)
        .context("polling task events failed")?;
    if events.task_events.is_empty() {
        println!("No pending tasks.");
        return Ok(());
    }
    println!("{:<36} {:<16} {}", "TASK", "TYPE", "SYNC");
    for e in &events.task_events {
        println!("{:<36} {:<16} {}", e.task_id, e.task_type, e.sync);
    }
    Ok(())
}
