//! `dlite send-status` – report a task outcome.

use anyhow::{Context, Result};
use dlite_core::{CancelScope, ManagerClient, TaskCode, TaskResponse};

pub fn run_send_status(
    client: &ManagerClient,
    delegate_id: &str,
    task_id: &str,
    code: TaskCode,
    task_type: String,
    data: Option<&str>,
    scope: &CancelScope,
) -> Result<()> {
    let resp = TaskResponse {
        id: task_id.to_string(),
        data: parse_data(data)?,
        task_type,
        code,
    };
    client
        .send_status(delegate_id, task_id, &resp, scope)
        .with_context(|| format!("sending status for task {}", task_id))?;
    println!("status sent for task {}", task_id);
    Ok(())
}

/// `--data` must be a JSON document; absent means `null`.
pub(crate) fn parse_data(data: Option<&str>) -> Result<serde_json::Value> {
    match data {
        Some(raw) => serde_json::from_str(raw).context("--data is not valid JSON"),
        None => Ok(serde_json::Value::Null),
    }
}
