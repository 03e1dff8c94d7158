//! JSON payloads exchanged with the manager.
//!
//! Unknown fields are ignored and missing ones default, so the manager can add
//! fields without breaking older delegates.

use serde::{Deserialize, Serialize};

/// Delegate identity, sent on register and on every heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "delegateName")]
    pub name: String,
    /// Assigned by the manager; empty on first registration.
    #[serde(rename = "delegateId")]
    pub id: String,
    #[serde(rename = "delegateType")]
    pub delegate_type: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "lastHeartBeat")]
    pub last_heartbeat: i64,
    pub ng: bool,
    #[serde(rename = "pollingModeEnabled")]
    pub polling: bool,
    #[serde(rename = "hostName")]
    pub host_name: String,
    pub ip: String,
    #[serde(rename = "supportedTaskTypes")]
    pub supported_task_types: Vec<String>,
    pub tags: Vec<String>,
    #[serde(rename = "heartbeatAsObject")]
    pub heartbeat_as_object: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterResponse {
    #[serde(alias = "delegateId")]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskEventsResponse {
    #[serde(rename = "delegateTaskEvents")]
    pub task_events: Vec<TaskEvent>,
}

impl TaskEventsResponse {
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.task_events.iter().map(|e| e.task_id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskEvent {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "delegateTaskId")]
    pub task_id: String,
    pub sync: bool,
    #[serde(rename = "taskType")]
    pub task_type: String,
}

/// A task claimed through acquire. `data` is opaque to this client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub data: serde_json::Value,
    #[serde(rename = "async")]
    pub is_async: bool,
    /// Seconds.
    pub timeout: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskCode {
    #[default]
    Ok,
    Failed,
}

/// Terminal outcome of a task, reported through send status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskResponse {
    pub id: String,
    pub data: serde_json::Value,
    #[serde(rename = "type")]
    pub task_type: String,
    pub code: TaskCode,
}
