use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an execution or execution group as reported by the manager.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Started,
    Queued,
    Scheduled,
    Cancelling,
    ForceCancelling,
    KillCancelling,
    Terminated,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Statuses an execution never leaves.
pub const END_STATES: [ExecutionStatus; 3] = [
    ExecutionStatus::Terminated,
    ExecutionStatus::Failed,
    ExecutionStatus::Cancelled,
];

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        END_STATES.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Started => "started",
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Scheduled => "scheduled",
            ExecutionStatus::Cancelling => "cancelling",
            ExecutionStatus::ForceCancelling => "force_cancelling",
            ExecutionStatus::KillCancelling => "kill_cancelling",
            ExecutionStatus::Terminated => "terminated",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::Unknown => "unknown",
        }
    }

    pub fn is_cancelling(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Cancelling
                | ExecutionStatus::ForceCancelling
                | ExecutionStatus::KillCancelling
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a single workflow run against one deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Execution {
    pub id: String,
    pub status: ExecutionStatus,
    pub workflow_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deployment_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl Execution {
    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Snapshot of a batch of related executions tracked under one id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionGroup {
    pub id: String,
    pub status: ExecutionStatus,
    pub workflow_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deployment_group_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ExecutionGroup {
    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// The manager sends explicit nulls (e.g. `"error": null` for executions
/// that have not failed).
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
