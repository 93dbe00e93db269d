use crate::error::ManagerError;
use crate::event::{EventTarget, WireEvent};
use crate::execution::{Execution, ExecutionGroup};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Sort key the events endpoint orders by; ascending report time keeps
/// batches chronological.
pub const EVENTS_SORT_KEY: &str = "reported_timestamp";

/// One page request against the events endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub target: EventTarget,
    pub offset: usize,
    pub size: usize,
    pub sort: &'static str,
    pub include_logs: bool,
    pub from_datetime: Option<DateTime<Utc>>,
}

/// One page of events plus the manager's current count of events for the
/// target. The total may grow between calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    pub items: Vec<WireEvent>,
    pub total: u64,
}

/// Request to start a workflow on a deployment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartRequest {
    pub deployment_id: String,
    pub workflow_id: String,
    pub parameters: Map<String, Value>,
    pub allow_custom_parameters: bool,
    pub force: bool,
}

impl StartRequest {
    pub fn new(deployment_id: &str, workflow_id: &str) -> Self {
        Self {
            deployment_id: deployment_id.to_string(),
            workflow_id: workflow_id.to_string(),
            ..Default::default()
        }
    }
}

/// Boundary to the orchestration manager. Implementations block on I/O and
/// are shared across fan-out worker threads.
pub trait RemoteExecutionGateway: Send + Sync {
    /// Fails with `ManagerError::NotFound` if the execution does not exist.
    fn get_execution(&self, id: &str) -> Result<Execution, ManagerError>;

    /// Fails with `ManagerError::NotFound` if the group does not exist.
    fn get_execution_group(&self, id: &str) -> Result<ExecutionGroup, ManagerError>;

    fn list_executions(&self, deployment_id: Option<&str>)
        -> Result<Vec<Execution>, ManagerError>;

    fn list_events(&self, query: &EventQuery) -> Result<EventPage, ManagerError>;

    fn start_execution(&self, request: &StartRequest) -> Result<Execution, ManagerError>;

    fn cancel_execution(&self, id: &str, force: bool) -> Result<(), ManagerError>;
}
