use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("events/log fetching timed out for {id}")]
    EventProcessingTimeout { id: String },

    #[error(
        "execution {execution_id} of workflow {workflow_id} for deployment {deployment_id} timed out"
    )]
    ExecutionTimeout {
        execution_id: String,
        workflow_id: String,
        deployment_id: String,
    },

    #[error(
        "execution group {group_id} of workflow {workflow_id} for deployment group {deployment_group_id} timed out"
    )]
    ExecutionGroupTimeout {
        group_id: String,
        workflow_id: String,
        deployment_group_id: String,
    },

    #[error("Manager returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No deployments given to run the workflow on")]
    NoDeployments,

    #[error("{summary}")]
    FanOutFailed { summary: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ManagerError {
    pub fn execution_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "Execution",
            id: id.to_string(),
        }
    }

    pub fn execution_group_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "Execution group",
            id: id.to_string(),
        }
    }

    /// The failure was already reported to the user in full; callers should
    /// exit non-zero without printing it again.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::FanOutFailed { .. })
    }

    /// True when a wait gave up on an execution (or group) that may still
    /// be running on the manager.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ExecutionTimeout { .. } | Self::ExecutionGroupTimeout { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
