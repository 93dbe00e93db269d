use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What an event stream is read for. An event query addresses exactly one
/// of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Execution(String),
    ExecutionGroup(String),
}

impl EventTarget {
    pub fn id(&self) -> &str {
        match self {
            EventTarget::Execution(id) | EventTarget::ExecutionGroup(id) => id,
        }
    }
}

impl fmt::Display for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTarget::Execution(id) => write!(f, "execution {}", id),
            EventTarget::ExecutionGroup(id) => write!(f, "execution group {}", id),
        }
    }
}

/// Discriminates log records from workflow/task events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    #[serde(rename = "cloudify_event")]
    Event,
    #[serde(rename = "cloudify_log")]
    Log,
    /// Any record type this client does not render specially.
    #[serde(rename = "other", other)]
    Other,
}

/// An event exactly as the manager's events endpoint returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WireEvent {
    #[serde(default)]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub node_instance_id: Option<String>,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_causes: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<EventKind>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub reported_timestamp: Option<String>,
}

/// Event as handed to event handlers and renderers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub context: EventContext,
    pub message: EventMessage,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventContext {
    pub deployment_id: Option<String>,
    pub execution_id: Option<String>,
    pub node_id: Option<String>,
    pub node_name: Option<String>,
    pub operation: Option<String>,
    pub workflow_id: Option<String>,
    pub task_error_causes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventMessage {
    pub text: String,
    pub arguments: Option<Value>,
}

impl Event {
    pub fn is_log(&self) -> bool {
        self.kind == Some(EventKind::Log)
    }
}

impl From<WireEvent> for Event {
    fn from(wire: WireEvent) -> Self {
        adapt(wire)
    }
}

/// Moves the flat wire fields into the nested context shape:
/// `node_instance_id` becomes `context.node_id`, `error_causes` becomes
/// `context.task_error_causes`, and `message` becomes `{text, arguments}`.
pub fn adapt(wire: WireEvent) -> Event {
    Event {
        context: EventContext {
            deployment_id: wire.deployment_id,
            execution_id: wire.execution_id,
            node_id: wire.node_instance_id,
            node_name: wire.node_name,
            operation: wire.operation,
            workflow_id: wire.workflow_id,
            task_error_causes: wire.error_causes,
            source_id: wire.source_id,
            target_id: wire.target_id,
        },
        message: EventMessage {
            text: wire.message.unwrap_or_default(),
            arguments: None,
        },
        kind: wire.kind,
        event_type: wire.event_type,
        level: wire.level,
        timestamp: wire.timestamp,
        reported_timestamp: wire.reported_timestamp,
    }
}
