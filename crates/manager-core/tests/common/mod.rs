#![allow(dead_code)]

use manager_core::clock::ManualClock;
use manager_core::event::{EventTarget, WireEvent};
use manager_core::execution::{Execution, ExecutionGroup, ExecutionStatus};
use manager_core::gateway::{EventPage, EventQuery, RemoteExecutionGateway, StartRequest};
use manager_core::ManagerError;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Status sequence returned by successive `get` calls; the last entry
/// repeats forever.
#[derive(Debug, Clone)]
struct Script {
    statuses: VecDeque<ExecutionStatus>,
    workflow_id: String,
    owner_id: String,
    error: String,
}

impl Script {
    fn next(&mut self) -> ExecutionStatus {
        if self.statuses.len() > 1 {
            self.statuses.pop_front().unwrap()
        } else {
            *self.statuses.front().unwrap()
        }
    }
}

/// In-memory manager used by the integration tests.
#[derive(Default)]
pub struct FakeGateway {
    executions: Mutex<HashMap<String, Script>>,
    groups: Mutex<HashMap<String, Script>>,
    events: Mutex<Vec<WireEvent>>,
    endless_events: bool,
    list_advance: Option<(Arc<ManualClock>, Duration)>,
    deployment_statuses: HashMap<String, Vec<ExecutionStatus>>,
    deployment_errors: HashMap<String, String>,
    failing_starts: Vec<String>,
    pub started: Mutex<Vec<(String, String)>>,
    pub get_execution_calls: AtomicUsize,
    pub get_group_calls: AtomicUsize,
    pub list_events_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub queries: Mutex<Vec<EventQuery>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution(self, id: &str, statuses: &[ExecutionStatus]) -> Self {
        self.executions
            .lock()
            .unwrap()
            .insert(id.to_string(), script(statuses, "install", "dep-1", ""));
        self
    }

    pub fn with_group(self, id: &str, statuses: &[ExecutionStatus]) -> Self {
        self.groups
            .lock()
            .unwrap()
            .insert(id.to_string(), script(statuses, "install", "group-1", ""));
        self
    }

    pub fn with_events(self, count: usize) -> Self {
        self.add_events(count);
        self
    }

    /// Every page comes back full, however far the offset goes.
    pub fn with_endless_events(mut self) -> Self {
        self.endless_events = true;
        self
    }

    /// Each `list_events` call moves `clock` forward by `by`.
    pub fn advancing_on_list(mut self, clock: Arc<ManualClock>, by: Duration) -> Self {
        self.list_advance = Some((clock, by));
        self
    }

    /// Status sequence for executions started on `deployment_id`.
    pub fn with_deployment(mut self, deployment_id: &str, statuses: &[ExecutionStatus]) -> Self {
        self.deployment_statuses
            .insert(deployment_id.to_string(), statuses.to_vec());
        self
    }

    pub fn with_deployment_error(mut self, deployment_id: &str, error: &str) -> Self {
        self.deployment_errors
            .insert(deployment_id.to_string(), error.to_string());
        self
    }

    pub fn failing_start(mut self, deployment_id: &str) -> Self {
        self.failing_starts.push(deployment_id.to_string());
        self
    }

    pub fn add_events(&self, count: usize) {
        let mut events = self.events.lock().unwrap();
        let start = events.len();
        for i in start..start + count {
            events.push(wire_event(i));
        }
    }

    pub fn execution_for(&self, deployment_id: &str) -> Option<String> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .find(|(dep, _)| dep == deployment_id)
            .map(|(_, id)| id.clone())
    }
}

fn script(statuses: &[ExecutionStatus], workflow_id: &str, owner_id: &str, error: &str) -> Script {
    Script {
        statuses: statuses.iter().copied().collect(),
        workflow_id: workflow_id.to_string(),
        owner_id: owner_id.to_string(),
        error: error.to_string(),
    }
}

pub fn wire_event(index: usize) -> WireEvent {
    WireEvent {
        deployment_id: Some("dep-1".into()),
        execution_id: Some("exec-1".into()),
        node_instance_id: Some(format!("node_{}", index)),
        node_name: Some("node".into()),
        operation: Some("create".into()),
        workflow_id: Some("install".into()),
        message: Some(format!("event {}", index)),
        ..Default::default()
    }
}

pub fn execution(id: &str, status: ExecutionStatus) -> Execution {
    Execution {
        id: id.to_string(),
        status,
        workflow_id: "install".into(),
        deployment_id: "dep-1".into(),
        error: String::new(),
        created_at: None,
        parameters: Default::default(),
    }
}

pub fn group(id: &str, status: ExecutionStatus) -> ExecutionGroup {
    ExecutionGroup {
        id: id.to_string(),
        status,
        workflow_id: "install".into(),
        deployment_group_id: "group-1".into(),
        error: String::new(),
        created_at: None,
    }
}

impl RemoteExecutionGateway for FakeGateway {
    fn get_execution(&self, id: &str) -> Result<Execution, ManagerError> {
        self.get_execution_calls.fetch_add(1, Ordering::SeqCst);
        let mut executions = self.executions.lock().unwrap();
        let script = executions
            .get_mut(id)
            .ok_or_else(|| ManagerError::execution_not_found(id))?;
        Ok(Execution {
            id: id.to_string(),
            status: script.next(),
            workflow_id: script.workflow_id.clone(),
            deployment_id: script.owner_id.clone(),
            error: script.error.clone(),
            created_at: None,
            parameters: Default::default(),
        })
    }

    fn get_execution_group(&self, id: &str) -> Result<ExecutionGroup, ManagerError> {
        self.get_group_calls.fetch_add(1, Ordering::SeqCst);
        let mut groups = self.groups.lock().unwrap();
        let script = groups
            .get_mut(id)
            .ok_or_else(|| ManagerError::execution_group_not_found(id))?;
        Ok(ExecutionGroup {
            id: id.to_string(),
            status: script.next(),
            workflow_id: script.workflow_id.clone(),
            deployment_group_id: script.owner_id.clone(),
            error: script.error.clone(),
            created_at: None,
        })
    }

    fn list_executions(&self, deployment_id: Option<&str>) -> Result<Vec<Execution>, ManagerError> {
        let executions = self.executions.lock().unwrap();
        Ok(executions
            .iter()
            .filter(|(_, s)| deployment_id.map_or(true, |d| s.owner_id == d))
            .map(|(id, s)| Execution {
                id: id.clone(),
                status: *s.statuses.front().unwrap(),
                workflow_id: s.workflow_id.clone(),
                deployment_id: s.owner_id.clone(),
                error: s.error.clone(),
                created_at: None,
                parameters: Default::default(),
            })
            .collect())
    }

    fn list_events(&self, query: &EventQuery) -> Result<EventPage, ManagerError> {
        self.list_events_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        if let Some((clock, by)) = &self.list_advance {
            clock.advance(*by);
        }

        if self.endless_events {
            let items = (query.offset..query.offset + query.size)
                .map(wire_event)
                .collect();
            return Ok(EventPage {
                items,
                total: (query.offset + query.size) as u64 + 1,
            });
        }

        let events = self.events.lock().unwrap();
        let start = query.offset.min(events.len());
        let end = (query.offset + query.size).min(events.len());
        Ok(EventPage {
            items: events[start..end].to_vec(),
            total: events.len() as u64,
        })
    }

    fn start_execution(&self, request: &StartRequest) -> Result<Execution, ManagerError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_starts.contains(&request.deployment_id) {
            return Err(ManagerError::Api {
                status: 400,
                message: format!("deployment {} is not ready", request.deployment_id),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let statuses = self
            .deployment_statuses
            .get(&request.deployment_id)
            .cloned()
            .unwrap_or_else(|| vec![ExecutionStatus::Started, ExecutionStatus::Terminated]);
        let error = self
            .deployment_errors
            .get(&request.deployment_id)
            .cloned()
            .unwrap_or_default();

        self.executions.lock().unwrap().insert(
            id.clone(),
            script(&statuses, &request.workflow_id, &request.deployment_id, &error),
        );
        self.started
            .lock()
            .unwrap()
            .push((request.deployment_id.clone(), id.clone()));

        Ok(Execution {
            id,
            status: ExecutionStatus::Pending,
            workflow_id: request.workflow_id.clone(),
            deployment_id: request.deployment_id.clone(),
            error: String::new(),
            created_at: None,
            parameters: request.parameters.clone(),
        })
    }

    fn cancel_execution(&self, id: &str, _force: bool) -> Result<(), ManagerError> {
        let mut executions = self.executions.lock().unwrap();
        let script = executions
            .get_mut(id)
            .ok_or_else(|| ManagerError::execution_not_found(id))?;
        script.statuses = VecDeque::from([ExecutionStatus::Cancelled]);
        Ok(())
    }
}

/// Convenience for asserting on event targets in recorded queries.
pub fn execution_target(id: &str) -> EventTarget {
    EventTarget::Execution(id.to_string())
}
