use manager_core::config::Config;
use manager_core::event::{EventTarget, WireEvent};
use manager_core::execution::{Execution, ExecutionGroup};
use manager_core::gateway::{EventPage, EventQuery, RemoteExecutionGateway, StartRequest};
use manager_core::ManagerError;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const API_PREFIX: &str = "/api/v3.1";
const TENANT_HEADER: &str = "Tenant";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Event types requested from the events endpoint. Logs are only included
/// on request.
const EVENT_TYPE: &str = "cloudify_event";
const LOG_TYPE: &str = "cloudify_log";

/// Talks to the manager's REST API over blocking HTTP.
pub struct RestGateway {
    client: Client,
    base_url: String,
    tenant: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    items: Vec<T>,
    #[serde(default)]
    metadata: Option<ListMetadata>,
}

#[derive(Debug, Deserialize)]
struct ListMetadata {
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    total: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl RestGateway {
    pub fn new(config: &Config) -> Result<Self, ManagerError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ManagerError::Transport(format!("building HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.manager_url(),
            tenant: config.manager.tenant.clone(),
            username: config.manager.username.clone(),
            password: config.manager.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        };
        match &self.tenant {
            Some(tenant) => request.header(TENANT_HEADER, tenant),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, ManagerError> {
        let response = self
            .authorize(request)
            .send()
            .map_err(|e| ManagerError::Transport(format!("{}: {}", what, e)))?;
        check_status(response)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        not_found: impl FnOnce() -> ManagerError,
    ) -> Result<T, ManagerError> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);
        match self.send(self.client.get(&url).query(query), &url) {
            Err(ManagerError::Api { status: 404, .. }) => Err(not_found()),
            Err(e) => Err(e),
            Ok(response) => read_json(response),
        }
    }
}

fn check_status(response: Response) -> Result<Response, ManagerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    Err(ManagerError::Api {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ManagerError> {
    let body = response
        .text()
        .map_err(|e| ManagerError::Transport(format!("reading response body: {}", e)))?;
    Ok(serde_json::from_str(&body)?)
}

/// Prefers the manager's own `message` field over the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Query string for one page of events.
fn events_query(query: &EventQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        match &query.target {
            EventTarget::Execution(id) => ("execution_id", id.clone()),
            EventTarget::ExecutionGroup(id) => ("execution_group_id", id.clone()),
        },
        ("_offset", query.offset.to_string()),
        ("_size", query.size.to_string()),
        ("_sort", query.sort.to_string()),
        ("type", EVENT_TYPE.to_string()),
    ];
    if query.include_logs {
        params.push(("type", LOG_TYPE.to_string()));
    }
    if let Some(from) = query.from_datetime {
        params.push(("from_datetime", from.to_rfc3339()));
    }
    params
}

impl RemoteExecutionGateway for RestGateway {
    fn get_execution(&self, id: &str) -> Result<Execution, ManagerError> {
        self.get_json(&format!("/executions/{}", id), &[], || {
            ManagerError::execution_not_found(id)
        })
    }

    fn get_execution_group(&self, id: &str) -> Result<ExecutionGroup, ManagerError> {
        self.get_json(&format!("/execution-groups/{}", id), &[], || {
            ManagerError::execution_group_not_found(id)
        })
    }

    fn list_executions(&self, deployment_id: Option<&str>) -> Result<Vec<Execution>, ManagerError> {
        let query: Vec<(&str, String)> = deployment_id
            .map(|d| vec![("deployment_id", d.to_string())])
            .unwrap_or_default();
        let list: ListResponse<Execution> = self.get_json("/executions", &query, || {
            ManagerError::NotFound {
                kind: "Deployment",
                id: deployment_id.unwrap_or_default().to_string(),
            }
        })?;
        Ok(list.items)
    }

    fn list_events(&self, query: &EventQuery) -> Result<EventPage, ManagerError> {
        let params = events_query(query);
        let list: ListResponse<WireEvent> = self.get_json("/events", &params, || {
            match &query.target {
                EventTarget::Execution(id) => ManagerError::execution_not_found(id),
                EventTarget::ExecutionGroup(id) => ManagerError::execution_group_not_found(id),
            }
        })?;
        let total = list
            .metadata
            .map(|m| m.pagination.total)
            .unwrap_or(list.items.len() as u64);
        Ok(EventPage {
            items: list.items,
            total,
        })
    }

    fn start_execution(&self, request: &StartRequest) -> Result<Execution, ManagerError> {
        let url = self.url("/executions");
        debug!(
            "POST {} workflow={} deployment={}",
            url, request.workflow_id, request.deployment_id
        );
        let body = json!({
            "deployment_id": request.deployment_id,
            "workflow_id": request.workflow_id,
            "parameters": request.parameters,
            "allow_custom_parameters": request.allow_custom_parameters,
            "force": request.force,
        });
        let response = self.send(self.client.post(&url).json(&body), &url)?;
        read_json(response)
    }

    fn cancel_execution(&self, id: &str, force: bool) -> Result<(), ManagerError> {
        let url = self.url(&format!("/executions/{}", id));
        let action = if force { "force-cancel" } else { "cancel" };
        debug!("POST {} action={}", url, action);
        match self.send(self.client.post(&url).json(&json!({ "action": action })), &url) {
            Err(ManagerError::Api { status: 404, .. }) => Err(ManagerError::execution_not_found(id)),
            Err(e) => Err(e),
            Ok(_) => Ok(()),
        }
    }
}
