use manager_core::event::Event;
use manager_core::execution::Execution;
use manager_core::render::{format_event, format_event_json};
use manager_core::ManagerError;
use serde_json::Value;
use std::io::{self, Write};
use thiserror::Error;

/// Returned once a command has already explained its failure on stderr;
/// `main` exits non-zero without printing it again.
#[derive(Debug, Error)]
#[error("command failed")]
pub struct Suppressed;

/// Events handler that prints each event to stdout, one per line.
pub fn events_printer(json: bool) -> impl FnMut(&[Event]) -> Result<(), ManagerError> {
    events_writer(io::stdout(), json)
}

/// Events handler writing to `out`. Write failures (a closed pipe, say)
/// abort the fetch as `ManagerError::Io`.
pub fn events_writer<W: Write>(
    mut out: W,
    json: bool,
) -> impl FnMut(&[Event]) -> Result<(), ManagerError> {
    move |events: &[Event]| -> Result<(), ManagerError> {
        for event in events {
            if json {
                writeln!(out, "{}", format_event_json(event)?)?;
            } else {
                writeln!(out, "{}", format_event(event))?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

/// Parses a `key=value` workflow parameter. The value is read as JSON when
/// it parses as JSON, otherwise kept as a plain string.
pub fn parse_parameter(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

pub fn print_execution(execution: &Execution) {
    println!("Execution:  {}", execution.id);
    println!("Workflow:   {}", execution.workflow_id);
    println!("Deployment: {}", or_dash(&execution.deployment_id));
    println!("Status:     {}", execution.status);
    println!(
        "Created:    {}",
        execution.created_at.as_deref().unwrap_or("-")
    );
    if !execution.parameters.is_empty() {
        println!("Parameters:");
        for (key, value) in &execution.parameters {
            println!("  {}: {}", key, value);
        }
    }
    if execution.has_error() {
        println!("Error:      {}", execution.error);
    }
}

pub fn print_execution_table(executions: &[Execution]) {
    if executions.is_empty() {
        println!("No executions found.");
        return;
    }
    println!(
        "{:<38} {:<28} {:<24} {:<16} {:<26}",
        "ID", "WORKFLOW", "DEPLOYMENT", "STATUS", "CREATED"
    );
    println!("{}", "-".repeat(136));
    for execution in executions {
        println!(
            "{:<38} {:<28} {:<24} {:<16} {:<26}",
            execution.id,
            execution.workflow_id,
            or_dash(&execution.deployment_id),
            execution.status,
            execution.created_at.as_deref().unwrap_or("-"),
        );
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}
