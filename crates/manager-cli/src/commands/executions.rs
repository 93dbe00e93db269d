use crate::dispatch;
use crate::output::{self, parse_parameter, Suppressed};
use clap::Args;
use manager_core::config::Config;
use manager_core::gateway::{RemoteExecutionGateway, StartRequest};
use manager_core::{wait_for_execution, ExecutionWaiter, ManagerError, WaitOptions};
use serde_json::Value;
use std::time::Duration;

#[derive(Args)]
pub struct StartArgs {
    /// Workflow to execute
    pub workflow_id: String,

    /// Deployment to execute the workflow on
    #[arg(short, long)]
    pub deployment_id: String,

    /// Workflow parameter as KEY=VALUE; VALUE may be JSON (repeatable)
    #[arg(short = 'p', long = "parameter", value_parser = parse_parameter)]
    pub parameters: Vec<(String, Value)>,

    /// Seconds to wait for the execution to end
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Include logs in the event stream
    #[arg(short = 'l', long)]
    pub include_logs: bool,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Start even if other executions are running on the deployment
    #[arg(short, long)]
    pub force: bool,

    /// Accept parameters the workflow does not declare
    #[arg(long)]
    pub allow_custom_parameters: bool,
}

#[derive(Args)]
pub struct WaitGroupArgs {
    /// Execution group ID
    pub group_id: String,

    /// Seconds to wait for the group to end
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Include logs in the event stream
    #[arg(short = 'l', long)]
    pub include_logs: bool,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

fn wait_options(config: &Config, timeout: Option<u64>, include_logs: bool) -> WaitOptions {
    let defaults = &config.defaults;
    defaults
        .wait_options()
        .timeout(Some(Duration::from_secs(
            timeout.unwrap_or(defaults.timeout_secs),
        )))
        .include_logs(include_logs || defaults.include_logs)
}

pub fn start(config: &Config, args: StartArgs) -> anyhow::Result<()> {
    let gateway = dispatch::create_gateway(config)?;
    let options = wait_options(config, args.timeout, args.include_logs);

    let mut request = StartRequest::new(&args.deployment_id, &args.workflow_id);
    request.parameters = args.parameters.into_iter().collect();
    request.allow_custom_parameters = args.allow_custom_parameters;
    request.force = args.force;

    let timeout_secs = options.timeout.map(|t| t.as_secs()).unwrap_or_default();

    let execution = gateway.start_execution(&request)?;
    eprintln!(
        "Executing workflow '{}' on deployment '{}' [timeout={} seconds]",
        args.workflow_id, args.deployment_id, timeout_secs
    );

    let mut printer = output::events_printer(args.json);

    match wait_for_execution(&gateway, execution, Some(&mut printer), options) {
        Ok(execution) if execution.has_error() => {
            eprintln!(
                "Execution of workflow '{}' for deployment '{}' failed. [error={}]",
                args.workflow_id, args.deployment_id, execution.error
            );
            eprintln!(
                "* Run 'flowctl events list -e {}' to retrieve the execution's events/logs",
                execution.id
            );
            Err(Suppressed.into())
        }
        Ok(execution) => {
            eprintln!(
                "Finished executing workflow '{}' on deployment '{}' ({})",
                args.workflow_id, args.deployment_id, execution.status
            );
            eprintln!(
                "* Run 'flowctl events list -e {}' to retrieve the execution's events/logs",
                execution.id
            );
            Ok(())
        }
        Err(ManagerError::ExecutionTimeout { execution_id, .. }) => {
            eprintln!(
                "Timed out waiting for workflow '{}' of deployment '{}' to end. \
                 The execution may still be running properly; the wait was limited \
                 to {} seconds.",
                args.workflow_id, args.deployment_id, timeout_secs
            );
            eprintln!(
                "* Run 'flowctl executions cancel {}' to cancel the running workflow.",
                execution_id
            );
            eprintln!(
                "* Run 'flowctl events list --tail -e {}' to follow its events/logs until it ends.",
                execution_id
            );
            Err(Suppressed.into())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get(config: &Config, execution_id: &str, json: bool) -> anyhow::Result<()> {
    let gateway = dispatch::create_gateway(config)?;
    let execution = gateway.get_execution(execution_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&execution)?);
    } else {
        output::print_execution(&execution);
    }
    Ok(())
}

pub fn list(config: &Config, deployment_id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let gateway = dispatch::create_gateway(config)?;
    let executions = gateway.list_executions(deployment_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&executions)?);
    } else {
        output::print_execution_table(&executions);
    }
    Ok(())
}

pub fn cancel(config: &Config, execution_id: &str, force: bool) -> anyhow::Result<()> {
    let gateway = dispatch::create_gateway(config)?;
    gateway.cancel_execution(execution_id, force)?;

    eprintln!(
        "A {}cancel request for execution {} has been sent.",
        if force { "force-" } else { "" },
        execution_id
    );
    eprintln!(
        "* Run 'flowctl executions get {}' to track its status.",
        execution_id
    );
    Ok(())
}

pub fn wait_group(config: &Config, args: WaitGroupArgs) -> anyhow::Result<()> {
    let gateway = dispatch::create_gateway(config)?;
    let options = wait_options(config, args.timeout, args.include_logs);
    let timeout_secs = options.timeout.map(|t| t.as_secs()).unwrap_or_default();

    let group = gateway.get_execution_group(&args.group_id)?;
    let notice = |message: &str| eprintln!("{}", message);
    let mut printer = output::events_printer(args.json);

    let result = ExecutionWaiter::new(&gateway, options)
        .with_notices(&notice)
        .wait_for_execution_group(group, Some(&mut printer));

    match result {
        Ok(group) if group.has_error() => {
            eprintln!(
                "Execution group {} of workflow '{}' failed. [error={}]",
                group.id, group.workflow_id, group.error
            );
            Err(Suppressed.into())
        }
        Ok(group) => {
            eprintln!(
                "Execution group {} of workflow '{}' ended with status {}",
                group.id, group.workflow_id, group.status
            );
            Ok(())
        }
        Err(ManagerError::ExecutionGroupTimeout { group_id, .. }) => {
            eprintln!(
                "Timed out after {} seconds waiting for execution group {} to end. \
                 It may still be running.",
                timeout_secs, group_id
            );
            Err(Suppressed.into())
        }
        Err(e) => Err(e.into()),
    }
}
