use crate::dispatch;
use clap::Args;
use manager_core::config::Config;
use manager_core::FanOut;
use serde_json::{Map, Value};
use std::io;
use std::time::Duration;

const INSTALL_WORKFLOW: &str = "install_new_agents";
const VALIDATE_WORKFLOW: &str = "validate_agents";

#[derive(Args)]
pub struct InstallArgs {
    /// Deployment whose agents to install (repeatable)
    #[arg(short, long = "deployment-id", required = true)]
    pub deployment_ids: Vec<String>,

    /// Stop the old agents once the new ones are installed
    #[arg(long)]
    pub stop_old_agent: bool,

    /// Include logs in the event stream
    #[arg(short = 'l', long)]
    pub include_logs: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Deployment whose agents to validate (repeatable)
    #[arg(short, long = "deployment-id", required = true)]
    pub deployment_ids: Vec<String>,

    /// Include logs in the event stream
    #[arg(short = 'l', long)]
    pub include_logs: bool,
}

pub fn install(config: &Config, args: InstallArgs) -> anyhow::Result<()> {
    let mut parameters = Map::new();
    if args.stop_old_agent {
        parameters.insert("stop_old_agent".into(), Value::Bool(true));
    }
    run(
        config,
        INSTALL_WORKFLOW,
        &args.deployment_ids,
        parameters,
        args.include_logs,
    )
}

pub fn validate(config: &Config, args: ValidateArgs) -> anyhow::Result<()> {
    run(
        config,
        VALIDATE_WORKFLOW,
        &args.deployment_ids,
        Map::new(),
        args.include_logs,
    )
}

fn run(
    config: &Config,
    workflow_id: &str,
    deployment_ids: &[String],
    parameters: Map<String, Value>,
    include_logs: bool,
) -> anyhow::Result<()> {
    let gateway = dispatch::create_gateway(config)?;
    let defaults = &config.defaults;

    FanOut::new(&gateway, workflow_id)
        .include_logs(include_logs || defaults.include_logs)
        .parameters(parameters)
        .timeout(Some(Duration::from_secs(defaults.timeout_secs)))
        .poll_interval(defaults.poll_interval())
        .run(deployment_ids, io::stdout())?;
    Ok(())
}
