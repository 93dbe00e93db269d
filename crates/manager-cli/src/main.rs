use clap::{Parser, Subcommand};
use manager_core::{Config, ManagerError};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod dispatch;
mod output;

use commands::{agents, events, executions};
use output::Suppressed;

#[derive(Parser)]
#[command(name = "flowctl")]
#[command(about = "Run and track orchestration manager workflows", long_about = None)]
struct Cli {
    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle workflow executions
    Executions {
        #[command(subcommand)]
        command: ExecutionCommands,
    },

    /// Show events from workflow executions
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },

    /// Handle deployment agents
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },

    /// Show or initialize the config file
    Config {
        /// Print the config file path
        #[arg(long)]
        path: bool,

        /// Write a sample config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand)]
enum ExecutionCommands {
    /// Execute a workflow on a deployment and follow it
    Start(executions::StartArgs),

    /// Show a single execution
    Get {
        /// Execution ID
        execution_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List executions
    List {
        /// Only executions of this deployment
        #[arg(short, long)]
        deployment_id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Cancel a running execution
    Cancel {
        /// Execution ID
        execution_id: String,

        /// Force-cancel
        #[arg(short, long)]
        force: bool,
    },

    /// Follow an execution group until it ends
    WaitGroup(executions::WaitGroupArgs),
}

#[derive(Subcommand)]
enum EventCommands {
    /// List or tail the events of an execution
    List(events::ListArgs),
}

#[derive(Subcommand)]
enum AgentCommands {
    /// Install agents on the hosts of the given deployments
    Install(agents::InstallArgs),

    /// Validate the connection to the agents of the given deployments
    Validate(agents::ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !is_suppressed(&e) {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Executions { command } => {
            let config = Config::load_default()?;
            match command {
                ExecutionCommands::Start(args) => executions::start(&config, args),
                ExecutionCommands::Get { execution_id, json } => {
                    executions::get(&config, &execution_id, json)
                }
                ExecutionCommands::List {
                    deployment_id,
                    json,
                } => executions::list(&config, deployment_id.as_deref(), json),
                ExecutionCommands::Cancel {
                    execution_id,
                    force,
                } => executions::cancel(&config, &execution_id, force),
                ExecutionCommands::WaitGroup(args) => executions::wait_group(&config, args),
            }
        }
        Commands::Events { command } => {
            let config = Config::load_default()?;
            match command {
                EventCommands::List(args) => events::list(&config, args),
            }
        }
        Commands::Agents { command } => {
            let config = Config::load_default()?;
            match command {
                AgentCommands::Install(args) => agents::install(&config, args),
                AgentCommands::Validate(args) => agents::validate(&config, args),
            }
        }
        Commands::Config { path, init } => commands::config::run(path, init),
    }
}

/// Diagnostics go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "manager_core=debug,manager_rest=debug,flowctl=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Errors whose explanation has already been printed.
fn is_suppressed(error: &anyhow::Error) -> bool {
    error.downcast_ref::<Suppressed>().is_some()
        || error
            .downcast_ref::<ManagerError>()
            .is_some_and(ManagerError::is_suppressed)
}
