use crate::dispatch;
use crate::output::{self, Suppressed};
use chrono::{DateTime, Utc};
use clap::Args;
use manager_core::config::Config;
use manager_core::event::EventTarget;
use manager_core::fetcher::{EventFilter, EventsFetcher, EventsHandler};
use manager_core::gateway::RemoteExecutionGateway;
use manager_core::{wait_for_execution, ManagerError};

#[derive(Args)]
pub struct ListArgs {
    /// Execution whose events to show
    #[arg(short, long)]
    pub execution_id: String,

    /// Keep printing new events until the execution ends
    #[arg(short, long)]
    pub tail: bool,

    /// Include logs alongside events
    #[arg(short = 'l', long)]
    pub include_logs: bool,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Only events reported at or after this RFC 3339 time
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,

    /// Index of the first event to show
    #[arg(long)]
    pub offset: Option<usize>,

    /// Maximum number of events to show
    #[arg(long)]
    pub size: Option<usize>,
}

pub fn list(config: &Config, args: ListArgs) -> anyhow::Result<()> {
    let gateway = dispatch::create_gateway(config)?;
    let include_logs = args.include_logs || config.defaults.include_logs;
    let mut printer = output::events_printer(args.json);

    let filter = EventFilter {
        include_logs,
        from_datetime: args.from,
    };

    if !args.tail {
        let (shown, total) = show_batch(
            &gateway,
            &args.execution_id,
            config.defaults.batch_size,
            filter,
            (args.offset, args.size),
            &mut printer,
        )?;
        eprintln!("\nShowing {} of {} events", shown, total);
        return Ok(());
    }

    let options = config
        .defaults
        .wait_options()
        .include_logs(include_logs)
        .from_datetime(args.from)
        .timeout(None);

    let execution = gateway.get_execution(&args.execution_id)?;
    let execution = if execution.status.is_terminal() {
        // Already over: nothing to wait for, just drain what is there.
        let mut fetcher = EventsFetcher::new(
            &gateway,
            EventTarget::Execution(execution.id.clone()),
            options.batch_size,
            filter,
        )?;
        fetcher.fetch_and_process_events(Some(&mut printer), None)?;
        execution
    } else {
        wait_for_execution(&gateway, execution, Some(&mut printer), options)?
    };

    if execution.has_error() {
        eprintln!(
            "Execution of workflow '{}' for deployment '{}' failed. [error={}]",
            execution.workflow_id, execution.deployment_id, execution.error
        );
        return Err(Suppressed.into());
    }
    eprintln!(
        "Execution {} ended with status {}",
        execution.id, execution.status
    );
    Ok(())
}

/// One explicit page of events. The fetcher's existence check is the only
/// status lookup on this path.
fn show_batch<G: RemoteExecutionGateway + ?Sized>(
    gateway: &G,
    execution_id: &str,
    batch_size: usize,
    filter: EventFilter,
    (offset, size): (Option<usize>, Option<usize>),
    handler: &mut EventsHandler<'_>,
) -> Result<(usize, u64), ManagerError> {
    let mut fetcher = EventsFetcher::new(
        gateway,
        EventTarget::Execution(execution_id.to_string()),
        batch_size,
        filter,
    )?;
    fetcher.fetch_batch_at(offset, size, Some(handler))
}
