use crate::clock::{Clock, Deadline, SYSTEM_CLOCK};
use crate::error::ManagerError;
use crate::event::EventTarget;
use crate::execution::{Execution, ExecutionGroup, ExecutionStatus};
use crate::fetcher::{EventFilter, EventsFetcher, EventsHandler, DEFAULT_BATCH_SIZE};
use crate::gateway::RemoteExecutionGateway;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info};

/// Default overall wait for one execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(900);

/// Pause between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct WaitOptions {
    pub include_logs: bool,
    /// `None` waits until the execution ends, however long that takes.
    pub timeout: Option<Duration>,
    pub from_datetime: Option<DateTime<Utc>>,
    pub poll_interval: Duration,
    pub batch_size: usize,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            include_logs: false,
            timeout: Some(DEFAULT_TIMEOUT),
            from_datetime: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl WaitOptions {
    pub fn include_logs(mut self, include_logs: bool) -> Self {
        self.include_logs = include_logs;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_datetime(mut self, from_datetime: Option<DateTime<Utc>>) -> Self {
        self.from_datetime = from_datetime;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn filter(&self) -> EventFilter {
        EventFilter {
            include_logs: self.include_logs,
            from_datetime: self.from_datetime,
        }
    }
}

/// Something whose status can be polled until it ends.
pub trait Tracked: Sized {
    fn id(&self) -> &str;

    fn status(&self) -> ExecutionStatus;

    fn event_target(&self) -> EventTarget;

    fn refresh<G: RemoteExecutionGateway + ?Sized>(&self, gateway: &G)
        -> Result<Self, ManagerError>;

    fn timeout_error(&self) -> ManagerError;
}

impl Tracked for Execution {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ExecutionStatus {
        self.status
    }

    fn event_target(&self) -> EventTarget {
        EventTarget::Execution(self.id.clone())
    }

    fn refresh<G: RemoteExecutionGateway + ?Sized>(
        &self,
        gateway: &G,
    ) -> Result<Self, ManagerError> {
        gateway.get_execution(&self.id)
    }

    fn timeout_error(&self) -> ManagerError {
        ManagerError::ExecutionTimeout {
            execution_id: self.id.clone(),
            workflow_id: self.workflow_id.clone(),
            deployment_id: self.deployment_id.clone(),
        }
    }
}

impl Tracked for ExecutionGroup {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ExecutionStatus {
        self.status
    }

    fn event_target(&self) -> EventTarget {
        EventTarget::ExecutionGroup(self.id.clone())
    }

    fn refresh<G: RemoteExecutionGateway + ?Sized>(
        &self,
        gateway: &G,
    ) -> Result<Self, ManagerError> {
        gateway.get_execution_group(&self.id)
    }

    fn timeout_error(&self) -> ManagerError {
        ManagerError::ExecutionGroupTimeout {
            group_id: self.id.clone(),
            workflow_id: self.workflow_id.clone(),
            deployment_group_id: self.deployment_group_id.clone(),
        }
    }
}

/// Advisory printed when a group is still queued at the start of a wait.
pub fn queued_notice(group: &ExecutionGroup) -> String {
    format!(
        "Execution group {} is queued and will start once the manager frees up. \
         You can keep waiting, or interrupt and check on it later.",
        group.id
    )
}

/// Polls an execution (or group) until it ends, streaming its events to a
/// handler between polls.
pub struct ExecutionWaiter<'a, G: RemoteExecutionGateway + ?Sized> {
    gateway: &'a G,
    clock: &'a dyn Clock,
    options: WaitOptions,
    notices: Option<&'a dyn Fn(&str)>,
}

impl<'a, G: RemoteExecutionGateway + ?Sized> ExecutionWaiter<'a, G> {
    pub fn new(gateway: &'a G, options: WaitOptions) -> Self {
        Self {
            gateway,
            clock: &SYSTEM_CLOCK,
            options,
            notices: None,
        }
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Routes advisory notices to `notices` instead of the tracing log.
    pub fn with_notices(mut self, notices: &'a dyn Fn(&str)) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn options(&self) -> &WaitOptions {
        &self.options
    }

    pub fn wait_for_execution(
        &self,
        execution: Execution,
        events_handler: Option<&mut EventsHandler<'_>>,
    ) -> Result<Execution, ManagerError> {
        self.wait(execution, events_handler)
    }

    pub fn wait_for_execution_group(
        &self,
        group: ExecutionGroup,
        events_handler: Option<&mut EventsHandler<'_>>,
    ) -> Result<ExecutionGroup, ManagerError> {
        if group.status == ExecutionStatus::Queued {
            self.notice(&queued_notice(&group));
        }
        self.wait(group, events_handler)
    }

    /// Returns the first terminal snapshot. After the terminal status is
    /// seen, status polling stops but one more event drain still runs so
    /// events reported around the end are not lost.
    pub fn wait<T: Tracked>(
        &self,
        mut snapshot: T,
        mut events_handler: Option<&mut EventsHandler<'_>>,
    ) -> Result<T, ManagerError> {
        if snapshot.status().is_terminal() {
            return Ok(snapshot);
        }

        let deadline = Deadline::after(self.clock, self.options.timeout);
        let mut fetcher = EventsFetcher::with_clock(
            self.gateway,
            self.clock,
            snapshot.event_target(),
            self.options.batch_size,
            self.options.filter(),
        )?;
        let mut ended = false;

        loop {
            if deadline.is_expired(self.clock) {
                return Err(snapshot.timeout_error());
            }
            let remaining = deadline.remaining(self.clock);

            if !ended {
                snapshot = snapshot.refresh(self.gateway)?;
                ended = snapshot.status().is_terminal();
                if ended {
                    debug!("{} reached {}", snapshot.event_target(), snapshot.status());
                }
            }

            fetcher.fetch_and_process_events(events_handler.as_deref_mut(), remaining)?;

            if ended {
                return Ok(snapshot);
            }

            self.clock
                .sleep(deadline.clamp(self.clock, self.options.poll_interval));
        }
    }

    fn notice(&self, message: &str) {
        match self.notices {
            Some(notices) => notices(message),
            None => info!("{}", message),
        }
    }
}

/// Waits for `execution` to end using the wall clock.
pub fn wait_for_execution<G: RemoteExecutionGateway + ?Sized>(
    gateway: &G,
    execution: Execution,
    events_handler: Option<&mut EventsHandler<'_>>,
    options: WaitOptions,
) -> Result<Execution, ManagerError> {
    ExecutionWaiter::new(gateway, options).wait_for_execution(execution, events_handler)
}

/// Waits for `group` to end using the wall clock.
pub fn wait_for_execution_group<G: RemoteExecutionGateway + ?Sized>(
    gateway: &G,
    group: ExecutionGroup,
    events_handler: Option<&mut EventsHandler<'_>>,
    options: WaitOptions,
) -> Result<ExecutionGroup, ManagerError> {
    ExecutionWaiter::new(gateway, options).wait_for_execution_group(group, events_handler)
}
