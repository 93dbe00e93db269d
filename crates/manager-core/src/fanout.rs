use crate::clock::{Clock, SYSTEM_CLOCK};
use crate::error::ManagerError;
use crate::event::Event;
use crate::execution::Execution;
use crate::gateway::{RemoteExecutionGateway, StartRequest};
use crate::render::format_event;
use crate::waiter::{ExecutionWaiter, WaitOptions};
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Output shared by fan-out workers. Each line is written and flushed under
/// the lock, so lines from different workers never interleave mid-line.
pub struct SharedSink<W: Write> {
    inner: Mutex<W>,
}

impl<W: Write> SharedSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    pub fn line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)?;
        writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs one workflow against many deployments at once, one thread per
/// deployment, and reports a single pass/fail outcome.
pub struct FanOut<'a, G: RemoteExecutionGateway + ?Sized> {
    gateway: &'a G,
    clock: &'a dyn Clock,
    workflow_id: String,
    parameters: Map<String, Value>,
    wait: WaitOptions,
}

impl<'a, G: RemoteExecutionGateway + ?Sized> FanOut<'a, G> {
    pub fn new(gateway: &'a G, workflow_id: &str) -> Self {
        Self {
            gateway,
            clock: &SYSTEM_CLOCK,
            workflow_id: workflow_id.to_string(),
            parameters: Map::new(),
            wait: WaitOptions::default(),
        }
    }

    pub fn include_logs(mut self, include_logs: bool) -> Self {
        self.wait.include_logs = include_logs;
        self
    }

    /// Extra workflow parameters merged into every started execution.
    pub fn parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Per-execution wait budget.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait.timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.wait.poll_interval = poll_interval;
        self
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Starts the workflow on every deployment and waits for all of them.
    /// Failures of individual deployments are collected rather than raised;
    /// if any occurred, a `Summary:` block is written to `output` and
    /// `FanOutFailed` carries the same lines.
    pub fn run<W: Write + Send>(
        &self,
        deployment_ids: &[String],
        output: W,
    ) -> Result<(), ManagerError> {
        if deployment_ids.is_empty() {
            return Err(ManagerError::NoDeployments);
        }

        let sink = SharedSink::new(output);
        let failures = Mutex::new(Vec::new());

        thread::scope(|scope| {
            let sink = &sink;
            let failures = &failures;
            let mut workers = Vec::with_capacity(deployment_ids.len());

            for deployment_id in deployment_ids {
                let spawned = thread::Builder::new()
                    .name(format!("fanout-{}", deployment_id))
                    .spawn_scoped(scope, move || {
                        self.run_worker(deployment_id, sink, failures)
                    });
                match spawned {
                    Ok(handle) => workers.push((deployment_id, handle)),
                    Err(e) => record_failure(
                        failures,
                        format!(
                            "Could not start a worker for deployment '{}': {}",
                            deployment_id, e
                        ),
                    ),
                }
            }

            for (deployment_id, handle) in workers {
                if handle.join().is_err() {
                    record_failure(
                        failures,
                        format!(
                            "Worker for deployment '{}' panicked while running workflow '{}'",
                            deployment_id, self.workflow_id
                        ),
                    );
                }
            }
        });

        let failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
        if failures.is_empty() {
            sink.line(&format!(
                "Workflow '{}' finished on all {} deployment(s)",
                self.workflow_id,
                deployment_ids.len()
            ))?;
            return Ok(());
        }

        let summary = failures.join("\n");
        sink.line(&format!("Summary:\n{}", summary))?;
        Err(ManagerError::FanOutFailed { summary })
    }

    fn run_worker<W: Write>(
        &self,
        deployment_id: &str,
        sink: &SharedSink<W>,
        failures: &Mutex<Vec<String>>,
    ) {
        debug!("Worker for deployment {} starting", deployment_id);

        match self.start_and_wait(deployment_id, sink) {
            Ok(execution) if execution.has_error() => record_failure(
                failures,
                format!(
                    "Execution of workflow '{}' for deployment '{}' failed. [error={}]",
                    self.workflow_id, deployment_id, execution.error
                ),
            ),
            Ok(execution) => {
                let line = format!(
                    "Finished executing workflow '{}' on deployment '{}' ({})",
                    self.workflow_id, deployment_id, execution.id
                );
                if let Err(e) = sink.line(&line) {
                    warn!("Failed to write fan-out output: {}", e);
                }
            }
            Err(ManagerError::ExecutionTimeout { execution_id, .. }) => record_failure(
                failures,
                format!(
                    "Timed out waiting for workflow '{}' of deployment '{}' to end. \
                     It may still be running; run 'flowctl executions cancel {}' to cancel it.",
                    self.workflow_id, deployment_id, execution_id
                ),
            ),
            Err(e) => record_failure(
                failures,
                format!(
                    "Running workflow '{}' on deployment '{}' failed: {}",
                    self.workflow_id, deployment_id, e
                ),
            ),
        }
    }

    fn start_and_wait<W: Write>(
        &self,
        deployment_id: &str,
        sink: &SharedSink<W>,
    ) -> Result<Execution, ManagerError> {
        let mut request = StartRequest::new(deployment_id, &self.workflow_id);
        request.parameters = self.parameters.clone();
        request.allow_custom_parameters = true;

        let execution = self.gateway.start_execution(&request)?;
        sink.line(&format!(
            "Started execution for deployment '{}': {}",
            deployment_id, execution.id
        ))?;

        let mut handler = |events: &[Event]| -> Result<(), ManagerError> {
            for event in events {
                sink.line(&format_event(event))?;
            }
            Ok(())
        };

        ExecutionWaiter::new(self.gateway, self.wait.clone())
            .with_clock(self.clock)
            .wait_for_execution(execution, Some(&mut handler))
    }
}

fn record_failure(failures: &Mutex<Vec<String>>, line: String) {
    debug!("Recording fan-out failure: {}", line);
    failures
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(line);
}

/// Runs `workflow_id` on every deployment, printing progress to stdout.
pub fn run_workflow_fanout<G: RemoteExecutionGateway + ?Sized>(
    gateway: &G,
    deployment_ids: &[String],
    workflow_id: &str,
    include_logs: bool,
) -> Result<(), ManagerError> {
    FanOut::new(gateway, workflow_id)
        .include_logs(include_logs)
        .run(deployment_ids, io::stdout())
}
