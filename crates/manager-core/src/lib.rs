pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod execution;
pub mod fanout;
pub mod fetcher;
pub mod gateway;
pub mod render;
pub mod waiter;

pub use clock::{Clock, Deadline, ManualClock, SystemClock};
pub use config::Config;
pub use error::ManagerError;
pub use event::{Event, EventTarget, WireEvent};
pub use execution::{Execution, ExecutionGroup, ExecutionStatus, END_STATES};
pub use fanout::{run_workflow_fanout, FanOut};
pub use fetcher::{EventFilter, EventsFetcher, EventsHandler};
pub use gateway::{EventPage, EventQuery, RemoteExecutionGateway, StartRequest};
pub use waiter::{wait_for_execution, wait_for_execution_group, ExecutionWaiter, WaitOptions};
