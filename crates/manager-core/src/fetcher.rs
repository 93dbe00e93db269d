use crate::clock::{Clock, Deadline, SYSTEM_CLOCK};
use crate::error::ManagerError;
use crate::event::{adapt, Event, EventTarget};
use crate::gateway::{EventQuery, RemoteExecutionGateway, EVENTS_SORT_KEY};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Receives each non-empty batch of adapted events, in report order.
/// An error returned here aborts the fetch (and any wait driving it).
pub type EventsHandler<'h> = dyn FnMut(&[Event]) -> Result<(), ManagerError> + 'h;

/// Server-side filters applied to every page a fetcher requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub include_logs: bool,
    pub from_datetime: Option<DateTime<Utc>>,
}

/// A page shorter than the requested size means the manager has no more
/// events buffered for now. A full page always triggers another fetch,
/// even if that one comes back empty.
pub fn is_drained(returned: usize, page_size: usize) -> bool {
    returned < page_size
}

/// Reads the event stream of one execution or execution group in pages,
/// remembering how many events it has already consumed.
pub struct EventsFetcher<'a, G: RemoteExecutionGateway + ?Sized> {
    gateway: &'a G,
    clock: &'a dyn Clock,
    target: EventTarget,
    batch_size: usize,
    filter: EventFilter,
    cursor: usize,
}

impl<'a, G: RemoteExecutionGateway + ?Sized> EventsFetcher<'a, G> {
    /// Verifies the target exists before returning, so a typo'd id fails
    /// here with `NotFound` instead of being polled forever.
    pub fn new(
        gateway: &'a G,
        target: EventTarget,
        batch_size: usize,
        filter: EventFilter,
    ) -> Result<Self, ManagerError> {
        Self::with_clock(gateway, &SYSTEM_CLOCK, target, batch_size, filter)
    }

    pub fn with_clock(
        gateway: &'a G,
        clock: &'a dyn Clock,
        target: EventTarget,
        batch_size: usize,
        filter: EventFilter,
    ) -> Result<Self, ManagerError> {
        if batch_size == 0 {
            return Err(ManagerError::InvalidArgument(
                "event batch size must be at least 1".into(),
            ));
        }

        match &target {
            EventTarget::Execution(id) => {
                gateway.get_execution(id)?;
            }
            EventTarget::ExecutionGroup(id) => {
                gateway.get_execution_group(id)?;
            }
        }

        Ok(Self {
            gateway,
            clock,
            target,
            batch_size,
            filter,
            cursor: 0,
        })
    }

    pub fn target(&self) -> &EventTarget {
        &self.target
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of events consumed so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Fetches one page starting at the cursor and adapts it.
    /// Returns the events and the manager's total event count.
    pub fn fetch_events_batch(
        &mut self,
        offset: Option<usize>,
        size: Option<usize>,
    ) -> Result<(Vec<Event>, u64), ManagerError> {
        let query = EventQuery {
            target: self.target.clone(),
            offset: offset.unwrap_or(self.cursor),
            size: size.unwrap_or(self.batch_size),
            sort: EVENTS_SORT_KEY,
            include_logs: self.filter.include_logs,
            from_datetime: self.filter.from_datetime,
        };

        let page = self.gateway.list_events(&query)?;
        self.cursor += page.items.len();
        debug!(
            "Fetched {} events for {} at offset {} (total {})",
            page.items.len(),
            self.target,
            query.offset,
            page.total
        );

        let events = page.items.into_iter().map(adapt).collect();
        Ok((events, page.total))
    }

    /// Fetches one page at the cursor and hands it to `handler`.
    pub fn fetch_batch(
        &mut self,
        handler: Option<&mut EventsHandler<'_>>,
    ) -> Result<(usize, u64), ManagerError> {
        self.fetch_batch_at(None, None, handler)
    }

    /// Like `fetch_batch`, with an explicit offset and/or page size in place
    /// of the cursor and configured batch size.
    pub fn fetch_batch_at(
        &mut self,
        offset: Option<usize>,
        size: Option<usize>,
        handler: Option<&mut EventsHandler<'_>>,
    ) -> Result<(usize, u64), ManagerError> {
        let (events, total) = self.fetch_events_batch(offset, size)?;
        if let Some(handler) = handler {
            if !events.is_empty() {
                handler(&events)?;
            }
        }
        Ok((events.len(), total))
    }

    /// Fetches pages back to back until one comes back short, then returns
    /// how many events this pass consumed. Fails with
    /// `EventProcessingTimeout` if `timeout` runs out first.
    pub fn fetch_and_process_events(
        &mut self,
        mut handler: Option<&mut EventsHandler<'_>>,
        timeout: Option<Duration>,
    ) -> Result<usize, ManagerError> {
        let deadline = Deadline::after(self.clock, timeout);
        let mut processed = 0;

        loop {
            if deadline.is_expired(self.clock) {
                return Err(ManagerError::EventProcessingTimeout {
                    id: self.target.id().to_string(),
                });
            }

            let (count, _) = self.fetch_batch(handler.as_deref_mut())?;
            processed += count;

            if is_drained(count, self.batch_size) {
                return Ok(processed);
            }
        }
    }
}
