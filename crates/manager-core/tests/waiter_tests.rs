mod common;

#[cfg(test)]
mod tests {
    use crate::common::{execution, group, FakeGateway};
    use manager_core::clock::{Deadline, ManualClock};
    use manager_core::event::Event;
    use manager_core::execution::ExecutionStatus::{self, *};
    use manager_core::waiter::{ExecutionWaiter, WaitOptions};
    use manager_core::ManagerError;
    use std::cell::Cell;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    fn options(timeout_secs: Option<u64>) -> WaitOptions {
        WaitOptions::default()
            .timeout(timeout_secs.map(Duration::from_secs))
            .poll_interval(Duration::from_secs(1))
    }

    #[test]
    fn test_terminal_execution_returns_without_polling() {
        for status in [Terminated, Failed, Cancelled] {
            let gateway = FakeGateway::new().with_execution("exec-1", &[status]);
            let clock = ManualClock::new();
            let waiter = ExecutionWaiter::new(&gateway, options(Some(900))).with_clock(&clock);

            let result = waiter
                .wait_for_execution(execution("exec-1", status), None)
                .unwrap();

            assert_eq!(result.status, status);
            assert_eq!(gateway.get_execution_calls.load(Ordering::SeqCst), 0);
            assert_eq!(gateway.list_events_calls.load(Ordering::SeqCst), 0);
            assert_eq!(clock.sleep_count(), 0);
        }
    }

    #[test]
    fn test_waits_until_terminal() {
        // First status is consumed by the fetcher's existence check.
        let gateway = FakeGateway::new()
            .with_execution("exec-1", &[Started, Started, Started, Terminated])
            .with_events(3);
        let clock = ManualClock::new();
        let waiter = ExecutionWaiter::new(&gateway, options(Some(900))).with_clock(&clock);

        let mut texts = Vec::new();
        let mut handler = |events: &[Event]| -> Result<(), ManagerError> {
            texts.extend(events.iter().map(|e| e.message.text.clone()));
            Ok(())
        };
        let result = waiter
            .wait_for_execution(execution("exec-1", Pending), Some(&mut handler))
            .unwrap();

        assert_eq!(result.status, Terminated);
        assert_eq!(texts, vec!["event 0", "event 1", "event 2"]);
        assert_eq!(gateway.get_execution_calls.load(Ordering::SeqCst), 4);
        assert_eq!(clock.sleep_count(), 2);
    }

    #[test]
    fn test_status_not_polled_after_terminal_but_events_drained_once_more() {
        let gateway = FakeGateway::new()
            .with_execution("exec-1", &[Started, Terminated])
            .with_events(2);
        let clock = ManualClock::new();
        let waiter = ExecutionWaiter::new(&gateway, options(Some(900))).with_clock(&clock);

        let mut delivered = 0;
        let mut handler = |events: &[Event]| -> Result<(), ManagerError> {
            delivered += events.len();
            Ok(())
        };
        let result = waiter
            .wait_for_execution(execution("exec-1", Started), Some(&mut handler))
            .unwrap();

        assert_eq!(result.status, Terminated);
        assert_eq!(delivered, 2);
        // existence check + one refresh
        assert_eq!(gateway.get_execution_calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.list_events_calls.load(Ordering::SeqCst), 1);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn test_failed_execution_is_returned_not_raised() {
        let gateway = FakeGateway::new().with_execution("exec-1", &[Started, Failed]);
        let clock = ManualClock::new();
        let waiter = ExecutionWaiter::new(&gateway, options(Some(60))).with_clock(&clock);

        let result = waiter
            .wait_for_execution(execution("exec-1", Started), None)
            .unwrap();
        assert_eq!(result.status, Failed);
    }

    #[test]
    fn test_timeout_after_bounded_number_of_sleeps() {
        let gateway = FakeGateway::new().with_execution("exec-1", &[Started]);
        let clock = ManualClock::new();
        let waiter = ExecutionWaiter::new(&gateway, options(Some(900))).with_clock(&clock);

        let result = waiter.wait_for_execution(execution("exec-1", Started), None);

        match result {
            Err(ManagerError::ExecutionTimeout {
                execution_id,
                workflow_id,
                deployment_id,
            }) => {
                assert_eq!(execution_id, "exec-1");
                assert_eq!(workflow_id, "install");
                assert_eq!(deployment_id, "dep-1");
            }
            other => panic!("expected execution timeout, got {:?}", other),
        }
        assert!(clock.sleep_count() <= 900);
        assert_eq!(clock.elapsed(), Duration::from_secs(900));
    }

    #[test]
    fn test_sleep_never_passes_deadline() {
        let gateway = FakeGateway::new().with_execution("exec-1", &[Started]);
        let clock = ManualClock::new();
        let waiter = ExecutionWaiter::new(
            &gateway,
            WaitOptions::default()
                .timeout(Some(Duration::from_millis(2500)))
                .poll_interval(Duration::from_secs(1)),
        )
        .with_clock(&clock);

        let result = waiter.wait_for_execution(execution("exec-1", Started), None);
        assert!(matches!(result, Err(ref e) if e.is_timeout()));
        assert_eq!(clock.sleep_count(), 3);
        assert_eq!(clock.elapsed(), Duration::from_millis(2500));
    }

    #[test]
    fn test_event_drain_gets_remaining_budget() {
        let clock = Arc::new(ManualClock::new());
        let gateway = FakeGateway::new()
            .with_execution("exec-1", &[Started])
            .with_endless_events()
            .advancing_on_list(clock.clone(), Duration::from_secs(1));
        let waiter = ExecutionWaiter::new(&gateway, options(Some(10)).batch_size(1))
            .with_clock(clock.as_ref());

        let result = waiter.wait_for_execution(execution("exec-1", Started), None);

        assert!(matches!(
            result,
            Err(ManagerError::EventProcessingTimeout { .. })
        ));
        assert!(clock.elapsed() <= Duration::from_secs(11));
    }

    #[test]
    fn test_unbounded_wait_never_times_out() {
        let mut statuses = vec![Started; 2000];
        statuses.push(Terminated);
        let gateway = FakeGateway::new().with_execution("exec-1", &statuses);
        let clock = ManualClock::new();
        let waiter = ExecutionWaiter::new(&gateway, options(None)).with_clock(&clock);

        let result = waiter
            .wait_for_execution(execution("exec-1", Started), None)
            .unwrap();
        assert_eq!(result.status, Terminated);
        assert!(clock.elapsed() > Duration::from_secs(900));
    }

    #[test]
    fn test_huge_timeout_waits_without_overflow() {
        let gateway = FakeGateway::new()
            .with_execution("exec-1", &[Started, Started, Started, Terminated]);
        let clock = ManualClock::new();
        let waiter = ExecutionWaiter::new(&gateway, options(Some(u64::MAX))).with_clock(&clock);

        let result = waiter
            .wait_for_execution(execution("exec-1", Started), None)
            .unwrap();
        assert_eq!(result.status, Terminated);
        assert_eq!(clock.sleep_count(), 2);
    }

    #[test]
    fn test_huge_timeout_is_unbounded_deadline() {
        let clock = ManualClock::new();
        let deadline = Deadline::after(&clock, Some(Duration::from_secs(u64::MAX)));
        assert!(!deadline.is_bounded());
        assert!(!deadline.is_expired(&clock));
        assert_eq!(deadline.remaining(&clock), None);
    }

    #[test]
    fn test_missing_execution_fails_fast() {
        let gateway = FakeGateway::new();
        let clock = ManualClock::new();
        let waiter = ExecutionWaiter::new(&gateway, options(Some(900))).with_clock(&clock);

        let result = waiter.wait_for_execution(execution("exec-9", Started), None);
        assert!(matches!(result, Err(ref e) if e.is_not_found()));
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn test_group_waits_until_terminal() {
        let gateway = FakeGateway::new()
            .with_group("group-1", &[Started, Started, Terminated])
            .with_events(4);
        let clock = ManualClock::new();
        let waiter = ExecutionWaiter::new(&gateway, options(Some(900))).with_clock(&clock);

        let mut delivered = 0;
        let mut handler = |events: &[Event]| -> Result<(), ManagerError> {
            delivered += events.len();
            Ok(())
        };
        let result = waiter
            .wait_for_execution_group(group("group-1", Started), Some(&mut handler))
            .unwrap();

        assert_eq!(result.status, Terminated);
        assert_eq!(delivered, 4);
        assert_eq!(gateway.get_execution_calls.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.get_group_calls.load(Ordering::SeqCst), 3);
        let queries = gateway.queries.lock().unwrap();
        assert!(queries
            .iter()
            .all(|q| q.target == manager_core::EventTarget::ExecutionGroup("group-1".into())));
    }

    #[test]
    fn test_group_timeout() {
        let gateway = FakeGateway::new().with_group("group-1", &[Started]);
        let clock = ManualClock::new();
        let waiter = ExecutionWaiter::new(&gateway, options(Some(5))).with_clock(&clock);

        match waiter.wait_for_execution_group(group("group-1", Started), None) {
            Err(ManagerError::ExecutionGroupTimeout {
                group_id,
                deployment_group_id,
                ..
            }) => {
                assert_eq!(group_id, "group-1");
                assert_eq!(deployment_group_id, "group-1");
            }
            other => panic!("expected group timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_queued_notice_logged_once() {
        let gateway = FakeGateway::new().with_group(
            "group-1",
            &[Queued, Queued, Started, Queued, Started, Terminated],
        );
        let clock = ManualClock::new();
        let notices = Cell::new(0);
        let count = |_: &str| notices.set(notices.get() + 1);
        let waiter = ExecutionWaiter::new(&gateway, options(Some(900)))
            .with_clock(&clock)
            .with_notices(&count);

        let result = waiter
            .wait_for_execution_group(group("group-1", Queued), None)
            .unwrap();

        assert_eq!(result.status, Terminated);
        assert_eq!(notices.get(), 1);
    }

    #[test]
    fn test_no_queued_notice_when_not_initially_queued() {
        let gateway = FakeGateway::new().with_group("group-1", &[Started, Queued, Terminated]);
        let clock = ManualClock::new();
        let notices = Cell::new(0);
        let count = |_: &str| notices.set(notices.get() + 1);
        let waiter = ExecutionWaiter::new(&gateway, options(Some(900)))
            .with_clock(&clock)
            .with_notices(&count);

        waiter
            .wait_for_execution_group(group("group-1", Started), None)
            .unwrap();
        assert_eq!(notices.get(), 0);
    }

    #[test]
    fn test_statuses_terminal_set() {
        let terminal: Vec<ExecutionStatus> = [
            Pending,
            Started,
            Queued,
            Scheduled,
            Cancelling,
            ForceCancelling,
            KillCancelling,
            Terminated,
            Failed,
            Cancelled,
            Unknown,
        ]
        .into_iter()
        .filter(|s| s.is_terminal())
        .collect();
        assert_eq!(terminal, vec![Terminated, Failed, Cancelled]);
    }
}
