use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use channel::{Channel, ChannelError, ChannelState};
use lifecycle::ChannelController;
use mem::{MemChannel, MemEndpoint};

#[derive(Debug, thiserror::Error, PartialEq)]
enum OrderError {
    #[error("channel failure: {0}")]
    Channel(#[from] ChannelError),
    #[error("order {0} rejected")]
    Rejected(u32),
}

fn setup() -> (MemEndpoint, ChannelController<MemChannel>) {
    let endpoint = MemEndpoint::new("mem://orders");
    let controller = ChannelController::new(endpoint.factory());
    (endpoint, controller)
}

#[test]
fn test_acquire_reuses_healthy_channel() {
    let (endpoint, controller) = setup();
    assert!(!controller.is_cached());

    let first = controller.acquire().unwrap();
    let second = controller.acquire().unwrap();
    let third = controller.acquire().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&second, &third));
    assert_eq!(endpoint.created().len(), 1);
    assert_eq!(first.open_count(), 1);
    assert_eq!(controller.generation(), 1);
}

#[test]
fn test_faulted_channel_is_aborted_and_replaced() {
    let (endpoint, controller) = setup();
    let c1 = controller.acquire().unwrap();

    c1.set_state(ChannelState::Faulted);
    let c2 = controller.acquire().unwrap();

    assert!(!Arc::ptr_eq(&c1, &c2));
    assert_eq!(c2.id(), 2);
    assert_eq!(c1.abort_count(), 1);
    assert_eq!(c1.close_count(), 0);
    assert_eq!(c2.state(), ChannelState::Opened);
    assert_eq!(endpoint.created().len(), 2);
    assert_eq!(controller.generation(), 2);
}

#[test]
fn test_closed_channel_is_replaced_without_teardown() {
    let (_endpoint, controller) = setup();
    let c1 = controller.acquire().unwrap();

    c1.set_state(ChannelState::Closed);
    let c2 = controller.acquire().unwrap();

    assert!(!Arc::ptr_eq(&c1, &c2));
    assert_eq!(c1.abort_count(), 0);
    assert_eq!(c1.close_count(), 0);
}

#[test]
fn test_transitional_states_are_reused() {
    let (_endpoint, controller) = setup();
    let c1 = controller.acquire().unwrap();

    for state in [ChannelState::Opening, ChannelState::Closing, ChannelState::Created] {
        c1.set_state(state);
        assert!(Arc::ptr_eq(&c1, &controller.acquire().unwrap()));
    }
}

#[test]
fn test_open_failure_leaves_controller_empty() {
    let (endpoint, controller) = setup();
    endpoint.fail_next_open_with(ChannelError::Communication("refused".into()));

    let err = controller.acquire().unwrap_err();
    assert_eq!(err, ChannelError::Communication("refused".into()));
    assert!(!controller.is_cached());
    assert_eq!(controller.generation(), 0);
    assert_eq!(endpoint.channel(1).unwrap().abort_count(), 1);

    // next call retries from scratch
    let channel = controller.acquire().unwrap();
    assert_eq!(channel.id(), 2);
}

#[test]
fn test_invoke_returns_operation_value() {
    let (_endpoint, controller) = setup();
    let reply: Result<String, ChannelError> = controller.invoke(|ch| ch.call("GetOrder"));
    assert_eq!(reply.unwrap(), "GetOrder@1");
    assert!(controller.is_cached());
}

#[test]
fn test_invoke_failure_discards_channel_and_returns_error_unchanged() {
    let (_endpoint, controller) = setup();
    let channel = controller.acquire().unwrap();

    let result: Result<(), OrderError> = controller.invoke(|_| Err(OrderError::Rejected(7)));

    assert_eq!(result, Err(OrderError::Rejected(7)));
    assert!(!controller.is_cached());
    assert_eq!(channel.abort_count(), 1);
    assert_eq!(channel.close_count(), 0);
}

#[test]
fn test_invoke_remote_failure_is_propagated() {
    let (_endpoint, controller) = setup();
    let channel = controller.acquire().unwrap();
    channel.fail_next_call_with(ChannelError::Timeout("no reply".into()));

    let result = controller.invoke(|ch| ch.call("GetOrder").map_err(OrderError::from));

    assert_eq!(result, Err(OrderError::Channel(ChannelError::Timeout("no reply".into()))));
    assert!(!controller.is_cached());
    assert!(channel.is_aborted());

    let next = controller.acquire().unwrap();
    assert_eq!(next.id(), 2);
}

#[test]
fn test_invoke_acquire_error_is_converted() {
    let (endpoint, controller) = setup();
    endpoint.fail_next_open_with(ChannelError::Timeout("connect".into()));

    let result: Result<(), OrderError> = controller.invoke(|_| Ok(()));
    assert_eq!(result, Err(OrderError::Channel(ChannelError::Timeout("connect".into()))));
}

#[test]
fn test_invoke_panic_discards_channel() {
    let (_endpoint, controller) = setup();
    let channel = controller.acquire().unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        controller.invoke(|_| -> Result<(), ChannelError> { panic!("operation blew up") })
    }));

    assert!(outcome.is_err());
    assert!(!controller.is_cached());
    assert_eq!(channel.abort_count(), 1);
}

#[test]
fn test_shutdown_aborts_faulted_channel() {
    let (_endpoint, controller) = setup();
    let channel = controller.acquire().unwrap();
    channel.set_state(ChannelState::Faulted);

    controller.shutdown(false).unwrap();

    assert_eq!(channel.abort_count(), 1);
    assert_eq!(channel.close_count(), 0);
    assert!(!controller.is_cached());
}

#[test]
fn test_shutdown_closes_healthy_channel() {
    let (_endpoint, controller) = setup();
    let channel = controller.acquire().unwrap();

    controller.shutdown(false).unwrap();

    assert_eq!(channel.close_count(), 1);
    assert_eq!(channel.abort_count(), 0);
    assert_eq!(channel.state(), ChannelState::Closed);
}

#[test]
fn test_shutdown_always_abort() {
    let (_endpoint, controller) = setup();
    let channel = controller.acquire().unwrap();

    controller.shutdown(true).unwrap();

    assert_eq!(channel.close_count(), 0);
    assert_eq!(channel.abort_count(), 1);
}

#[test]
fn test_shutdown_of_closed_channel_does_nothing() {
    let (_endpoint, controller) = setup();
    let channel = controller.acquire().unwrap();
    channel.set_state(ChannelState::Closed);

    controller.shutdown(false).unwrap();

    assert_eq!(channel.close_count(), 0);
    assert_eq!(channel.abort_count(), 0);
    assert!(!controller.is_cached());
}

#[test]
fn test_shutdown_absorbs_transient_close_errors() {
    for err in [ChannelError::Communication("reset".into()), ChannelError::Timeout("slow".into())] {
        let (endpoint, controller) = setup();
        endpoint.fail_closes_with(err);
        let channel = controller.acquire().unwrap();

        controller.shutdown(false).unwrap();

        assert_eq!(channel.close_count(), 1);
        assert_eq!(channel.abort_count(), 1);
        assert!(!controller.is_cached());
    }
}

#[test]
fn test_shutdown_propagates_unrecognized_close_error_after_abort() {
    let (endpoint, controller) = setup();
    endpoint.fail_closes_with(ChannelError::Other("corrupt frame".into()));
    let channel = controller.acquire().unwrap();

    let err = controller.shutdown(false).unwrap_err();

    assert_eq!(err, ChannelError::Other("corrupt frame".into()));
    assert_eq!(channel.abort_count(), 1);
    assert!(!controller.is_cached());
}

#[test]
fn test_shutdown_on_empty_controller() {
    let (endpoint, controller) = setup();
    controller.shutdown(false).unwrap();
    controller.shutdown(true).unwrap();
    assert!(endpoint.created().is_empty());
}

#[test]
fn test_dispose_never_fails() {
    let (endpoint, controller) = setup();
    endpoint.fail_closes_with(ChannelError::Other("corrupt frame".into()));
    let channel = controller.acquire().unwrap();

    controller.dispose();
    controller.dispose();

    assert!(!controller.is_cached());
    assert_eq!(channel.abort_count(), 1);
}

#[test]
fn test_drop_closes_cached_channel() {
    let (endpoint, controller) = setup();
    controller.acquire().unwrap();
    drop(controller);

    let channel = endpoint.channel(1).unwrap();
    assert_eq!(channel.close_count(), 1);
    assert_eq!(channel.state(), ChannelState::Closed);
}

#[test]
fn test_invalidate_ignores_replaced_instance() {
    let (_endpoint, controller) = setup();
    let c1 = controller.acquire().unwrap();
    c1.set_state(ChannelState::Closed);
    let c2 = controller.acquire().unwrap();

    controller.invalidate(&c1, true).unwrap();

    assert!(c1.is_aborted());
    assert!(Arc::ptr_eq(&controller.cached().unwrap(), &c2));
    assert_eq!(c2.abort_count(), 0);
}

#[test]
fn test_concurrent_acquire_converges_on_one_channel() {
    let (endpoint, controller) = setup();

    let acquired: Vec<Arc<MemChannel>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(|| controller.acquire().unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let cached = controller.cached().unwrap();
    assert!(acquired.iter().all(|ch| Arc::ptr_eq(ch, &cached)));
    assert_eq!(controller.generation(), 1);
    for channel in endpoint.created() {
        if !channel.same_as(&cached) {
            assert_eq!(channel.state(), ChannelState::Closed);
        }
    }
}
