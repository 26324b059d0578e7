//! Integration tests for the shared channel API.
//!
//! These exercise consumer usage patterns against a minimal channel that
//! lives entirely in this file.

use std::sync::Mutex;

use channel::{AsyncChannel, Channel, ChannelError, ChannelState, ClassifyFault, FaultKind};

struct DummyChannel {
    state: Mutex<ChannelState>,
}

impl DummyChannel {
    fn new() -> Self { Self { state: Mutex::new(ChannelState::Created) } }

    fn set(&self, state: ChannelState) {
        *self.state.lock().expect("state lock") = state;
    }
}

impl Channel for DummyChannel {
    type Error = ChannelError;

    fn state(&self) -> ChannelState { *self.state.lock().expect("state lock") }

    fn open(&self) -> Result<(), ChannelError> {
        self.set(ChannelState::Opened);
        Ok(())
    }

    fn close(&self) -> Result<(), ChannelError> {
        if self.state() == ChannelState::Faulted {
            return Err(ChannelError::Faulted);
        }
        self.set(ChannelState::Closed);
        Ok(())
    }

    fn abort(&self) { self.set(ChannelState::Closed); }
}

#[async_trait::async_trait]
impl AsyncChannel for DummyChannel {
    async fn open_async(&self) -> Result<(), ChannelError> { self.open() }

    async fn close_async(&self) -> Result<(), ChannelError> { self.close() }
}

#[tokio::test]
async fn consumer_can_open_and_close() {
    let c = DummyChannel::new();
    assert_eq!(c.state(), ChannelState::Created);
    c.open_async().await.expect("open");
    assert!(c.state().is_usable());
    c.close_async().await.expect("close");
    assert!(c.state().is_stale());
}

#[tokio::test]
async fn consumer_sees_transient_close_error() {
    let c = DummyChannel::new();
    c.open_async().await.expect("open");
    c.set(ChannelState::Faulted);

    let err = c.close_async().await.expect_err("closing a faulted channel fails");
    assert_eq!(err.fault_kind(), FaultKind::Communication);

    c.abort();
    assert_eq!(c.state(), ChannelState::Closed);
}

#[test]
fn state_round_trips_through_json() {
    let json = serde_json::to_string(&ChannelState::Faulted).expect("serialize");
    assert_eq!(json, "\"Faulted\"");
}
