#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! # `steward-mem` — In-Process Channel Backend
//!
//! This crate provides [`MemChannel`], a concrete channel that lives entirely
//! in memory, and [`MemEndpoint`], the factory that produces it.
//!
//! It is the **reference backend**: it follows the channel contract exactly
//! and lets a test script every failure the lifecycle controller has to
//! handle.
//!
//! ## Overview
//!
//! - Every channel records how often it was opened, closed and aborted
//! - Open, close and call failures can be injected per channel or for all
//!   channels an endpoint produces next
//! - The state can be forced from outside to simulate a fault between calls
//! - [`MemChannel::call_async`] waits for a reply and observes aborts, which
//!   is what cancellation tests need
//!
//! ## Example
//! ```
//! use channel::{Channel, ChannelState};
//! use mem::MemEndpoint;
//!
//! let endpoint = MemEndpoint::new("mem://orders");
//! let factory = endpoint.factory();
//!
//! let channel = factory();
//! channel.open()?;
//! assert_eq!(channel.call("ping")?, "ping@1");
//!
//! channel.set_state(ChannelState::Faulted);
//! assert!(channel.call("ping").is_err());
//! assert_eq!(endpoint.created().len(), 1);
//! # Ok::<(), channel::ChannelError>(())
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use channel::{AsyncChannel, Channel, ChannelError, ChannelState};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Failures an endpoint injects into the channels it creates.
#[derive(Debug, Default, Clone)]
struct Faults {
    open: Option<ChannelError>,
    close: Option<ChannelError>,
    handshake: Duration,
}

struct Inner {
    id: u64,
    endpoint: String,
    state: Mutex<ChannelState>,
    faults: Mutex<Faults>,
    next_call_error: Mutex<Option<ChannelError>>,
    aborted: CancellationToken,
    opens: AtomicUsize,
    closes: AtomicUsize,
    aborts: AtomicUsize,
    calls: AtomicUsize,
}

/// An in-memory channel.
///
/// Clones share the same underlying channel, so a test can keep a handle to
/// every channel the controller creates and inspect it afterwards.
#[derive(Clone)]
pub struct MemChannel {
    inner: Arc<Inner>,
}

impl MemChannel {
    fn with_faults(id: u64, endpoint: &str, faults: Faults) -> Self {
        Self {
            inner: Arc::new(Inner {
                id,
                endpoint: endpoint.to_string(),
                state: Mutex::new(ChannelState::Created),
                faults: Mutex::new(faults),
                next_call_error: Mutex::new(None),
                aborted: CancellationToken::new(),
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                aborts: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Creates a standalone channel that is not tracked by any endpoint.
    pub fn new(id: u64) -> Self { Self::with_faults(id, "mem://detached", Faults::default()) }

    /// Returns the identifier assigned at creation (1-based per endpoint).
    pub fn id(&self) -> u64 { self.inner.id }

    /// Returns `true` if both handles refer to the same channel.
    pub fn same_as(&self, other: &MemChannel) -> bool { Arc::ptr_eq(&self.inner, &other.inner) }

    /// Forces the channel into `state`, as a transport would after a fault.
    pub fn set_state(&self, state: ChannelState) {
        logging::trace("MEM", &format!("channel {} forced to {}", self.inner.id, state));
        *self.inner.state.lock() = state;
    }

    /// Makes the next `open` fail with `err`.
    pub fn fail_open_with(&self, err: ChannelError) { self.inner.faults.lock().open = Some(err); }

    /// Makes every graceful close fail with `err`.
    pub fn fail_close_with(&self, err: ChannelError) { self.inner.faults.lock().close = Some(err); }

    /// Makes every later async open and close take `latency` to complete.
    /// An abort cuts the wait short.
    pub fn delay_handshakes(&self, latency: Duration) {
        self.inner.faults.lock().handshake = latency;
    }

    /// Makes the next call fail with `err`, faulting the channel.
    pub fn fail_next_call_with(&self, err: ChannelError) {
        *self.inner.next_call_error.lock() = Some(err);
    }

    /// Number of open attempts.
    pub fn open_count(&self) -> usize { self.inner.opens.load(Ordering::SeqCst) }

    /// Number of graceful close attempts.
    pub fn close_count(&self) -> usize { self.inner.closes.load(Ordering::SeqCst) }

    /// Number of aborts.
    pub fn abort_count(&self) -> usize { self.inner.aborts.load(Ordering::SeqCst) }

    /// Number of calls that reached the channel.
    pub fn call_count(&self) -> usize { self.inner.calls.load(Ordering::SeqCst) }

    /// Returns `true` once the channel has been aborted.
    pub fn is_aborted(&self) -> bool { self.inner.aborted.is_cancelled() }

    /// Performs a remote call and returns `"{method}@{id}"`.
    ///
    /// # Errors
    ///
    /// Fails when the channel is not opened, or with an injected call error.
    pub fn call(&self, method: &str) -> Result<String, ChannelError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_callable()?;
        if let Some(err) = self.inner.next_call_error.lock().take() {
            logging::trace("MEM", &format!("channel {} failing call {}", self.inner.id, method));
            *self.inner.state.lock() = ChannelState::Faulted;
            return Err(err);
        }
        Ok(format!("{}@{}", method, self.inner.id))
    }

    /// Performs a remote call whose reply takes `latency` to arrive.
    ///
    /// An abort while waiting ends the call with [`ChannelError::Aborted`].
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call), plus [`ChannelError::Aborted`].
    pub async fn call_async(&self, method: &str, latency: Duration) -> Result<String, ChannelError> {
        self.ensure_callable()?;
        tokio::select! {
            () = self.inner.aborted.cancelled() => Err(ChannelError::Aborted),
            () = tokio::time::sleep(latency) => self.call(method),
        }
    }

    async fn handshake(&self) -> Result<(), ChannelError> {
        tokio::task::yield_now().await;
        let latency = self.inner.faults.lock().handshake;
        if latency.is_zero() {
            return Ok(());
        }
        tokio::select! {
            () = self.inner.aborted.cancelled() => Err(ChannelError::Aborted),
            () = tokio::time::sleep(latency) => Ok(()),
        }
    }

    fn ensure_callable(&self) -> Result<(), ChannelError> {
        if self.inner.aborted.is_cancelled() {
            return Err(ChannelError::Aborted);
        }
        match self.state() {
            ChannelState::Opened => Ok(()),
            ChannelState::Faulted => Err(ChannelError::Faulted),
            state => Err(ChannelError::Communication(format!(
                "channel {} is {} on {}",
                self.inner.id, state, self.inner.endpoint
            ))),
        }
    }
}

impl std::fmt::Debug for MemChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemChannel")
            .field("id", &self.inner.id)
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

impl Channel for MemChannel {
    type Error = ChannelError;

    fn state(&self) -> ChannelState { *self.inner.state.lock() }

    fn open(&self) -> Result<(), ChannelError> {
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        logging::trace("MEM", &format!("→ open channel {} to {}", self.inner.id, self.inner.endpoint));
        if let Some(err) = self.inner.faults.lock().open.take() {
            *self.inner.state.lock() = ChannelState::Faulted;
            return Err(err);
        }
        let mut state = self.inner.state.lock();
        match *state {
            ChannelState::Created => {
                *state = ChannelState::Opened;
                Ok(())
            }
            other => Err(ChannelError::Other(format!("cannot open a channel that is {}", other))),
        }
    }

    fn close(&self) -> Result<(), ChannelError> {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        logging::trace("MEM", &format!("→ close channel {}", self.inner.id));
        if let Some(err) = self.inner.faults.lock().close.clone() {
            *self.inner.state.lock() = ChannelState::Faulted;
            return Err(err);
        }
        let mut state = self.inner.state.lock();
        if *state == ChannelState::Faulted {
            return Err(ChannelError::Faulted);
        }
        *state = ChannelState::Closed;
        Ok(())
    }

    fn abort(&self) {
        self.inner.aborts.fetch_add(1, Ordering::SeqCst);
        logging::trace("MEM", &format!("→ abort channel {}", self.inner.id));
        *self.inner.state.lock() = ChannelState::Closed;
        self.inner.aborted.cancel();
    }
}

#[async_trait]
impl AsyncChannel for MemChannel {
    async fn open_async(&self) -> Result<(), ChannelError> {
        self.handshake().await?;
        self.open()
    }

    async fn close_async(&self) -> Result<(), ChannelError> {
        self.handshake().await?;
        self.close()
    }
}

/// Produces [`MemChannel`]s and remembers every one of them.
///
/// Cloning an endpoint shares its bookkeeping.
#[derive(Clone)]
pub struct MemEndpoint {
    shared: Arc<EndpointShared>,
}

struct EndpointShared {
    address: String,
    next_id: AtomicU64,
    pending: Mutex<Faults>,
    created: Mutex<Vec<MemChannel>>,
}

impl MemEndpoint {
    /// Creates an endpoint with the given symbolic address.
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        logging::trace("MEM", &format!("→ initializing in-memory endpoint {}", address));
        Self {
            shared: Arc::new(EndpointShared {
                address,
                next_id: AtomicU64::new(1),
                pending: Mutex::new(Faults::default()),
                created: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns the symbolic address of this endpoint.
    pub fn address(&self) -> &str { &self.shared.address }

    /// Creates a new, unopened channel.
    ///
    /// Failures queued with [`fail_next_open_with`](Self::fail_next_open_with)
    /// and [`fail_closes_with`](Self::fail_closes_with) apply to it.
    pub fn create(&self) -> MemChannel {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let faults = {
            let mut pending = self.shared.pending.lock();
            Faults {
                open: pending.open.take(),
                close: pending.close.clone(),
                handshake: pending.handshake,
            }
        };
        let channel = MemChannel::with_faults(id, &self.shared.address, faults);
        self.shared.created.lock().push(channel.clone());
        channel
    }

    /// Returns a factory closure suitable for a lifecycle controller.
    pub fn factory(&self) -> impl Fn() -> MemChannel + Send + Sync + 'static {
        let endpoint = self.clone();
        move || endpoint.create()
    }

    /// Makes the next created channel fail to open with `err`.
    pub fn fail_next_open_with(&self, err: ChannelError) {
        self.shared.pending.lock().open = Some(err);
    }

    /// Makes every channel created from now on fail graceful closes with `err`.
    pub fn fail_closes_with(&self, err: ChannelError) {
        self.shared.pending.lock().close = Some(err);
    }

    /// Makes async opens and closes of channels created from now on take
    /// `latency`.
    pub fn delay_handshakes(&self, latency: Duration) {
        self.shared.pending.lock().handshake = latency;
    }

    /// Returns handles to every channel created so far, oldest first.
    pub fn created(&self) -> Vec<MemChannel> { self.shared.created.lock().clone() }

    /// Returns the channel with the given identifier.
    pub fn channel(&self, id: u64) -> Option<MemChannel> {
        self.shared.created.lock().iter().find(|c| c.id() == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close_lifecycle() {
        let channel = MemChannel::new(7);
        assert_eq!(channel.state(), ChannelState::Created);
        channel.open().expect("open");
        assert_eq!(channel.state(), ChannelState::Opened);
        assert_eq!(channel.call("ping").expect("call"), "ping@7");
        channel.close().expect("close");
        assert_eq!(channel.state(), ChannelState::Closed);
        assert_eq!((channel.open_count(), channel.close_count()), (1, 1));
    }

    #[test]
    fn test_open_twice_fails() {
        let channel = MemChannel::new(1);
        channel.open().expect("open");
        assert!(matches!(channel.open(), Err(ChannelError::Other(_))));
    }

    #[test]
    fn test_abort_is_repeatable() {
        let channel = MemChannel::new(1);
        channel.open().expect("open");
        channel.abort();
        channel.abort();
        assert_eq!(channel.abort_count(), 2);
        assert!(channel.is_aborted());
        assert_eq!(channel.call("ping"), Err(ChannelError::Aborted));
    }

    #[test]
    fn test_injected_call_error_faults_channel() {
        let channel = MemChannel::new(1);
        channel.open().expect("open");
        channel.fail_next_call_with(ChannelError::Timeout("slow".into()));
        assert_eq!(channel.call("ping"), Err(ChannelError::Timeout("slow".into())));
        assert_eq!(channel.state(), ChannelState::Faulted);
        assert_eq!(channel.call("ping"), Err(ChannelError::Faulted));
    }

    #[test]
    fn test_endpoint_applies_pending_faults_once() {
        let endpoint = MemEndpoint::new("mem://test");
        endpoint.fail_next_open_with(ChannelError::Communication("refused".into()));

        let first = endpoint.create();
        assert!(first.open().is_err());
        assert_eq!(first.state(), ChannelState::Faulted);

        let second = endpoint.create();
        second.open().expect("second open succeeds");
        assert_eq!(endpoint.created().len(), 2);
        assert!(endpoint.channel(2).expect("channel 2").same_as(&second));
    }
}
