//! The cached-channel slot and the operations generated clients call.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use channel::{AsyncChannel, Channel};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::shutdown::{shutdown_channel, shutdown_channel_async};

/// Zero-argument constructor for new, unopened channels.
pub type ChannelFactory<C> = Box<dyn Fn() -> C + Send + Sync>;

/// A channel held by the slot, tagged with the generation it was installed as.
struct Cached<C> {
    channel: Arc<C>,
    generation: u64,
}

/// Manages a single reusable channel to one remote endpoint.
///
/// The controller is either *empty* or *cached*. [`acquire`](Self::acquire)
/// moves it from empty to cached by creating and opening a channel, and
/// replaces a cached channel whose state turned `Faulted` or `Closed`. Any
/// failure of a wrapped call forcibly discards the channel that call used.
///
/// The slot lock is held only for the slot transition itself, never across
/// an open, a close, or a remote call. When two callers race to populate an
/// empty slot, the first to finish opening wins and the other closes its
/// channel and uses the winner's.
pub struct ChannelController<C: Channel> {
    factory: ChannelFactory<C>,
    slot: Mutex<Option<Cached<C>>>,
    generation: AtomicU64,
}

impl<C: Channel> ChannelController<C> {
    /// Creates an empty controller that builds channels with `factory`.
    pub fn new(factory: impl Fn() -> C + Send + Sync + 'static) -> Self {
        Self { factory: Box::new(factory), slot: Mutex::new(None), generation: AtomicU64::new(0) }
    }

    /// Returns `true` while a channel is cached.
    pub fn is_cached(&self) -> bool { self.slot.lock().is_some() }

    /// Returns the cached channel without checking its state.
    pub fn cached(&self) -> Option<Arc<C>> {
        self.slot.lock().as_ref().map(|cached| Arc::clone(&cached.channel))
    }

    /// Returns the generation of the most recently installed channel.
    ///
    /// Generations start at 1; 0 means no channel was ever installed.
    pub fn generation(&self) -> u64 { self.generation.load(Ordering::Acquire) }

    /// Returns a channel that is either freshly opened or was not faulted or
    /// closed when this call inspected it.
    ///
    /// # Errors
    ///
    /// Factory and open failures are returned as-is and leave the controller
    /// empty. A stale channel whose graceful close raised an unrecognized
    /// error also fails the acquire, after that channel was aborted.
    pub fn acquire(&self) -> Result<Arc<C>, C::Error> {
        if let Some(stale) = self.take_stale() {
            shutdown_channel(&*stale, false)?;
        }
        if let Some(channel) = self.cached() {
            return Ok(channel);
        }

        let fresh = Arc::new((self.factory)());
        if let Err(err) = fresh.open() {
            tracing::debug!(error = %err, "channel open failed");
            fresh.abort();
            return Err(err);
        }

        let (channel, loser) = self.install(fresh);
        if let Some(loser) = loser {
            if let Err(err) = shutdown_channel(&*loser, false) {
                tracing::warn!(error = %err, "failed to discard channel that lost the install race");
            }
        }
        Ok(channel)
    }

    /// Acquires a channel, runs `operation` on it and returns its result.
    ///
    /// If the operation fails (or unwinds), the channel it ran on is
    /// discarded with an abort before the error is handed back unchanged.
    ///
    /// # Errors
    ///
    /// Acquire errors converted into `E`, or the operation's own error.
    pub fn invoke<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce(&C) -> Result<T, E>,
        E: From<C::Error>,
    {
        let channel = self.acquire()?;
        let guard = InvalidateOnFailure::new(self, Arc::clone(&channel));
        let result = operation(&channel);
        if result.is_ok() {
            guard.disarm();
        }
        result
    }

    /// Detaches `channel` from the slot if it is still the cached instance,
    /// then shuts it down.
    ///
    /// A channel installed by a racing caller is never touched.
    ///
    /// # Errors
    ///
    /// See [`shutdown_channel`].
    pub fn invalidate(&self, channel: &Arc<C>, always_abort: bool) -> Result<(), C::Error> {
        self.detach(channel);
        shutdown_channel(&**channel, always_abort)
    }

    /// Shuts down the cached channel, if any. The controller is empty
    /// afterwards even when the shutdown fails.
    ///
    /// # Errors
    ///
    /// See [`shutdown_channel`].
    pub fn shutdown(&self, always_abort: bool) -> Result<(), C::Error> {
        match self.take() {
            Some(channel) => shutdown_channel(&*channel, always_abort),
            None => Ok(()),
        }
    }

    /// Best-effort graceful shutdown that never fails.
    pub fn dispose(&self) {
        if let Err(err) = self.shutdown(false) {
            tracing::debug!(error = %err, "ignoring shutdown failure during dispose");
        }
    }

    fn take(&self) -> Option<Arc<C>> { self.slot.lock().take().map(|cached| cached.channel) }

    /// Removes the cached channel if its state says it can no longer be used.
    fn take_stale(&self) -> Option<Arc<C>> {
        let mut slot = self.slot.lock();
        let state = slot.as_ref()?.channel.state();
        if state.is_usable() {
            return None;
        }
        let cached = slot.take()?;
        tracing::debug!(generation = cached.generation, %state, "discarding stale channel");
        Some(cached.channel)
    }

    /// Caches `fresh` unless another caller got there first. Returns the
    /// channel to use and, on a lost race, the channel to discard.
    fn install(&self, fresh: Arc<C>) -> (Arc<C>, Option<Arc<C>>) {
        let mut slot = self.slot.lock();
        if let Some(winner) = slot.as_ref() {
            return (Arc::clone(&winner.channel), Some(fresh));
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(generation, "opened and cached channel");
        *slot = Some(Cached { channel: Arc::clone(&fresh), generation });
        (fresh, None)
    }

    fn detach(&self, channel: &Arc<C>) -> bool {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some(cached) if Arc::ptr_eq(&cached.channel, channel) => {
                tracing::debug!(generation = cached.generation, "detached channel from slot");
                *slot = None;
                true
            }
            _ => false,
        }
    }
}

impl<C: AsyncChannel> ChannelController<C> {
    /// Asynchronous form of [`acquire`](Self::acquire).
    ///
    /// # Errors
    ///
    /// Same as [`acquire`](Self::acquire).
    pub async fn acquire_async(&self) -> Result<Arc<C>, C::Error> {
        if let Some(stale) = self.take_stale() {
            self.discard_async(stale, false).await?;
        }
        if let Some(channel) = self.cached() {
            return Ok(channel);
        }

        let fresh = Arc::new((self.factory)());
        let pending = AbortOnDrop::new(&fresh);
        if let Err(err) = fresh.open_async().await {
            tracing::debug!(error = %err, "channel open failed");
            return Err(err);
        }
        pending.disarm();

        let (channel, loser) = self.install(fresh);
        if let Some(loser) = loser {
            if let Err(err) = self.discard_async(loser, false).await {
                tracing::warn!(error = %err, "failed to discard channel that lost the install race");
            }
        }
        Ok(channel)
    }

    /// Asynchronous form of [`invoke`](Self::invoke).
    ///
    /// The operation receives its own handle to the channel so the returned
    /// future may hold it across suspension points. Dropping the returned
    /// future mid-call counts as a failure and aborts the channel.
    ///
    /// # Errors
    ///
    /// Same as [`invoke`](Self::invoke).
    pub async fn invoke_async<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<C::Error>,
    {
        let channel = self.acquire_async().await?;
        let guard = InvalidateOnFailure::new(self, Arc::clone(&channel));
        let result = operation(channel).await;
        if result.is_ok() {
            guard.disarm();
        }
        result
    }

    /// Like [`invoke_async`](Self::invoke_async), but cancelling `token`
    /// while the operation runs aborts the channel this call acquired. A
    /// token that is already cancelled aborts it before the operation is
    /// first polled.
    ///
    /// Only that instance is aborted; a channel that has since replaced it
    /// in the slot is left alone. The operation is then driven to
    /// completion so it can report the failure the abort caused. The
    /// cancellation subscription ends with the call.
    ///
    /// # Errors
    ///
    /// Same as [`invoke`](Self::invoke).
    pub async fn invoke_cancellable<T, E, F, Fut>(
        &self,
        token: &CancellationToken,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<C::Error>,
    {
        let channel = self.acquire_async().await?;
        let mut guard = InvalidateOnFailure::new(self, Arc::clone(&channel));
        let call = operation(Arc::clone(&channel));
        tokio::pin!(call);

        let result = tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!("call cancelled, aborting its channel");
                guard.fire();
                call.await
            }
            result = &mut call => result,
        };
        if result.is_ok() {
            guard.disarm();
        }
        result
    }

    /// Asynchronous form of [`shutdown`](Self::shutdown).
    ///
    /// # Errors
    ///
    /// See [`shutdown_channel_async`].
    pub async fn shutdown_async(&self, always_abort: bool) -> Result<(), C::Error> {
        match self.take() {
            Some(channel) => self.discard_async(channel, always_abort).await,
            None => Ok(()),
        }
    }

    /// Asynchronous form of [`dispose`](Self::dispose).
    pub async fn dispose_async(&self) {
        if let Err(err) = self.shutdown_async(false).await {
            tracing::debug!(error = %err, "ignoring shutdown failure during dispose");
        }
    }

    /// Shuts down a channel that is no longer in the slot. Dropping the
    /// returned future before the close finishes aborts the channel.
    async fn discard_async(&self, channel: Arc<C>, always_abort: bool) -> Result<(), C::Error> {
        let pending = AbortOnDrop::new(&channel);
        let result = shutdown_channel_async(&*channel, always_abort).await;
        pending.disarm();
        result
    }
}

impl<C: Channel> Drop for ChannelController<C> {
    fn drop(&mut self) { self.dispose(); }
}

impl<C: Channel> std::fmt::Debug for ChannelController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("ChannelController")
            .field("cached_generation", &slot.as_ref().map(|cached| cached.generation))
            .field("cached_state", &slot.as_ref().map(|cached| cached.channel.state()))
            .field("generation", &self.generation())
            .finish()
    }
}

/// Aborts and detaches a channel when dropped while armed.
///
/// Covers error returns, unwinding and dropped futures alike.
struct InvalidateOnFailure<'a, C: Channel> {
    controller: &'a ChannelController<C>,
    channel: Option<Arc<C>>,
}

impl<'a, C: Channel> InvalidateOnFailure<'a, C> {
    fn new(controller: &'a ChannelController<C>, channel: Arc<C>) -> Self {
        Self { controller, channel: Some(channel) }
    }

    /// Invalidates the channel now; later drops are no-ops.
    fn fire(&mut self) {
        if let Some(channel) = self.channel.take() {
            if let Err(err) = self.controller.invalidate(&channel, true) {
                tracing::warn!(error = %err, "forced invalidation reported an error");
            }
        }
    }

    fn disarm(mut self) { self.channel = None; }
}

impl<C: Channel> Drop for InvalidateOnFailure<'_, C> {
    fn drop(&mut self) { self.fire(); }
}

/// Aborts a channel outside the slot if dropped before its open or close
/// completed.
struct AbortOnDrop<C: Channel> {
    channel: Option<Arc<C>>,
}

impl<C: Channel> AbortOnDrop<C> {
    fn new(channel: &Arc<C>) -> Self { Self { channel: Some(Arc::clone(channel)) } }

    fn disarm(mut self) { self.channel = None; }
}

impl<C: Channel> Drop for AbortOnDrop<C> {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            tracing::debug!(state = %channel.state(), "abandoned channel handshake, aborting");
            channel.abort();
        }
    }
}
