#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! # `steward-channel` — Channel Contract
//!
//! This crate defines the **contract a remote connection must satisfy** to be
//! managed by the cached-channel lifecycle controller.
//!
//! A channel is an opaque, stateful handle to a remote endpoint. It is created
//! unopened by a factory, opened once, and from then on can only be shut down:
//! either gracefully ([`Channel::close`]) or forcibly ([`Channel::abort`]).
//! Once a channel is faulted or closed it can never be used again.
//!
//! ## Core Concepts
//!
//! ### `ChannelState`
//! The lifecycle classification of a channel, queried on demand. The
//! controller never caches it, since a network fault can occur between two
//! calls.
//!
//! ### `FaultKind` and `ClassifyFault`
//! Shutdown policy depends on *what kind* of error a graceful close raised:
//! communication and timeout errors are transient and absorbed by an abort,
//! every other error is propagated after the abort. Channel error types
//! implement [`ClassifyFault`] to expose that distinction.
//!
//! ### `Channel` and `AsyncChannel`
//! The synchronous and asynchronous forms of the contract. Abort is always
//! synchronous and infallible.
//!
//! ## Example
//! ```
//! use channel::Channel;
//!
//! fn is_reusable<C: Channel>(channel: &C) -> bool { channel.state().is_usable() }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Type alias for results carrying the canonical [`ChannelError`].
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Lifecycle classification of a channel.
///
/// `Created`, `Opened`, `Faulted` and `Closed` are the states the controller
/// reasons about. The transitional `Opening` and `Closing` states are reported
/// by transports that expose them; they count as usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelState {
    /// Constructed by the factory but not opened yet.
    Created,
    /// An open is in progress.
    Opening,
    /// Open and ready to carry calls.
    Opened,
    /// A graceful close is in progress.
    Closing,
    /// Closed, either gracefully or by an abort.
    Closed,
    /// The channel failed and can only be aborted.
    Faulted,
}

impl ChannelState {
    /// Returns `true` when a channel in this state must be discarded.
    pub fn is_stale(self) -> bool { matches!(self, ChannelState::Faulted | ChannelState::Closed) }

    /// Returns `true` when a channel in this state may still be reused.
    pub fn is_usable(self) -> bool { !self.is_stale() }

    /// Returns the canonical lowercase name of this state.
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelState::Created => "created",
            ChannelState::Opening => "opening",
            ChannelState::Opened => "opened",
            ChannelState::Closing => "closing",
            ChannelState::Closed => "closed",
            ChannelState::Faulted => "faulted",
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Error kinds the shutdown policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    /// The transport reported a communication failure.
    Communication,
    /// The transport gave up waiting for the peer.
    Timeout,
    /// Anything else; never absorbed by the shutdown policy.
    Other,
}

impl FaultKind {
    /// Returns `true` for the kinds a graceful close may raise on an unhealthy
    /// channel, which an abort fully recovers from.
    pub fn is_transient(self) -> bool {
        matches!(self, FaultKind::Communication | FaultKind::Timeout)
    }
}

/// Maps an error onto the [`FaultKind`] the shutdown policy acts upon.
///
/// Transports implement this for their own error type, which stands in for a
/// typed catch of communication and timeout exceptions.
pub trait ClassifyFault {
    /// Classifies this error.
    fn fault_kind(&self) -> FaultKind;
}

/// Canonical error type for channel implementations.
///
/// Transports are free to use their own error type; this one exists so that
/// simple backends and tests do not need to define one.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// A communication-level failure (connection reset, refused, broken pipe).
    #[error("communication error: {0}")]
    Communication(String),

    /// The peer did not answer in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The channel was aborted while in use.
    #[error("channel aborted")]
    Aborted,

    /// The channel is faulted and cannot carry calls.
    #[error("channel faulted")]
    Faulted,

    /// Any other error not covered by the specific variants above.
    #[error("{0}")]
    Other(String),
}

impl ClassifyFault for ChannelError {
    fn fault_kind(&self) -> FaultKind {
        match self {
            ChannelError::Communication(_) | ChannelError::Aborted | ChannelError::Faulted => {
                FaultKind::Communication
            }
            ChannelError::Timeout(_) => FaultKind::Timeout,
            ChannelError::Other(_) => FaultKind::Other,
        }
    }
}

impl From<std::io::Error> for ChannelError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                ChannelError::Timeout(err.to_string())
            }
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof => ChannelError::Communication(err.to_string()),
            _ => ChannelError::Other(err.to_string()),
        }
    }
}

/// The synchronous channel contract.
///
/// Methods take `&self`: a channel is shared between the controller's slot,
/// the call using it, and a cancellation subscription that may abort it, so
/// implementations use interior mutability for their state.
pub trait Channel: Send + Sync {
    /// Error raised by open, close, and calls made on the channel.
    type Error: ClassifyFault + std::error::Error + Send + Sync + 'static;

    /// Returns the current lifecycle classification.
    fn state(&self) -> ChannelState;

    /// Opens a freshly created channel, blocking until it is ready.
    fn open(&self) -> std::result::Result<(), Self::Error>;

    /// Gracefully closes the channel, blocking until the peer acknowledges.
    ///
    /// May fail if the channel is already unhealthy.
    fn close(&self) -> std::result::Result<(), Self::Error>;

    /// Forcibly tears the channel down.
    ///
    /// Must be safe to call in any state, any number of times.
    fn abort(&self);
}

/// The asynchronous channel contract.
///
/// Abort is inherited from [`Channel`] and stays synchronous.
#[async_trait]
pub trait AsyncChannel: Channel {
    /// Opens a freshly created channel.
    async fn open_async(&self) -> std::result::Result<(), Self::Error>;

    /// Gracefully closes the channel.
    async fn close_async(&self) -> std::result::Result<(), Self::Error>;
}
