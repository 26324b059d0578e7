#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! # `steward-lifecycle` — Cached-Channel Lifecycle Controller
//!
//! Every generated client embeds one [`ChannelController`] per remote
//! endpoint. The controller owns a single reusable channel and guarantees
//! that each call runs against a channel that was not faulted or closed when
//! it was handed out, recreating it transparently when needed.
//!
//! ## Module Organization
//!
//! - `controller` - the cached-channel slot and its sync/async operations
//! - `shutdown` - the close-or-abort policy, as free functions over a channel
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//!
//! use channel::{Channel, ChannelError, ChannelState};
//! use lifecycle::ChannelController;
//!
//! struct Loopback(parking_lot::Mutex<ChannelState>);
//!
//! impl Channel for Loopback {
//!     type Error = ChannelError;
//!     fn state(&self) -> ChannelState { *self.0.lock() }
//!     fn open(&self) -> Result<(), ChannelError> { *self.0.lock() = ChannelState::Opened; Ok(()) }
//!     fn close(&self) -> Result<(), ChannelError> { *self.0.lock() = ChannelState::Closed; Ok(()) }
//!     fn abort(&self) { *self.0.lock() = ChannelState::Closed; }
//! }
//!
//! let controller =
//!     ChannelController::new(|| Loopback(parking_lot::Mutex::new(ChannelState::Created)));
//! let first: Arc<Loopback> = controller.acquire()?;
//! let second = controller.acquire()?;
//! assert!(Arc::ptr_eq(&first, &second));
//!
//! let echoed: Result<u32, ChannelError> = controller.invoke(|_channel| Ok(7));
//! assert_eq!(echoed?, 7);
//! # Ok::<(), ChannelError>(())
//! ```

pub mod controller;
pub mod shutdown;

pub use controller::{ChannelController, ChannelFactory};
pub use shutdown::{shutdown_action, shutdown_channel, shutdown_channel_async, ShutdownAction};
