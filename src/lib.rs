// SPDX-License-Identifier: CC0-1.0

//! Steward umbrella crate.
//!
//! This crate primarily serves as the workspace root. It re-exports the
//! runtime pieces a generated client links against: the channel contract,
//! the cached-channel lifecycle controller and the scoped name table.
//!
//! Everything else lives in the workspace member crates under `primitives`,
//! `backends`, `compiler` and `cli`.
//!
//! ## Example
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use steward::{Channel, ChannelController, ChannelError, ChannelState, NameTable};
//!
//! struct Flaky(Mutex<ChannelState>);
//!
//! impl Flaky {
//!     fn set(&self, state: ChannelState) { *self.0.lock().unwrap() = state; }
//! }
//!
//! impl Channel for Flaky {
//!     type Error = ChannelError;
//!
//!     fn state(&self) -> ChannelState { *self.0.lock().unwrap() }
//!
//!     fn open(&self) -> Result<(), ChannelError> {
//!         self.set(ChannelState::Opened);
//!         Ok(())
//!     }
//!
//!     fn close(&self) -> Result<(), ChannelError> {
//!         self.set(ChannelState::Closed);
//!         Ok(())
//!     }
//!
//!     fn abort(&self) { self.set(ChannelState::Closed); }
//! }
//!
//! let controller = ChannelController::new(|| Flaky(Mutex::new(ChannelState::Created)));
//! let first = controller.acquire()?;
//! first.set(ChannelState::Faulted);
//! let second = controller.acquire()?;
//! assert!(!Arc::ptr_eq(&first, &second));
//!
//! let mut names = NameTable::new(["GetProxy"]);
//! assert_eq!(names.allocate("getproxy"), "getproxy_0");
//! assert!(!steward::steward_meta::VERSION.is_empty());
//! # Ok::<(), ChannelError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![warn(deprecated_in_future)]
#![doc(test(attr(warn(unused))))]

pub use channel::{AsyncChannel, Channel, ChannelError, ChannelState, ClassifyFault, FaultKind};
pub use lifecycle::{shutdown_channel, shutdown_channel_async, ChannelController};
pub use naming::{NameTable, ScopeGuard};

/// Miscellaneous metadata about the Steward workspace.
pub mod steward_meta {
    /// Version string for the umbrella crate, as reported by Cargo.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
