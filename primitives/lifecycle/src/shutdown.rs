//! Close-or-abort policy for a single channel.
//!
//! Shutdown is a pure function of the channel, its current state and the
//! kind of error a graceful close raised. Nothing here touches the
//! controller's slot, so the same policy serves the controller, the
//! cancellation path and any caller holding a bare channel.
//!
//! | Condition                                   | Action                          |
//! |---------------------------------------------|---------------------------------|
//! | `always_abort`, or state is `Faulted`       | abort                           |
//! | state is `Closed`                           | nothing                         |
//! | otherwise                                   | close                           |
//! | close raised a communication/timeout error  | abort, error absorbed           |
//! | close raised any other error                | abort, error returned           |

use channel::{AsyncChannel, Channel, ChannelState, ClassifyFault};

/// What the shutdown policy does with a channel before any close is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownAction {
    /// Force the channel down.
    Abort,
    /// The channel is already closed.
    Nothing,
    /// Attempt a graceful close, falling back to abort on failure.
    Close,
}

/// Decides the first step of the shutdown policy.
pub fn shutdown_action(state: ChannelState, always_abort: bool) -> ShutdownAction {
    if always_abort || state == ChannelState::Faulted {
        ShutdownAction::Abort
    } else if state == ChannelState::Closed {
        ShutdownAction::Nothing
    } else {
        ShutdownAction::Close
    }
}

/// Shuts a channel down, blocking on the graceful close if one is attempted.
///
/// # Errors
///
/// Returns the close error only when it is neither a communication nor a
/// timeout error. The channel has been aborted by then.
pub fn shutdown_channel<C>(channel: &C, always_abort: bool) -> Result<(), C::Error>
where
    C: Channel + ?Sized,
{
    match shutdown_action(channel.state(), always_abort) {
        ShutdownAction::Abort => {
            channel.abort();
            Ok(())
        }
        ShutdownAction::Nothing => Ok(()),
        ShutdownAction::Close => channel.close().or_else(|err| abort_after_failed_close(channel, err)),
    }
}

/// Asynchronous form of [`shutdown_channel`]; only the graceful close is awaited.
///
/// # Errors
///
/// Same as [`shutdown_channel`].
pub async fn shutdown_channel_async<C>(channel: &C, always_abort: bool) -> Result<(), C::Error>
where
    C: AsyncChannel + ?Sized,
{
    match shutdown_action(channel.state(), always_abort) {
        ShutdownAction::Abort => {
            channel.abort();
            Ok(())
        }
        ShutdownAction::Nothing => Ok(()),
        ShutdownAction::Close => match channel.close_async().await {
            Ok(()) => Ok(()),
            Err(err) => abort_after_failed_close(channel, err),
        },
    }
}

fn abort_after_failed_close<C>(channel: &C, err: C::Error) -> Result<(), C::Error>
where
    C: Channel + ?Sized,
{
    channel.abort();
    let kind = err.fault_kind();
    if kind.is_transient() {
        tracing::warn!(?kind, error = %err, "graceful close failed, channel aborted");
        Ok(())
    } else {
        tracing::error!(?kind, error = %err, "graceful close failed with an unrecognized error");
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_action_table() {
        use ChannelState::*;

        for state in [Created, Opening, Opened, Closing, Closed, Faulted] {
            assert_eq!(shutdown_action(state, true), ShutdownAction::Abort);
        }

        assert_eq!(shutdown_action(Faulted, false), ShutdownAction::Abort);
        assert_eq!(shutdown_action(Closed, false), ShutdownAction::Nothing);
        assert_eq!(shutdown_action(Opened, false), ShutdownAction::Close);
        assert_eq!(shutdown_action(Created, false), ShutdownAction::Close);
        assert_eq!(shutdown_action(Closing, false), ShutdownAction::Close);
    }
}
