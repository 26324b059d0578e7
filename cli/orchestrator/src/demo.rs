//! Drives a lifecycle controller over the in-memory backend.
//!
//! Faults are injected on a schedule so the run shows channels being
//! discarded and recreated; an optional final call is cancelled mid-flight.

use std::time::Duration;

use channel::ChannelError;
use lifecycle::ChannelController;
use mem::MemEndpoint;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// How the demo run behaves
#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Number of calls to make
    pub calls: usize,
    /// Fail every n-th call; 0 never fails
    pub fault_every: usize,
    /// Finish with a slow call that gets cancelled
    pub cancel: bool,
}

/// Outcome of a demo run
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DemoReport {
    /// Calls made, excluding the cancelled one
    pub calls: usize,
    /// Calls that returned a reply
    pub succeeded: usize,
    /// Calls that failed
    pub failed: usize,
    /// Whether the cancelled call observed its channel being aborted
    pub cancelled: bool,
    /// Channels the endpoint created
    pub channels_created: usize,
    /// Generation of the last installed channel
    pub generation: u64,
}

/// Run the demo and shut the controller down gracefully.
pub async fn run_demo(options: &DemoOptions) -> Result<DemoReport> {
    let endpoint = MemEndpoint::new("mem://demo");
    let controller = ChannelController::new(endpoint.factory());
    let (mut succeeded, mut failed) = (0, 0);

    for call in 1..=options.calls {
        if options.fault_every > 0 && call % options.fault_every == 0 {
            let channel = controller.acquire_async().await?;
            channel.fail_next_call_with(ChannelError::Communication(format!(
                "injected fault on call {}",
                call
            )));
        }

        let reply = controller
            .invoke_async(|ch| async move { ch.call_async("Ping", Duration::ZERO).await })
            .await;
        match reply {
            Ok(reply) => {
                tracing::info!(call, %reply, "call succeeded");
                succeeded += 1;
            }
            Err(err) => {
                tracing::warn!(call, error = %err, "call failed");
                failed += 1;
            }
        }
    }

    let cancelled = if options.cancel {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let (result, ()) = tokio::join!(
            controller.invoke_cancellable(&token, |ch| async move {
                ch.call_async("Slow", Duration::from_secs(30)).await
            }),
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                trigger.cancel();
            }
        );
        tracing::info!(outcome = ?result, "cancellable call finished");
        matches!(result, Err(ChannelError::Aborted))
    } else {
        false
    };

    let report = DemoReport {
        calls: options.calls,
        succeeded,
        failed,
        cancelled,
        channels_created: endpoint.created().len(),
        generation: controller.generation(),
    };
    controller.shutdown_async(false).await?;
    Ok(report)
}
