//! Subscription driver.
//!
//! Pulls messages off a stream and hands each one to the handler on its own
//! task, until the stream ends or a shutdown signal arrives. At most
//! `max_in_flight` deliveries run at once; while the cap is reached the stream
//! is not polled, so backpressure reaches the subscriber's bounded channel.

use std::future::Future;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::task::JoinSet;

use crate::forwarder::handler::MessageHandler;
use crate::nats::RawMessage;

/// Counters reported when the runner stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Messages taken off the stream
    pub received: u64,
    /// Handler tasks that ran to completion
    pub completed: u64,
    /// Handler tasks that panicked
    pub panicked: u64,
    /// Times the concurrency cap was reached and reading paused
    pub saturated: u64,
}

/// Default cap on concurrent deliveries
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Drive `messages` through `handler` until the stream ends or `shutdown` resolves.
///
/// No more than `max_in_flight` handler tasks run concurrently (a cap of 0 is
/// treated as 1). On shutdown the stream is dropped first, so no further
/// messages are taken, then every delivery still in flight is awaited.
pub async fn run<S, F>(
    handler: Arc<MessageHandler>,
    messages: S,
    shutdown: F,
    max_in_flight: usize,
) -> RunSummary
where
    S: Stream<Item = RawMessage> + Unpin,
    F: Future<Output = ()>,
{
    let max_in_flight = max_in_flight.max(1);
    let mut messages = messages;
    let mut in_flight = JoinSet::new();
    let mut summary = RunSummary::default();
    let mut saturated = false;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal, stopping subscriber");
                break;
            }
            next = messages.next(), if in_flight.len() < max_in_flight => match next {
                Some(message) => {
                    summary.received += 1;
                    let handler = Arc::clone(&handler);
                    in_flight.spawn(async move { handler.handle(&message).await });

                    if in_flight.len() >= max_in_flight && !saturated {
                        saturated = true;
                        summary.saturated += 1;
                        tracing::warn!(max_in_flight, "Delivery cap reached, pausing subscription");
                    }
                }
                None => {
                    tracing::warn!("Subscription closed");
                    break;
                }
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                record(&mut summary, joined);

                if saturated && in_flight.len() < max_in_flight {
                    saturated = false;
                    tracing::debug!(max_in_flight, "Delivery slot freed, resuming subscription");
                }
            }
        }
    }

    // Dropping the subscriber unsubscribes from the server
    drop(messages);

    if !in_flight.is_empty() {
        tracing::info!(pending = in_flight.len(), "Waiting for outstanding deliveries");
    }
    while let Some(joined) = in_flight.join_next().await {
        record(&mut summary, joined);
    }

    tracing::info!(
        received = summary.received,
        completed = summary.completed,
        panicked = summary.panicked,
        saturated = summary.saturated,
        "Subscriber stopped gracefully"
    );
    summary
}

fn record(summary: &mut RunSummary, joined: Result<(), tokio::task::JoinError>) {
    match joined {
        Ok(()) => summary.completed += 1,
        Err(e) => {
            summary.panicked += 1;
            tracing::error!(error = %e, "Message handler task failed");
        }
    }
}

/// Resolve on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
