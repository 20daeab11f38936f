//! Fixed-delay reconnect loop.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{QueueError, QueueResult};

/// Failures logged in full before the loop goes quiet.
const MAX_LOGGED_FAILURES: u32 = 5;

/// Retry `connect` every `delay` until it succeeds or `cancel` turns true.
///
/// There is no attempt limit: a broker outage blocks the caller until the
/// broker comes back or the caller cancels.
pub async fn reconnect_with<F, Fut, T>(
    delay: Duration,
    cancel: &mut watch::Receiver<bool>,
    mut connect: F,
) -> QueueResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = QueueResult<T>>,
{
    let mut failures = 0u32;

    loop {
        if *cancel.borrow() {
            return Err(QueueError::Cancelled);
        }

        debug!(attempt = failures + 1, "Attempting to reconnect to broker");

        match connect().await {
            Ok(value) => {
                info!(failed_attempts = failures, "Reconnected to broker");
                return Ok(value);
            }
            Err(e) => {
                failures += 1;
                if failures <= MAX_LOGGED_FAILURES {
                    error!(error = %e, retry_in = ?delay, "Failed to reconnect to broker");
                } else if failures == MAX_LOGGED_FAILURES + 1 {
                    warn!("Broker still unreachable, suppressing further reconnect errors");
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = cancel.changed() => {
                if changed.is_err() {
                    // Sender gone: nobody can cancel any more, keep the cadence.
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
