//! Continuous polling.

use tasks::{RetryPolicy, WorkerError};
use tracing::{error, info};

use crate::{Backoff, Controller};

/// Runs poll cycles until shutdown or a fatal error.
///
/// After a clean cycle the loop sleeps the poll interval. A retryable store
/// error backs off exponentially up to the configured ceiling, or longer when
/// the store asked for a later retry; anything else ends the loop with the
/// error. Every sleep is cut short by shutdown.
///
/// Returns `Ok(())` once shutdown has been requested.
pub async fn watch(controller: &Controller) -> Result<(), WorkerError> {
    let ctx = controller.context();
    let interval = ctx.config.poll_interval;
    let mut backoff = Backoff::new(interval, ctx.config.backoff_ceiling);
    info!(interval_s = interval.as_secs(), "Polling. Ctrl+C to stop.");

    loop {
        let delay = match controller.run_cycle().await {
            Ok(report) if report.interrupted => return Ok(()),
            Ok(_) => {
                backoff.reset();
                interval
            }
            Err(WorkerError::Interrupted) => return Ok(()),
            Err(err) => match err.retry_policy() {
                RetryPolicy::Retryable { after } => {
                    let delay = backoff.next_delay().max(after.unwrap_or_default());
                    error!(
                        error = %err,
                        consecutive_errors = backoff.failures(),
                        retry_in_s = delay.as_secs(),
                        "Poll failed, backing off"
                    );
                    delay
                }
                RetryPolicy::NonRetryable => return Err(err),
            },
        };

        tokio::select! {
            _ = ctx.shutdown.cancelled() => return Ok(()),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
