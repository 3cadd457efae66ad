//! Bounded polling
//!
//! Every wait in the suite goes through [`poll_until`]: check, and if the
//! condition does not hold yet, sleep a fixed interval and check again until
//! a fixed deadline passes.

use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Result of a single check
#[derive(Debug)]
pub enum Attempt<T> {
    /// Condition holds, stop polling
    Ready(T),
    /// Condition does not hold yet; carries what was observed
    Pending(String),
}

/// Deadline and interval for a polling loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollSettings {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn from_secs(timeout_secs: u64, interval_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(timeout_secs),
            Duration::from_secs(interval_secs),
        )
    }
}

/// The condition never held before the deadline
#[derive(Error, Debug)]
#[error("timed out after {}s waiting for {what} (last observed: {last})", elapsed.as_secs())]
pub struct PollTimeout {
    pub what: String,
    pub elapsed: Duration,
    pub last: String,
}

/// Run `check` until it returns [`Attempt::Ready`] or `settings.timeout` elapses.
///
/// The first check runs immediately. A check is always made after the final
/// sleep, so a condition that becomes true right at the deadline is still seen.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    settings: PollSettings,
    mut check: F,
) -> Result<T, PollTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let start = Instant::now();
    debug!(
        "Waiting for {} (timeout: {}s, interval: {}s)",
        what,
        settings.timeout.as_secs(),
        settings.interval.as_secs()
    );

    loop {
        let last = match check().await {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Pending(observed) => observed,
        };

        let elapsed = start.elapsed();
        if elapsed >= settings.timeout {
            warn!("Timeout waiting for {}: {}", what, last);
            return Err(PollTimeout {
                what: what.to_string(),
                elapsed,
                last,
            });
        }

        debug!("{} not ready: {}", what, last);
        sleep(settings.interval.min(settings.timeout - elapsed)).await;
    }
}
