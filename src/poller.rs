//! Eventually-consistent condition polling
//!
//! Every higher-level wait in this crate is a boolean condition evaluated by
//! [`wait_for_condition`] until it holds or the deadline passes. Errors from
//! the condition are treated as "not yet true", which absorbs the transient
//! failures AWS APIs return while resources settle.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::common::{Error, Result};

/// Default time to wait for a condition
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default sleep between attempts
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Smallest sleep between attempts, so a zero interval does not spin
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Timing for a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Give up once this much time has elapsed without success
    pub timeout: Duration,
    /// Sleep between attempts, at least [`MIN_INTERVAL`]
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl WaitOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Replace the timeout, keeping the interval
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the interval, keeping the timeout
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// How a successful wait went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Number of times the condition was evaluated
    pub attempts: u32,
    /// Time from the first attempt until the condition held
    pub elapsed: Duration,
}

/// Evaluate `condition` until it returns `Ok(true)` or `options.timeout` elapses
///
/// The condition is always evaluated at least once, even with a zero timeout.
/// `Err` results are logged and treated as `false`. There is no attempt limit;
/// the wait is bounded only by wall-clock time, and on expiry fails with
/// [`Error::ConditionTimeout`] carrying the configured timeout.
pub async fn wait_for_condition<F, Fut, E>(mut condition: F, options: WaitOptions) -> Result<WaitOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<bool, E>>,
    E: Display,
{
    let start = tokio::time::Instant::now();
    let interval = options.interval.max(MIN_INTERVAL);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        match condition().await {
            Ok(true) => {
                let elapsed = start.elapsed();
                tracing::debug!(attempts, elapsed_ms = elapsed.as_millis() as u64, "Condition met");
                return Ok(WaitOutcome { attempts, elapsed });
            }
            Ok(false) => {
                tracing::trace!(attempts, "Condition not met yet");
            }
            Err(e) => {
                tracing::debug!(attempts, error = %e, "Condition check failed, retrying");
            }
        }

        if start.elapsed() >= options.timeout {
            let timeout_ms = options.timeout.as_millis() as u64;
            tracing::debug!(attempts, timeout_ms, "Gave up waiting for condition");
            return Err(Error::ConditionTimeout { timeout_ms });
        }

        tokio::time::sleep(interval).await;
    }
}
