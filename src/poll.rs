//! Convergence polling
//!
//! [`ConvergencePoller::wait_until`] re-evaluates a predicate against fresh
//! external state until it holds or a deadline passes. The poller knows
//! nothing about autoscalers; the predicate closes over whatever it observes.
//!
//! Timing contract:
//! - a `true` predicate returns immediately, with no trailing sleep
//! - a predicate that never holds returns `false` no later than
//!   `timeout + interval` after the first evaluation
//! - predicate errors abort the wait and are returned as-is; the poller never
//!   turns a failed observation into "not yet converged"

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

/// Default pause between evaluations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergencePoller {
    interval: Duration,
}

impl Default for ConvergencePoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ConvergencePoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `predicate` until it returns `Ok(true)` (→ `Ok(true)`), the
    /// timeout elapses (→ `Ok(false)`), or it fails (→ `Err`).
    pub async fn wait_until<F, Fut, E>(&self, timeout: Duration, mut predicate: F) -> Result<bool, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        let start = Instant::now();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if predicate().await? {
                debug!(attempt, elapsed = ?start.elapsed(), "[Poll] condition met");
                return Ok(true);
            }
            if start.elapsed() > timeout {
                debug!(attempt, ?timeout, "[Poll] gave up");
                return Ok(false);
            }
            sleep(self.interval).await;
        }
    }
}
