//! Stability poller.
//!
//! The storefront re-renders asynchronously, so a single read showing the
//! target value is not evidence that the page has settled: the label and the
//! cards can update on different passes and a badge can lag the cart. Every
//! read-after-write in this crate goes through [`Poller`], which re-reads
//! until the value is accepted on `required_matches` consecutive reads (2 by
//! default) or the deadline passes.

use crate::result::{StoreError, StoreResult};
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Consecutive matching reads before a value counts as settled
pub const DEFAULT_STABLE_MATCHES: u32 = 2;

/// Poll configuration plus the polling loop itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    timeout: Duration,
    interval: Duration,
    required_matches: u32,
}

impl Poller {
    /// Poller with the given deadline and default interval and stability
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            required_matches: DEFAULT_STABLE_MATCHES,
        }
    }

    /// Set the interval between reads
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the number of consecutive matches required (minimum 1)
    #[must_use]
    pub const fn with_required_matches(mut self, matches: u32) -> Self {
        self.required_matches = if matches == 0 { 1 } else { matches };
        self
    }

    /// Same poller with another deadline
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Deadline
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Required consecutive matches
    #[must_use]
    pub const fn required_matches(&self) -> u32 {
        self.required_matches
    }

    /// Single-match form, for conditions that only move toward the target
    pub async fn until<T, F, Fut, A>(&self, what: &str, read: F, accept: A) -> StoreResult<T>
    where
        T: PartialEq + Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
        A: Fn(&T) -> bool,
    {
        self.with_required_matches(1)
            .until_stable(what, read, accept)
            .await
    }

    /// Read until an accepted value repeats `required_matches` times in a row.
    ///
    /// The match counter resets when the value changes, when a read is not
    /// accepted, and when a read fails transiently
    /// ([`StoreError::is_transient_read`]). Other read errors abort the poll.
    pub async fn until_stable<T, F, Fut, A>(
        &self,
        what: &str,
        mut read: F,
        accept: A,
    ) -> StoreResult<T>
    where
        T: PartialEq + Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
        A: Fn(&T) -> bool,
    {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut last: Option<T> = None;
        let mut hits = 0u32;
        let mut reads = 0u32;
        let mut last_observed: Option<String> = None;

        loop {
            reads += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Ok(outcome) = tokio::time::timeout(remaining, read()).await else {
                tracing::debug!(what, reads, "read still pending at the deadline");
                return Err(timed_out(what, last_observed, start));
            };
            match outcome {
                Ok(value) => {
                    last_observed = Some(format!("{value:?}"));
                    if accept(&value) {
                        hits = if last.as_ref() == Some(&value) {
                            hits + 1
                        } else {
                            1
                        };
                        if hits >= self.required_matches {
                            tracing::debug!(what, reads, elapsed_ms = start.elapsed().as_millis() as u64, "settled");
                            return Ok(value);
                        }
                        last = Some(value);
                    } else {
                        hits = 0;
                        last = None;
                    }
                }
                Err(e) if e.is_transient_read() => {
                    tracing::trace!(what, error = %e, "transient read failure");
                    last_observed = Some(format!("error: {e}"));
                    hits = 0;
                    last = None;
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(what, reads, last_observed = last_observed.as_deref().unwrap_or(NOTHING_READ), "poll deadline passed");
                return Err(timed_out(what, last_observed, start));
            }
            tokio::time::sleep(self.interval.min(deadline - now)).await;
        }
    }
}

/// Rendered as `last_observed` when no read completed before the deadline
pub const NOTHING_READ: &str = "(nothing read)";

fn timed_out(what: &str, last_observed: Option<String>, start: Instant) -> StoreError {
    StoreError::Timeout {
        what: what.to_string(),
        last_observed: last_observed.unwrap_or_else(|| NOTHING_READ.to_string()),
        elapsed: start.elapsed(),
    }
}
