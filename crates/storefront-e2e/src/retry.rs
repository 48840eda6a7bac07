//! Resilient interactions with elements that may be re-created mid-action.
//!
//! Every attempt re-locates its element from scratch; a handle from a
//! previous attempt is never reused. Structural failures (detached node,
//! destroyed execution context, intercepted pointer event) consume an
//! attempt and back off; anything else propagates on the spot.

use crate::driver::ElementHandle;
use crate::result::{FailureClass, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Default attempts per interaction
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Default wait between attempts (150ms)
pub const DEFAULT_BACKOFF_MS: u64 = 150;

/// Attempt budget and backoff for resilient interactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first
    pub max_attempts: u32,
    /// Fixed wait after a retryable failure
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    #[must_use]
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Locate, then act; repeat from scratch on structural failure.
    pub async fn perform<T, L, LFut, A, AFut>(
        &self,
        target: &str,
        mut locate: L,
        mut action: A,
    ) -> StoreResult<T>
    where
        L: FnMut() -> LFut,
        LFut: Future<Output = StoreResult<ElementHandle>>,
        A: FnMut(ElementHandle) -> AFut,
        AFut: Future<Output = StoreResult<T>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let outcome = match locate().await {
                Ok(handle) => action(handle).await,
                Err(e) => Err(e),
            };
            if let Some(done) = self.verdict(target, attempts, outcome) {
                return done;
            }
            tokio::time::sleep(self.backoff).await;
        }
    }

    /// Run a compound attempt (one that locates its own elements) under the policy.
    pub async fn run<T, F, Fut>(&self, target: &str, mut attempt: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let outcome = attempt().await;
            if let Some(done) = self.verdict(target, attempts, outcome) {
                return done;
            }
            tokio::time::sleep(self.backoff).await;
        }
    }

    /// `None` means back off and try again
    fn verdict<T>(&self, target: &str, attempts: u32, outcome: StoreResult<T>) -> Option<StoreResult<T>> {
        let e = match outcome {
            Ok(value) => {
                if attempts > 1 {
                    tracing::debug!(interaction = target, attempts, "interaction recovered");
                }
                return Some(Ok(value));
            }
            Err(e) => e,
        };
        match e.failure_class() {
            FailureClass::Fatal => Some(Err(e)),
            FailureClass::Retryable if attempts >= self.max_attempts.max(1) => {
                tracing::warn!(interaction = target, attempts, error = %e, "retry budget exhausted");
                Some(Err(StoreError::Interaction {
                    target: target.to_string(),
                    attempts,
                    last: Box::new(e),
                }))
            }
            FailureClass::Retryable => {
                tracing::debug!(interaction = target, attempts, error = %e, "retryable failure, backing off");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn stale() -> StoreError {
        StoreError::StaleElement {
            target: "node".into(),
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_success_first_try() {
            let calls = Cell::new(0u32);
            let v = RetryPolicy::default()
                .run("button", || {
                    calls.set(calls.get() + 1);
                    async { Ok::<_, StoreError>(42) }
                })
                .await
                .unwrap();
            assert_eq!(v, 42);
            assert_eq!(calls.get(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_retryable_then_success() {
            let calls = Cell::new(0u32);
            let start = tokio::time::Instant::now();
            let v = RetryPolicy::default()
                .run("checkbox", || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n < 3 {
                            Err(stale())
                        } else {
                            Ok(n)
                        }
                    }
                })
                .await
                .unwrap();
            assert_eq!(v, 3);
            // two backoffs
            assert!(start.elapsed() >= Duration::from_millis(300));
        }

        #[tokio::test(start_paused = true)]
        async fn test_fatal_propagates_immediately() {
            let calls = Cell::new(0u32);
            let err = RetryPolicy::default()
                .run("row", || {
                    calls.set(calls.get() + 1);
                    async { Err::<(), _>(StoreError::not_found("row", 0)) }
                })
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::ElementNotFound { .. }));
            assert_eq!(calls.get(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_exhaustion_names_target_and_attempts() {
            let calls = Cell::new(0u32);
            let err = RetryPolicy::new(4, Duration::from_millis(10))
                .run("size filter XS", || {
                    calls.set(calls.get() + 1);
                    async {
                        Err::<(), _>(StoreError::ContextDestroyed {
                            message: "navigated".into(),
                        })
                    }
                })
                .await
                .unwrap_err();
            assert_eq!(calls.get(), 4);
            match err {
                StoreError::Interaction {
                    target,
                    attempts,
                    last,
                } => {
                    assert_eq!(target, "size filter XS");
                    assert_eq!(attempts, 4);
                    assert!(matches!(*last, StoreError::ContextDestroyed { .. }));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_zero_attempts_still_tries_once() {
            let calls = Cell::new(0u32);
            let err = RetryPolicy::new(0, Duration::ZERO)
                .run("x", || {
                    calls.set(calls.get() + 1);
                    async { Err::<(), _>(stale()) }
                })
                .await
                .unwrap_err();
            assert_eq!(calls.get(), 1);
            assert!(matches!(err, StoreError::Interaction { attempts: 1, .. }));
        }
    }

    mod perform_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_relocates_every_attempt() {
            let located = RefCell::new(Vec::new());
            let generation = Cell::new(0u32);
            let acted_on = RefCell::new(Vec::new());

            RetryPolicy::default()
                .perform(
                    "add to cart",
                    || {
                        generation.set(generation.get() + 1);
                        let id = format!("{}:5", generation.get());
                        located.borrow_mut().push(id.clone());
                        async move { Ok(ElementHandle::new(id, "button")) }
                    },
                    |handle| {
                        acted_on.borrow_mut().push(handle.id.clone());
                        let fail = handle.id != "3:5";
                        async move {
                            if fail {
                                Err(StoreError::Intercepted {
                                    target: handle.id,
                                    message: "overlay".into(),
                                })
                            } else {
                                Ok(())
                            }
                        }
                    },
                )
                .await
                .unwrap();

            assert_eq!(*located.borrow(), vec!["1:5", "2:5", "3:5"]);
            assert_eq!(*acted_on.borrow(), vec!["1:5", "2:5", "3:5"]);
        }

        #[tokio::test(start_paused = true)]
        async fn test_locate_failure_is_fatal() {
            let actions = Cell::new(0u32);
            let err = RetryPolicy::default()
                .perform(
                    "missing",
                    || async { Err(StoreError::not_found("missing", 0)) },
                    |_handle| {
                        actions.set(actions.get() + 1);
                        async { Ok(()) }
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::ElementNotFound { .. }));
            assert_eq!(actions.get(), 0);
        }
    }
}
