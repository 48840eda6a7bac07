//! Session handed to every page object.
//!
//! Bundles the driver handle with the suite configuration and resolves
//! [`SelectorPolicy`] strategies against the live page. Page objects never
//! reach for a global page; they only act through the session they were
//! built with.

use crate::config::{SuiteConfig, Timeouts};
use crate::driver::{ElementHandle, StoreDriver};
use crate::locator::SelectorPolicy;
use crate::result::{StoreError, StoreResult};
use crate::retry::RetryPolicy;
use crate::wait::Poller;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Driver handle plus configuration
#[derive(Clone)]
pub struct Session {
    driver: Arc<dyn StoreDriver>,
    config: Arc<SuiteConfig>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session
    #[must_use]
    pub fn new(driver: Arc<dyn StoreDriver>, config: SuiteConfig) -> Self {
        Self {
            driver,
            config: Arc::new(config),
        }
    }

    /// The driver
    #[must_use]
    pub fn driver(&self) -> &dyn StoreDriver {
        self.driver.as_ref()
    }

    /// The configuration
    #[must_use]
    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Configured timeouts
    #[must_use]
    pub fn timeouts(&self) -> &Timeouts {
        &self.config.timeouts
    }

    /// Retry policy from the configuration
    #[must_use]
    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.max_attempts, self.config.backoff())
    }

    /// Poller with the configured interval and stability requirement
    #[must_use]
    pub fn poller(&self, timeout: Duration) -> Poller {
        Poller::new(timeout)
            .with_interval(self.config.poll_interval())
            .with_required_matches(self.config.stable_matches)
    }

    /// Matches of the first strategy that matches anything
    pub async fn find_all(&self, policy: &SelectorPolicy) -> StoreResult<Vec<ElementHandle>> {
        for (rank, selector) in policy.strategies().iter().enumerate() {
            let handles = self.driver.find_all(selector).await?;
            if !handles.is_empty() {
                if rank > 0 {
                    tracing::debug!(policy = policy.target(), rank, %selector, "fallback strategy matched");
                }
                return Ok(handles);
            }
        }
        Ok(Vec::new())
    }

    /// Number of matches of the first strategy that matches anything
    pub async fn count(&self, policy: &SelectorPolicy) -> StoreResult<usize> {
        Ok(self.find_all(policy).await?.len())
    }

    /// The single element matched by the first strategy with a unique match
    pub async fn resolve_unique(&self, policy: &SelectorPolicy) -> StoreResult<ElementHandle> {
        let mut seen = 0;
        for selector in policy.strategies() {
            let mut handles = self.driver.find_all(selector).await?;
            if handles.len() == 1 {
                return Ok(handles.remove(0));
            }
            if seen == 0 {
                seen = handles.len();
            }
        }
        Err(StoreError::not_found(policy.target(), seen))
    }

    /// First match of the first strategy that matches anything
    pub async fn resolve_first(&self, policy: &SelectorPolicy) -> StoreResult<ElementHandle> {
        self.find_all(policy)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(policy.target(), 0))
    }

    /// Text of the uniquely matched element
    pub async fn text_of(&self, policy: &SelectorPolicy) -> StoreResult<String> {
        let handle = self.resolve_unique(policy).await?;
        self.driver.text(&handle).await
    }

    /// Scroll to and click the uniquely matched element, re-locating it on
    /// every attempt
    pub async fn click(&self, policy: &SelectorPolicy) -> StoreResult<()> {
        self.click_resolved(policy, false).await
    }

    /// Like [`Session::click`], but takes the first of several matches
    pub async fn click_first(&self, policy: &SelectorPolicy) -> StoreResult<()> {
        self.click_resolved(policy, true).await
    }

    async fn click_resolved(&self, policy: &SelectorPolicy, first: bool) -> StoreResult<()> {
        let driver = self.driver();
        let timeout = self.timeouts().click();
        self.retry()
            .perform(
                policy.target(),
                move || async move {
                    if first {
                        self.resolve_first(policy).await
                    } else {
                        self.resolve_unique(policy).await
                    }
                },
                move |handle| async move {
                    driver.scroll_into_view(&handle).await?;
                    driver.click(&handle, timeout).await
                },
            )
            .await
    }
}
