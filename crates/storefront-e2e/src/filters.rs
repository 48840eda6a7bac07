//! Size filter controller.
//!
//! Drives the multi-select size checkbox group to an exact selection. Each
//! toggle is a resilient interaction confirmed by re-reading its checkbox
//! before the next one starts, and the whole call ends with a full re-read
//! that must equal the requested set.

use crate::locator::{Role, Selector, SelectorPolicy};
use crate::result::{StoreError, StoreResult};
use crate::session::Session;
use crate::sizes::{Size, SizeSet};

fn checkbox_strategy(size: Size) -> Selector {
    Selector::tag("input")
        .and(Selector::attr("data-testid", "checkbox"))
        .and(Selector::attr("value", size.code()))
}

fn all_checkboxes() -> SelectorPolicy {
    SelectorPolicy::new(
        "size checkboxes",
        Selector::tag("input").and(Selector::attr("data-testid", "checkbox")),
    )
    .or(Selector::any_role(Role::Checkbox).inside(Selector::attr("data-testid", "size-filter")))
}

fn checkbox(size: Size) -> SelectorPolicy {
    SelectorPolicy::new(format!("size checkbox {size}"), checkbox_strategy(size)).or(
        Selector::any_role(Role::Checkbox).and(Selector::attr("value", size.code())),
    )
}

/// The clickable label wrapping a checkbox, falling back to the input itself
fn toggle(size: Size) -> SelectorPolicy {
    SelectorPolicy::new(
        format!("size filter {size}"),
        Selector::tag("label").has(checkbox_strategy(size)),
    )
    .or(checkbox_strategy(size))
}

/// Size filter page object
#[derive(Debug, Clone)]
pub struct Filters {
    session: Session,
}

impl Filters {
    /// Create the controller on a session
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Sizes whose checkbox is checked.
    ///
    /// Fails with `ElementNotFound` when the page renders no size checkboxes.
    pub async fn selected_sizes(&self) -> StoreResult<SizeSet> {
        self.session
            .retry()
            .run("size selection", move || self.read_selection())
            .await
    }

    async fn read_selection(&self) -> StoreResult<SizeSet> {
        let policy = all_checkboxes();
        let boxes = self.session.find_all(&policy).await?;
        if boxes.is_empty() {
            return Err(StoreError::not_found(policy.target(), 0));
        }
        let driver = self.session.driver();
        let mut selected = SizeSet::new();
        for handle in &boxes {
            let value = driver
                .attribute(handle, "value")
                .await?
                .ok_or_else(|| StoreError::parse("size checkbox value", ""))?;
            if driver.is_checked(handle).await? {
                selected.insert(value.parse()?);
            }
        }
        Ok(selected)
    }

    /// Checked state of one size
    pub async fn size_is_checked(&self, size: Size) -> StoreResult<bool> {
        self.session
            .retry()
            .run(&format!("size checkbox {size}"), move || self.read_checked(size))
            .await
    }

    async fn read_checked(&self, size: Size) -> StoreResult<bool> {
        let handle = self.session.resolve_unique(&checkbox(size)).await?;
        self.session.driver().is_checked(&handle).await
    }

    /// Make the checked sizes equal `desired`: uncheck extras, then check
    /// missing ones, then verify the full selection.
    pub async fn set_sizes_exactly(&self, desired: impl IntoIterator<Item = Size>) -> StoreResult<()> {
        let desired: SizeSet = desired.into_iter().collect();
        let current = self.selected_sizes().await?;
        if current == desired {
            tracing::debug!(?desired, "size selection already in place");
            return Ok(());
        }
        tracing::info!(from = ?current, to = ?desired, "setting size filters");

        for size in current.difference(&desired) {
            self.set_checked(*size, false).await?;
        }
        for size in desired.difference(&current) {
            self.set_checked(*size, true).await?;
        }

        let actual = self.selected_sizes().await?;
        if actual != desired {
            return Err(StoreError::assertion(format!(
                "size filters are {actual:?} after setting them to {desired:?}"
            )));
        }
        Ok(())
    }

    /// Uncheck every size
    pub async fn clear_all_sizes(&self) -> StoreResult<()> {
        self.set_sizes_exactly(SizeSet::new()).await
    }

    async fn set_checked(&self, size: Size, want: bool) -> StoreResult<()> {
        let policy = toggle(size);
        let policy = &policy;
        let timeout = self.session.timeouts().click();
        let driver = self.session.driver();

        // re-read before every click so a retried attempt never toggles back
        self.session
            .retry()
            .run(policy.target(), move || async move {
                if self.read_checked(size).await? == want {
                    return Ok(());
                }
                let handle = self.session.resolve_unique(policy).await?;
                driver.scroll_into_view(&handle).await?;
                driver.click(&handle, timeout).await
            })
            .await?;

        self.session
            .poller(self.session.timeouts().poll_short())
            .until(
                &format!("size {size} to be {}", if want { "checked" } else { "unchecked" }),
                move || self.read_checked(size),
                |checked| *checked == want,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;
    use crate::driver::StoreDriver;
    use crate::mock::{FakeStorefront, FaultPlan};
    use std::sync::Arc;

    async fn filters_on(store: FakeStorefront) -> (Arc<FakeStorefront>, Filters) {
        let store = Arc::new(store);
        store.navigate("http://store.test/").await.unwrap();
        let driver: Arc<dyn StoreDriver> = store.clone();
        (store, Filters::new(Session::new(driver, SuiteConfig::default())))
    }

    fn set(sizes: &[Size]) -> SizeSet {
        sizes.iter().copied().collect()
    }

    mod selection_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_starts_empty() {
            let (_, filters) = filters_on(FakeStorefront::new()).await;
            assert!(filters.selected_sizes().await.unwrap().is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_no_checkboxes_is_not_found() {
            let store = Arc::new(FakeStorefront::new());
            let driver: Arc<dyn StoreDriver> = store.clone();
            let filters = Filters::new(Session::new(driver, SuiteConfig::default()));
            let err = filters.selected_sizes().await.unwrap_err();
            assert!(matches!(err, StoreError::ElementNotFound { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_set_exact_from_other_selection() {
            let (store, filters) = filters_on(FakeStorefront::new()).await;
            filters.set_sizes_exactly([Size::S, Size::M]).await.unwrap();
            filters.set_sizes_exactly([Size::XS, Size::ML]).await.unwrap();
            assert_eq!(store.selected_sizes(), set(&[Size::XS, Size::ML]));
            assert!(filters.size_is_checked(Size::ML).await.unwrap());
            assert!(!filters.size_is_checked(Size::S).await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_idempotent() {
            let (store, filters) = filters_on(FakeStorefront::new()).await;
            filters.set_sizes_exactly([Size::L]).await.unwrap();
            let clicks = store.clicks();
            filters.set_sizes_exactly([Size::L]).await.unwrap();
            assert_eq!(store.clicks(), clicks);
        }

        #[tokio::test(start_paused = true)]
        async fn test_clear_all() {
            let (store, filters) = filters_on(FakeStorefront::new()).await;
            filters
                .set_sizes_exactly([Size::XS, Size::XL, Size::XXL])
                .await
                .unwrap();
            filters.clear_all_sizes().await.unwrap();
            assert!(store.selected_sizes().is_empty());
        }
    }

    mod resilience_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_toggle_survives_structural_faults() {
            let faults = FaultPlan::none()
                .with_detach(2)
                .with_intercept(1)
                .with_context_destroyed(1);
            let (store, filters) = filters_on(FakeStorefront::new().with_faults(faults)).await;
            filters.set_sizes_exactly([Size::M]).await.unwrap();
            assert_eq!(store.selected_sizes(), set(&[Size::M]));
            // the failed clicks were never applied, so no double toggle
            assert_eq!(store.clicks(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_toggle_budget_exhausted() {
            let (_, filters) =
                filters_on(FakeStorefront::new().with_faults(FaultPlan::none().with_detach(50))).await;
            let err = filters.set_sizes_exactly([Size::XS]).await.unwrap_err();
            match err {
                StoreError::Interaction { target, attempts, .. } => {
                    assert_eq!(target, "size filter XS");
                    assert_eq!(attempts, 6);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn size_set_strategy() -> impl Strategy<Value = SizeSet> {
            proptest::sample::subsequence(Size::ALL.to_vec(), 0..=Size::ALL.len())
                .prop_map(|v| v.into_iter().collect())
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn prop_set_then_read_round_trips(before in size_set_strategy(), after in size_set_strategy()) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .start_paused(true)
                    .build()
                    .unwrap();
                let read = rt.block_on(async {
                    let (_, filters) = filters_on(FakeStorefront::new()).await;
                    filters.set_sizes_exactly(before).await.unwrap();
                    filters.set_sizes_exactly(after.clone()).await.unwrap();
                    filters.selected_sizes().await.unwrap()
                });
                prop_assert_eq!(read, after);
            }
        }
    }
}
