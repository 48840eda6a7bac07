//! Product grid observer.

use crate::locator::{capture_count, Role, Selector, SelectorPolicy, TextMatch};
use crate::result::{StoreError, StoreResult};
use crate::session::Session;
use std::time::Duration;

const FOUND_PATTERN: &str = r"(\d+)\s*Product\(s\)\s*found";

fn found_label() -> SelectorPolicy {
    SelectorPolicy::new(
        "products found label",
        Selector::text(TextMatch::pattern_ci(r"Product\(s\) found")),
    )
    .or(Selector::tag("p").and(Selector::text(TextMatch::pattern_ci(r"\d+\s+products?\b.*found"))))
}

fn card_frame() -> Selector {
    Selector::tag("div").and(Selector::attr("tabindex", "1"))
}

fn cards() -> SelectorPolicy {
    SelectorPolicy::new(
        "product cards",
        card_frame().has(Selector::role(
            Role::Button,
            TextMatch::pattern_ci("add to cart"),
        )),
    )
}

fn card(name: &str) -> SelectorPolicy {
    SelectorPolicy::new(
        format!("product card {name:?}"),
        card_frame().has(Selector::attr("alt", name)),
    )
    .or(card_frame().has(Selector::text(TextMatch::exact(name))))
}

fn add_button(name: &str) -> SelectorPolicy {
    SelectorPolicy::new(
        "add to cart button",
        Selector::role(Role::Button, TextMatch::pattern_ci("^add to cart$")),
    )
    .inside(&card(name))
}

/// Product grid page object
#[derive(Debug, Clone)]
pub struct ProductGrid {
    session: Session,
}

impl ProductGrid {
    /// Create the observer on a session
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Rendered cards that carry an add-to-cart button
    pub async fn visible_product_count(&self) -> StoreResult<usize> {
        self.session.count(&cards()).await
    }

    /// Count shown by the "N Product(s) found" label
    pub async fn found_count(&self) -> StoreResult<usize> {
        let text = self.session.text_of(&found_label()).await?;
        Ok(capture_count(FOUND_PATTERN, "products found label", &text)? as usize)
    }

    /// One-shot check that the label agrees with the rendered cards
    pub async fn expect_products_found_matches_grid(&self) -> StoreResult<usize> {
        let found = self.found_count().await?;
        let visible = self.visible_product_count().await?;
        if found != visible {
            return Err(StoreError::assertion(format!(
                "label says {found} product(s) found but the grid renders {visible}"
            )));
        }
        Ok(visible)
    }

    /// Wait until label count and card count are equal on consecutive reads.
    ///
    /// A timeout means the grid never settled; it says nothing about how many
    /// products match.
    pub async fn wait_for_grid_stable(&self, timeout: Duration) -> StoreResult<usize> {
        let (found, _) = self
            .session
            .poller(timeout)
            .until_stable(
                "product grid to settle (found label, rendered cards)",
                move || async move {
                    let found = self.found_count().await?;
                    let visible = self.visible_product_count().await?;
                    Ok((found, visible))
                },
                |(found, visible)| found == visible,
            )
            .await?;
        tracing::debug!(products = found, "grid settled");
        Ok(found)
    }

    /// Wait until exactly one card shows `name`
    pub async fn wait_for_product_visible(&self, name: &str) -> StoreResult<()> {
        let policy = card(name);
        let policy = &policy;
        self.session
            .poller(self.session.timeouts().product_visible())
            .until(
                &format!("product {name:?} to appear in the grid (filtered out?)"),
                move || self.session.count(policy),
                |n| *n == 1,
            )
            .await?;
        Ok(())
    }

    /// Wait for the rendered card count to move away from `previous`
    pub async fn wait_for_count_change(&self, previous: usize, timeout: Duration) -> StoreResult<usize> {
        self.session
            .poller(timeout)
            .until(
                &format!("visible product count to change from {previous}"),
                move || self.visible_product_count(),
                |n| *n != previous,
            )
            .await
    }

    /// Add a product once the grid has settled and its card is visible
    pub async fn add_to_cart_by_name(&self, name: &str) -> StoreResult<()> {
        tracing::info!(product = name, "adding to cart");
        self.wait_for_grid_stable(self.session.timeouts().grid_stable())
            .await?;
        self.wait_for_product_visible(name).await?;
        self.session.click(&add_button(name)).await
    }
}
