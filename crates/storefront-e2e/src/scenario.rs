//! Named end-to-end scenarios and their runner.
//!
//! Each scenario gets a fresh page from a [`DriverFactory`], starts from
//! cleared storage, and stops at the first failed step. The runner turns
//! the outcome into a serializable [`ScenarioReport`].

use crate::config::SuiteConfig;
use crate::driver::StoreDriver;
use crate::result::{StoreError, StoreResult};
use crate::session::Session;
use crate::sizes::{Size, SizeSet};
use crate::store_page::StorePage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// Product used by most scenarios ($ 9.00)
pub const BLUE_TSHIRT: &str = "Blue T-Shirt";

/// Second product of the two-item scenarios
pub const BLACK_STRIPES: &str = "Black T-shirt with white stripes";

/// Opens a fresh page for each scenario
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Open a new page
    async fn open(&self, config: &SuiteConfig) -> StoreResult<Arc<dyn StoreDriver>>;
}

/// Named scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Filter, add two products, adjust quantity, verify totals, clear
    FullCartFlow,
    /// Cart survives a page reload
    CartPersistsAfterReload,
    /// A fresh cart shows the empty state
    EmptyCartState,
    /// Rapid filter changes leave the grid consistent
    RapidFilterToggle,
    /// Five quick increments land exactly
    RapidQuantityChanges,
    /// Adding a product again increments its row
    SameProductIncrementsQuantity,
    /// Subtotal equals displayed prices times quantities
    SubtotalAccuracy,
    /// Badges follow a removal
    BadgeUpdatesOnRemove,
}

impl Scenario {
    /// Every scenario in suite order
    pub const ALL: [Self; 8] = [
        Self::FullCartFlow,
        Self::CartPersistsAfterReload,
        Self::EmptyCartState,
        Self::RapidFilterToggle,
        Self::RapidQuantityChanges,
        Self::SameProductIncrementsQuantity,
        Self::SubtotalAccuracy,
        Self::BadgeUpdatesOnRemove,
    ];

    /// Kebab-case name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FullCartFlow => "full-cart-flow",
            Self::CartPersistsAfterReload => "cart-persists-after-reload",
            Self::EmptyCartState => "empty-cart-state",
            Self::RapidFilterToggle => "rapid-filter-toggle",
            Self::RapidQuantityChanges => "rapid-quantity-changes",
            Self::SameProductIncrementsQuantity => "same-product-increments-quantity",
            Self::SubtotalAccuracy => "subtotal-accuracy",
            Self::BadgeUpdatesOnRemove => "badge-updates-on-remove",
        }
    }

    /// One-line description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::FullCartFlow => "filter XS+ML, add two products, +2, check totals, clear, check empty",
            Self::CartPersistsAfterReload => "two products survive a reload",
            Self::EmptyCartState => "fresh cart shows the empty state",
            Self::RapidFilterToggle => "rapid filter changes end with a consistent grid",
            Self::RapidQuantityChanges => "five quick increments give quantity 6",
            Self::SameProductIncrementsQuantity => "adding a product three times gives quantity 3",
            Self::SubtotalAccuracy => "subtotal matches displayed prices times quantities",
            Self::BadgeUpdatesOnRemove => "badges drop to 1 after removing one of two products",
        }
    }

    /// Run the scenario on a page
    pub async fn run(self, page: &StorePage) -> StoreResult<()> {
        page.goto().await?;
        match self {
            Self::FullCartFlow => full_cart_flow(page).await,
            Self::CartPersistsAfterReload => cart_persists_after_reload(page).await,
            Self::EmptyCartState => empty_cart_state(page).await,
            Self::RapidFilterToggle => rapid_filter_toggle(page).await,
            Self::RapidQuantityChanges => rapid_quantity_changes(page).await,
            Self::SameProductIncrementsQuantity => same_product_increments_quantity(page).await,
            Self::SubtotalAccuracy => subtotal_accuracy(page).await,
            Self::BadgeUpdatesOnRemove => badge_updates_on_remove(page).await,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| StoreError::Config {
                message: format!("unknown scenario {s:?}"),
            })
    }
}

async fn full_cart_flow(page: &StorePage) -> StoreResult<()> {
    let (filters, grid, cart) = (page.filters(), page.grid(), page.cart());
    let timeouts = page.session().timeouts();

    filters.set_sizes_exactly([Size::XS, Size::ML]).await?;
    grid.wait_for_grid_stable(timeouts.grid_stable()).await?;
    let filtered = grid.visible_product_count().await?;

    filters.clear_all_sizes().await?;
    grid.wait_for_grid_stable(timeouts.grid_stable()).await?;
    grid.wait_for_count_change(filtered, timeouts.poll_long())
        .await?;

    cart.expect_count_closed(0).await?;
    grid.add_to_cart_by_name(BLUE_TSHIRT).await?;
    cart.expect_count_closed(1).await?;
    grid.add_to_cart_by_name(BLACK_STRIPES).await?;
    cart.expect_count_closed(2).await?;

    cart.expect_row_quantity(BLUE_TSHIRT, 1).await?;
    cart.click_plus(BLUE_TSHIRT, 2).await?;
    cart.expect_row_quantity(BLUE_TSHIRT, 3).await?;
    cart.expect_total_items_open(4).await?;
    cart.expect_subtotal_for_two_items(BLUE_TSHIRT, 3, BLACK_STRIPES, 1)
        .await?;

    cart.clear_cart().await?;
    cart.expect_empty_state().await?;
    cart.expect_count_open(0).await?;
    cart.expect_count_closed(0).await
}

async fn cart_persists_after_reload(page: &StorePage) -> StoreResult<()> {
    let (grid, cart) = (page.grid(), page.cart());

    grid.add_to_cart_by_name(BLUE_TSHIRT).await?;
    grid.add_to_cart_by_name(BLACK_STRIPES).await?;
    cart.expect_row_quantity(BLUE_TSHIRT, 1).await?;
    cart.expect_row_quantity(BLACK_STRIPES, 1).await?;
    cart.expect_total_items_open(2).await?;
    cart.close().await?;

    page.reload().await?;
    grid.wait_for_grid_stable(page.session().timeouts().grid_stable())
        .await?;

    cart.expect_count_closed(2).await?;
    cart.expect_row_quantity(BLUE_TSHIRT, 1).await?;
    cart.expect_row_quantity(BLACK_STRIPES, 1).await?;
    cart.expect_total_items_open(2).await
}

async fn empty_cart_state(page: &StorePage) -> StoreResult<()> {
    page.cart().open().await?;
    page.cart().expect_empty_state().await
}

async fn rapid_filter_toggle(page: &StorePage) -> StoreResult<()> {
    let (filters, grid) = (page.filters(), page.grid());
    let steps: [&[Size]; 5] = [
        &[Size::XS],
        &[Size::S],
        &[Size::M],
        &[Size::XS, Size::M],
        &[],
    ];
    for step in steps {
        filters.set_sizes_exactly(step.iter().copied()).await?;
    }
    grid.wait_for_grid_stable(page.session().timeouts().grid_stable())
        .await?;
    grid.expect_products_found_matches_grid().await?;
    let left = filters.selected_sizes().await?;
    if left != SizeSet::new() {
        return Err(StoreError::assertion(format!(
            "size filters still checked after clearing: {left:?}"
        )));
    }
    Ok(())
}

async fn rapid_quantity_changes(page: &StorePage) -> StoreResult<()> {
    let cart = page.cart();
    page.grid().add_to_cart_by_name(BLUE_TSHIRT).await?;
    cart.open().await?;
    cart.click_plus(BLUE_TSHIRT, 5).await?;
    cart.expect_row_quantity(BLUE_TSHIRT, 6).await?;
    cart.expect_total_items_open(6).await
}

async fn same_product_increments_quantity(page: &StorePage) -> StoreResult<()> {
    for _ in 0..3 {
        page.grid().add_to_cart_by_name(BLUE_TSHIRT).await?;
    }
    let cart = page.cart();
    cart.open().await?;
    cart.expect_row_quantity(BLUE_TSHIRT, 3).await?;
    cart.expect_total_items_open(3).await
}

async fn subtotal_accuracy(page: &StorePage) -> StoreResult<()> {
    let cart = page.cart();
    page.grid().add_to_cart_by_name(BLUE_TSHIRT).await?;
    page.grid().add_to_cart_by_name(BLACK_STRIPES).await?;
    cart.open().await?;
    cart.click_plus(BLUE_TSHIRT, 2).await?;
    cart.click_plus(BLACK_STRIPES, 1).await?;
    cart.expect_subtotal_for_two_items(BLUE_TSHIRT, 3, BLACK_STRIPES, 2)
        .await?;
    cart.expect_consistent().await.map(|_| ())
}

async fn badge_updates_on_remove(page: &StorePage) -> StoreResult<()> {
    let cart = page.cart();
    page.grid().add_to_cart_by_name(BLUE_TSHIRT).await?;
    page.grid().add_to_cart_by_name(BLACK_STRIPES).await?;
    cart.expect_count_closed(2).await?;

    cart.remove_product(BLACK_STRIPES).await?;

    cart.expect_count_closed(1).await?;
    cart.expect_total_items_open(1).await?;
    cart.expect_row_quantity(BLUE_TSHIRT, 1).await
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// All steps held
    pub passed: bool,
    /// Wall-clock duration
    pub duration_ms: u64,
    /// First failure, if any
    pub error: Option<String>,
}

/// Outcomes of a suite run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Per-scenario reports in run order
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    /// Number of passing scenarios
    #[must_use]
    pub fn passed(&self) -> usize {
        self.scenarios.iter().filter(|r| r.passed).count()
    }

    /// Number of failing scenarios
    #[must_use]
    pub fn failed(&self) -> usize {
        self.scenarios.len() - self.passed()
    }

    /// Whether every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Pretty JSON
    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run one scenario on a fresh page
pub async fn run_scenario(
    factory: &dyn DriverFactory,
    config: &SuiteConfig,
    scenario: Scenario,
) -> ScenarioReport {
    let start = Instant::now();
    tracing::info!(scenario = scenario.name(), "scenario started");
    let outcome: StoreResult<()> = async {
        let driver = factory.open(config).await?;
        let page = StorePage::new(Session::new(Arc::clone(&driver), config.clone()));
        let result = scenario.run(&page).await;
        if let Err(e) = driver.close().await {
            tracing::warn!(scenario = scenario.name(), error = %e, "closing page failed");
        }
        result
    }
    .await;
    let duration_ms = start.elapsed().as_millis() as u64;
    match &outcome {
        Ok(()) => tracing::info!(scenario = scenario.name(), duration_ms, "scenario passed"),
        Err(e) => tracing::warn!(scenario = scenario.name(), duration_ms, error = %e, "scenario failed"),
    }
    ScenarioReport {
        name: scenario.name().to_string(),
        passed: outcome.is_ok(),
        duration_ms,
        error: outcome.err().map(|e| e.to_string()),
    }
}

/// Run scenarios in order, optionally stopping at the first failure
pub async fn run_all(
    factory: &dyn DriverFactory,
    config: &SuiteConfig,
    scenarios: &[Scenario],
    fail_fast: bool,
) -> SuiteReport {
    let mut report = SuiteReport::default();
    for scenario in scenarios {
        let result = run_scenario(factory, config, *scenario).await;
        let failed = !result.passed;
        report.scenarios.push(result);
        if failed && fail_fast {
            tracing::warn!(scenario = scenario.name(), "stopping after first failure");
            break;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>().unwrap(), scenario);
            assert_eq!(scenario.to_string(), scenario.name());
        }
        assert!("checkout".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_serde_uses_kebab_names() {
        let json = serde_json::to_string(&Scenario::SubtotalAccuracy).unwrap();
        assert_eq!(json, "\"subtotal-accuracy\"");
    }

    #[test]
    fn test_suite_report_counts() {
        let report = SuiteReport {
            scenarios: vec![
                ScenarioReport {
                    name: "a".into(),
                    passed: true,
                    duration_ms: 10,
                    error: None,
                },
                ScenarioReport {
                    name: "b".into(),
                    passed: false,
                    duration_ms: 20,
                    error: Some("Timed out".into()),
                },
            ],
        };
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_passed());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"duration_ms\": 20"));
    }
}
