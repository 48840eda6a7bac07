//! Store page: the page objects of one session plus navigation.

use crate::cart::CartPanel;
use crate::filters::Filters;
use crate::grid::ProductGrid;
use crate::result::StoreResult;
use crate::session::Session;

/// Entry point for a scenario
#[derive(Debug, Clone)]
pub struct StorePage {
    session: Session,
    filters: Filters,
    grid: ProductGrid,
    cart: CartPanel,
}

impl StorePage {
    /// Build every page object on one session
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            filters: Filters::new(session.clone()),
            grid: ProductGrid::new(session.clone()),
            cart: CartPanel::new(session.clone()),
            session,
        }
    }

    /// Underlying session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Size filter
    #[must_use]
    pub const fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Product grid
    #[must_use]
    pub const fn grid(&self) -> &ProductGrid {
        &self.grid
    }

    /// Cart panel
    #[must_use]
    pub const fn cart(&self) -> &CartPanel {
        &self.cart
    }

    /// Clear the store origin's storage, then load the store
    pub async fn goto(&self) -> StoreResult<()> {
        let config = self.session.config();
        let origin = config.origin()?;
        let driver = self.session.driver();
        driver.clear_storage(&origin).await?;
        tracing::info!(url = %config.base_url, "opening store with cleared storage");
        driver.navigate(&config.base_url).await
    }

    /// Reload the current page, keeping storage
    pub async fn reload(&self) -> StoreResult<()> {
        tracing::info!("reloading store");
        self.session.driver().reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;
    use crate::driver::StoreDriver;
    use crate::mock::FakeStorefront;
    use std::sync::Arc;

    fn page() -> (Arc<FakeStorefront>, StorePage) {
        let store = Arc::new(FakeStorefront::new());
        let driver: Arc<dyn StoreDriver> = store.clone();
        let config = SuiteConfig::default().with_base_url("http://store.test/");
        (store, StorePage::new(Session::new(driver, config)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_goto_starts_clean() {
        let (store, page) = page();
        page.goto().await.unwrap();
        page.grid()
            .add_to_cart_by_name("Grey T-shirt")
            .await
            .unwrap();
        assert_eq!(store.cart_lines().len(), 1);

        page.goto().await.unwrap();
        assert!(store.cart_lines().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_keeps_cart() {
        let (store, page) = page();
        page.goto().await.unwrap();
        page.grid()
            .add_to_cart_by_name("Grey T-shirt")
            .await
            .unwrap();
        page.reload().await.unwrap();
        assert_eq!(store.cart_lines(), vec![("Grey T-shirt".to_string(), 1)]);
        page.cart().expect_count_closed(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_goto_rejects_bad_url() {
        let store = Arc::new(FakeStorefront::new());
        let driver: Arc<dyn StoreDriver> = store;
        let config = SuiteConfig::default().with_base_url("store.test");
        let page = StorePage::new(Session::new(driver, config));
        assert!(page.goto().await.is_err());
    }
}
