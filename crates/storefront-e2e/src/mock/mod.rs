//! In-memory storefront for driving the page objects without a browser.
//!
//! ```
//! use storefront_e2e::mock::{FakeStorefront, FaultPlan};
//!
//! let store = FakeStorefront::new().with_faults(FaultPlan::none().with_detach(2));
//! assert_eq!(store.faults().detach_on_click, 2);
//! ```

mod dom;
mod storefront;

pub use storefront::{
    catalog_item, products_for, CatalogItem, FakeStoreFactory, FakeStorefront, FaultPlan, CATALOG,
};
