//! storefront-e2e: resilient page objects for a storefront end-to-end suite
//!
//! Drives a React storefront (size filter, product grid, slide-out cart)
//! through a [`StoreDriver`] and verifies what the page shows: filter
//! selections, grid counts, cart quantities, money totals, badges.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────────────────┐   ┌──────────────┐
//! │  Scenario    │──►│ StorePage                     │──►│ StoreDriver  │
//! │  runner      │   │  Filters · ProductGrid · Cart │   │  Chromium /  │
//! │              │   │  (Session: policy, retry,     │   │  FakeStore   │
//! │              │   │   poller, timeouts)           │   │              │
//! └──────────────┘   └───────────────────────────────┘   └──────────────┘
//! ```
//!
//! Reads go through a [`Poller`] that waits for the page to settle; clicks
//! go through a [`RetryPolicy`] that re-locates the target after a
//! re-render. Money is compared in integer cents.
//!
//! ```
//! use storefront_e2e::{parse_money, to_cents};
//!
//! let amount = parse_money("$ 24.90").unwrap();
//! assert_eq!(to_cents(amount), 2490);
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::needless_raw_string_hashes)]
mod browser;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod cart;
mod config;
mod driver;
#[allow(clippy::missing_errors_doc)]
mod filters;
#[allow(clippy::missing_errors_doc)]
mod grid;
mod locator;
mod money;
mod result;
mod retry;
#[allow(clippy::missing_errors_doc)]
mod scenario;
mod session;
mod sizes;
mod store_page;
mod wait;

/// In-memory storefront for tests and dry runs
///
/// Renders the store's markup into an arena and injects the flakiness the
/// real page shows: detached nodes, intercepted clicks, lagging labels.
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod mock;

#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumFactory};
pub use cart::{CartLine, CartPanel, CartSnapshot, PanelState};
pub use config::{
    origin_of, BrowserOptions, SuiteConfig, Timeouts, ZeroBadgePolicy, DEFAULT_BASE_URL,
    ENV_BASE_URL, ENV_CHROMIUM_PATH, ENV_HEADLESS,
};
pub use driver::{ElementHandle, StoreDriver};
pub use filters::Filters;
pub use grid::ProductGrid;
pub use locator::{capture_count, normalize_text, Role, Selector, SelectorPolicy, TextMatch};
pub use money::{cents_to_dollars, format_cents, parse_money, to_cents};
pub use result::{FailureClass, StoreError, StoreResult};
pub use retry::{RetryPolicy, DEFAULT_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS};
pub use scenario::{
    run_all, run_scenario, DriverFactory, Scenario, ScenarioReport, SuiteReport, BLACK_STRIPES,
    BLUE_TSHIRT,
};
pub use session::Session;
pub use sizes::{size_set, Size, SizeSet};
pub use store_page::StorePage;
pub use wait::{Poller, DEFAULT_POLL_INTERVAL_MS, DEFAULT_STABLE_MATCHES, NOTHING_READ};
