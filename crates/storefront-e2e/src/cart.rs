//! Cart panel controller.
//!
//! The panel is a two-state machine (`Closed`, `Open`) probed through the
//! close affordance. Row, quantity and subtotal reads only exist while the
//! panel is open, and the floating badge only while it is closed, so every
//! public operation first moves the panel into the state it needs.
//!
//! Money is always compared in integer cents.

use crate::config::ZeroBadgePolicy;
use crate::locator::{capture_count, normalize_text, Role, Selector, SelectorPolicy, TextMatch};
use crate::money::{format_cents, parse_money, to_cents};
use crate::result::{StoreError, StoreResult};
use crate::session::Session;
use serde::{Deserialize, Serialize};

const QUANTITY_PATTERN: &str = r"Quantity:\s*(\d+)";
const BADGE_PATTERN: &str = r"^\s*(\d+)\s*$";
const MONEY_PATTERN: &str = r"^\$\s*\d";

fn close_button() -> SelectorPolicy {
    SelectorPolicy::new(
        "close cart button",
        Selector::role(Role::Button, TextMatch::exact("X")),
    )
    .or(Selector::attr("title", "Close cart"))
}

fn open_button() -> SelectorPolicy {
    SelectorPolicy::new("open cart button", Selector::attr("title", "Open cart")).or(
        Selector::tag("button").has(Selector::attr("title", "Products in cart quantity")),
    )
}

fn closed_badge() -> SelectorPolicy {
    SelectorPolicy::new(
        "closed cart badge",
        Selector::attr("title", "Products in cart quantity"),
    )
}

fn header_badge() -> SelectorPolicy {
    SelectorPolicy::new(
        "cart header badge",
        Selector::attr("data-testid", "cart-quantity"),
    )
    .or(Selector::text(TextMatch::pattern_ci(BADGE_PATTERN))
        .inside(Selector::tag("div").has_child(Selector::text(TextMatch::exact("Cart")))))
}

fn subtotal_value() -> SelectorPolicy {
    SelectorPolicy::new("subtotal", Selector::attr("data-testid", "subtotal-value")).or(
        Selector::text(TextMatch::pattern_ci(MONEY_PATTERN))
            .inside(Selector::tag("div").has_child(Selector::text(TextMatch::exact("SUBTOTAL")))),
    )
}

fn remove_control() -> Selector {
    Selector::attr("title", "remove product from cart")
}

fn remove_controls() -> SelectorPolicy {
    SelectorPolicy::new(
        "remove product buttons",
        Selector::role(Role::Button, TextMatch::pattern_ci("remove product")),
    )
    .or(remove_control())
}

/// Row containers: by test id, else the innermost `div` owning a remove
/// control and a quantity label
fn row_frames() -> [Selector; 2] {
    [
        Selector::tag("div").and(Selector::attr("data-testid", "cart-row")),
        Selector::tag("div")
            .has_child(remove_control())
            .has(Selector::text(TextMatch::contains("Quantity:"))),
    ]
}

fn rows() -> SelectorPolicy {
    let [by_id, structural] = row_frames();
    SelectorPolicy::new("cart rows", by_id).or(structural)
}

fn row(name: &str) -> SelectorPolicy {
    let [by_id, structural] = row_frames();
    let title = || Selector::text(TextMatch::exact(name));
    let image = || Selector::attr("alt", name);
    SelectorPolicy::new(format!("cart row {name:?}"), by_id.clone().has(title()))
        .or(by_id.has(image()))
        .or(structural.clone().has(title()))
        .or(structural.has(image()))
}

/// Elements naming each row: the title by test id, else the image `alt`
fn row_titles() -> SelectorPolicy {
    SelectorPolicy::new(
        "cart row titles",
        Selector::attr("data-testid", "cart-row-title"),
    )
    .or(Selector::attr_present("alt"))
    .inside(&rows())
}

fn quantity_labels() -> SelectorPolicy {
    SelectorPolicy::new(
        "quantity labels",
        Selector::text(TextMatch::contains("Quantity:")),
    )
    .inside(&rows())
}

fn quantity_label(name: &str) -> SelectorPolicy {
    SelectorPolicy::new(
        "quantity label",
        Selector::text(TextMatch::contains("Quantity:")),
    )
    .inside(&row(name))
}

fn unit_price_label(name: &str) -> SelectorPolicy {
    SelectorPolicy::new(
        "unit price",
        Selector::attr("data-testid", "cart-row-price"),
    )
    .or(Selector::text(TextMatch::pattern_ci(MONEY_PATTERN)))
    .inside(&row(name))
}

fn plus_button(name: &str) -> SelectorPolicy {
    SelectorPolicy::new(
        "increment button",
        Selector::role(Role::Button, TextMatch::exact("+")),
    )
    .inside(&row(name))
}

fn minus_button(name: &str) -> SelectorPolicy {
    SelectorPolicy::new(
        "decrement button",
        Selector::role(Role::Button, TextMatch::exact("-")),
    )
    .inside(&row(name))
}

fn remove_button(name: &str) -> SelectorPolicy {
    remove_controls().inside(&row(name))
}

/// Visibility of the cart panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelState {
    /// Floating button and closed badge visible
    Closed,
    /// Rows, header badge and subtotal visible
    Open,
}

/// One cart row as displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product display name
    pub name: String,
    /// Displayed quantity
    pub quantity: u32,
    /// Displayed unit price in cents
    pub unit_price_cents: i64,
}

/// Everything the open panel shows at one moment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Rows in display order
    pub lines: Vec<CartLine>,
    /// Displayed subtotal in cents
    pub subtotal_cents: i64,
    /// Header badge count; `None` when the badge is not rendered
    pub open_count: Option<u32>,
}

impl CartSnapshot {
    /// Sum of row quantities
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of unit price times quantity over every row
    #[must_use]
    pub fn expected_subtotal_cents(&self) -> i64 {
        self.lines
            .iter()
            .map(|line| line.unit_price_cents * i64::from(line.quantity))
            .sum()
    }

    /// No rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Violations of the cart invariants, empty when consistent
    #[must_use]
    pub fn violations(&self, zero_badge: ZeroBadgePolicy) -> Vec<String> {
        let mut out = Vec::new();
        let total = self.total_quantity();
        if self.subtotal_cents != self.expected_subtotal_cents() {
            out.push(format!(
                "subtotal {} != sum of rows {}",
                format_cents(self.subtotal_cents),
                format_cents(self.expected_subtotal_cents())
            ));
        }
        let expected_badge = expected_open_badge(total, zero_badge);
        if self.open_count != expected_badge {
            out.push(format!(
                "header badge {:?} != {:?} for {total} item(s)",
                self.open_count, expected_badge
            ));
        }
        out
    }
}

/// What the header badge shows for `count` items under `policy`
fn expected_open_badge(count: u32, policy: ZeroBadgePolicy) -> Option<u32> {
    match (count, policy) {
        (0, ZeroBadgePolicy::Hidden) => None,
        (n, _) => Some(n),
    }
}

fn parse_badge(what: &str, text: &str) -> StoreResult<u32> {
    capture_count(BADGE_PATTERN, what, text)
}

/// Cart panel page object
#[derive(Debug, Clone)]
pub struct CartPanel {
    session: Session,
}

impl CartPanel {
    /// Create the controller on a session
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Current panel state
    pub async fn state(&self) -> StoreResult<PanelState> {
        Ok(if self.session.count(&close_button()).await? > 0 {
            PanelState::Open
        } else {
            PanelState::Closed
        })
    }

    /// Open the panel (no-op when open)
    pub async fn open(&self) -> StoreResult<()> {
        self.transition(PanelState::Open).await
    }

    /// Close the panel (no-op when closed)
    pub async fn close(&self) -> StoreResult<()> {
        self.transition(PanelState::Closed).await
    }

    async fn transition(&self, to: PanelState) -> StoreResult<()> {
        if self.state().await? == to {
            return Ok(());
        }
        let trigger = match to {
            PanelState::Open => open_button(),
            PanelState::Closed => close_button(),
        };
        tracing::debug!(?to, "toggling cart panel");
        self.session.click(&trigger).await?;
        self.session
            .poller(self.session.timeouts().poll_short())
            .until(
                &format!("cart panel to be {to:?}"),
                move || self.state(),
                |state| *state == to,
            )
            .await?;
        Ok(())
    }

    // ---- rows ----

    async fn read_quantity(&self, name: &str) -> StoreResult<u32> {
        let policy = quantity_label(name);
        let policy = &policy;
        let what = format!("quantity of {name:?}");
        let what = what.as_str();
        self.session
            .retry()
            .run(policy.target(), move || async move {
                let text = self.session.text_of(policy).await?;
                capture_count(QUANTITY_PATTERN, what, &text)
            })
            .await
    }

    /// Quantity shown in the product's row
    pub async fn quantity(&self, name: &str) -> StoreResult<u32> {
        self.open().await?;
        self.read_quantity(name).await
    }

    /// Wait for the row to show `expected`
    pub async fn expect_row_quantity(&self, name: &str, expected: u32) -> StoreResult<()> {
        self.open().await?;
        self.session
            .poller(self.session.timeouts().poll_medium())
            .until(
                &format!("quantity of {name:?} to be {expected}"),
                move || self.read_quantity(name),
                |q| *q == expected,
            )
            .await?;
        Ok(())
    }

    /// Click the row's increment control `times` times
    pub async fn click_plus(&self, name: &str, times: u32) -> StoreResult<()> {
        self.open().await?;
        let policy = plus_button(name);
        for i in 0..times {
            tracing::debug!(product = name, click = i + 1, times, "increment");
            self.session.click(&policy).await?;
        }
        Ok(())
    }

    /// Click the row's decrement control `times` times
    ///
    /// Decrementing a row at quantity 1 removes it; a further click then
    /// fails with `ElementNotFound`.
    pub async fn click_minus(&self, name: &str, times: u32) -> StoreResult<()> {
        self.open().await?;
        let policy = minus_button(name);
        for i in 0..times {
            tracing::debug!(product = name, click = i + 1, times, "decrement");
            self.session.click(&policy).await?;
        }
        Ok(())
    }

    /// Remove the product's row and wait for it to disappear
    pub async fn remove_product(&self, name: &str) -> StoreResult<()> {
        self.open().await?;
        tracing::info!(product = name, "removing from cart");
        self.session.click(&remove_button(name)).await?;
        let policy = row(name);
        let policy = &policy;
        self.session
            .poller(self.session.timeouts().poll_medium())
            .until(
                &format!("row {name:?} to disappear"),
                move || self.session.count(policy),
                |n| *n == 0,
            )
            .await?;
        Ok(())
    }

    // ---- money ----

    async fn read_money(&self, policy: &SelectorPolicy) -> StoreResult<f64> {
        self.session
            .retry()
            .run(policy.target(), move || async move {
                let text = self.session.text_of(policy).await?;
                parse_money(&text)
            })
            .await
    }

    /// Unit price shown in the product's row
    pub async fn unit_price(&self, name: &str) -> StoreResult<f64> {
        self.open().await?;
        self.read_money(&unit_price_label(name)).await
    }

    /// Displayed subtotal
    pub async fn subtotal(&self) -> StoreResult<f64> {
        self.open().await?;
        self.read_money(&subtotal_value()).await
    }

    async fn read_subtotal_cents(&self) -> StoreResult<i64> {
        Ok(to_cents(self.read_money(&subtotal_value()).await?))
    }

    /// Check subtotal against displayed prices for two products
    pub async fn expect_subtotal_for_two_items(
        &self,
        first: &str,
        first_qty: u32,
        second: &str,
        second_qty: u32,
    ) -> StoreResult<i64> {
        self.expect_subtotal_for(&[(first, first_qty), (second, second_qty)])
            .await
    }

    /// Wait for the subtotal to equal the sum of displayed unit price times
    /// `quantity` over `lines`; returns the expected cents
    pub async fn expect_subtotal_for(&self, lines: &[(&str, u32)]) -> StoreResult<i64> {
        self.open().await?;
        let mut expected = 0.0;
        for (name, qty) in lines {
            let price = self.read_money(&unit_price_label(name)).await?;
            expected += price * f64::from(*qty);
        }
        let expected_cents = to_cents(expected);
        tracing::debug!(expected = %format_cents(expected_cents), "checking subtotal");
        self.session
            .poller(self.session.timeouts().poll_long())
            .until(
                &format!("subtotal to be {}", format_cents(expected_cents)),
                move || self.read_subtotal_cents(),
                |cents| *cents == expected_cents,
            )
            .await?;
        Ok(expected_cents)
    }

    // ---- clearing ----

    /// Remove rows one at a time until no remove control is left.
    ///
    /// Each removal is a resilient click on a freshly located control; a
    /// click that exhausts its attempts ends the clear with `Interaction`.
    pub async fn clear_cart(&self) -> StoreResult<()> {
        self.open().await?;
        let controls = remove_controls();
        let controls = &controls;
        tracing::info!("clearing cart");
        self.session
            .poller(self.session.timeouts().poll_long())
            .until(
                "cart to be cleared",
                move || async move {
                    if self.session.count(controls).await? > 0 {
                        self.session.click_first(controls).await?;
                    }
                    self.session.count(controls).await
                },
                |remaining| *remaining == 0,
            )
            .await?;
        Ok(())
    }

    /// Assert the terminal empty state: no rows, zero subtotal, header badge
    /// per the zero-badge policy, and a closed badge of 0
    pub async fn expect_empty_state(&self) -> StoreResult<()> {
        self.open().await?;
        let controls = remove_controls();
        let controls = &controls;
        self.session
            .poller(self.session.timeouts().poll_long())
            .until(
                "no remove controls",
                move || self.session.count(controls),
                |n| *n == 0,
            )
            .await?;
        self.session
            .poller(self.session.timeouts().poll_long())
            .until(
                "subtotal to be $ 0.00",
                move || self.read_subtotal_cents(),
                |cents| *cents == 0,
            )
            .await?;
        self.expect_count_open(0).await?;
        self.expect_count_closed(0).await
    }

    // ---- badges ----

    async fn read_closed(&self) -> StoreResult<u32> {
        let text = self.session.text_of(&closed_badge()).await?;
        parse_badge("closed cart badge", &text)
    }

    async fn read_open(&self) -> StoreResult<Option<u32>> {
        let badges = self.session.find_all(&header_badge()).await?;
        match badges.as_slice() {
            [] => Ok(None),
            [badge] => {
                let text = self.session.driver().text(badge).await?;
                parse_badge("cart header badge", &text).map(Some)
            }
            many => Err(StoreError::not_found("cart header badge", many.len())),
        }
    }

    /// Count on the floating badge (closes the panel)
    pub async fn count_closed(&self) -> StoreResult<u32> {
        self.close().await?;
        self.read_closed().await
    }

    /// Count on the header badge (opens the panel); `None` when not rendered
    pub async fn count_open(&self) -> StoreResult<Option<u32>> {
        self.open().await?;
        self.read_open().await
    }

    /// Wait for the floating badge to read `expected`
    pub async fn expect_count_closed(&self, expected: u32) -> StoreResult<()> {
        self.close().await?;
        self.session
            .poller(self.session.timeouts().poll_medium())
            .until(
                &format!("closed cart badge to read {expected}"),
                move || self.read_closed(),
                |n| *n == expected,
            )
            .await?;
        Ok(())
    }

    /// Wait for the header badge to read `expected`.
    ///
    /// At zero the configured [`ZeroBadgePolicy`] decides whether the badge
    /// must be absent or read "0"; the other rendering fails.
    pub async fn expect_count_open(&self, expected: u32) -> StoreResult<()> {
        self.open().await?;
        let policy = self.session.config().zero_badge;
        let want = expected_open_badge(expected, policy);
        self.session
            .poller(self.session.timeouts().poll_medium())
            .until(
                &format!("cart header badge to be {want:?} ({policy:?} zero badge)"),
                move || self.read_open(),
                |badge| *badge == want,
            )
            .await?;
        Ok(())
    }

    async fn read_total_quantity(&self) -> StoreResult<u32> {
        let labels = self.session.find_all(&quantity_labels()).await?;
        let mut total = 0;
        for label in &labels {
            let text = self.session.driver().text(label).await?;
            total += capture_count(QUANTITY_PATTERN, "row quantity", &text)?;
        }
        Ok(total)
    }

    /// Header badge and the sum of row quantities both equal `expected`
    pub async fn expect_total_items_open(&self, expected: u32) -> StoreResult<()> {
        self.expect_count_open(expected).await?;
        self.session
            .poller(self.session.timeouts().poll_medium())
            .until(
                &format!("row quantities to sum to {expected}"),
                move || self.read_total_quantity(),
                |total| *total == expected,
            )
            .await?;
        Ok(())
    }

    // ---- invariants ----

    async fn read_snapshot(&self) -> StoreResult<CartSnapshot> {
        let driver = self.session.driver();
        let titles = self.session.find_all(&row_titles()).await?;
        let mut names = Vec::with_capacity(titles.len());
        for title in &titles {
            let name = match driver.attribute(title, "alt").await? {
                Some(alt) => alt,
                None => driver.text(title).await?,
            };
            names.push(normalize_text(&name));
        }
        let mut lines = Vec::with_capacity(names.len());
        for name in names {
            let quantity = self.read_quantity(&name).await?;
            let unit_price_cents = to_cents(self.read_money(&unit_price_label(&name)).await?);
            lines.push(CartLine {
                name,
                quantity,
                unit_price_cents,
            });
        }
        Ok(CartSnapshot {
            lines,
            subtotal_cents: self.read_subtotal_cents().await?,
            open_count: self.read_open().await?,
        })
    }

    /// Everything the open panel shows
    pub async fn snapshot(&self) -> StoreResult<CartSnapshot> {
        self.open().await?;
        self.session
            .retry()
            .run("cart snapshot", move || self.read_snapshot())
            .await
    }

    /// Wait for a settled snapshot satisfying the subtotal and item-count
    /// invariants, then check the closed badge agrees
    pub async fn expect_consistent(&self) -> StoreResult<CartSnapshot> {
        self.open().await?;
        let policy = self.session.config().zero_badge;
        let snapshot = self
            .session
            .poller(self.session.timeouts().poll_medium())
            .until_stable(
                "cart totals to agree with rows",
                move || self.read_snapshot(),
                |snap| snap.violations(policy).is_empty(),
            )
            .await?;
        self.expect_count_closed(snapshot.total_quantity()).await?;
        Ok(snapshot)
    }
}
