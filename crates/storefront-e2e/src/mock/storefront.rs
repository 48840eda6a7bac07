//! In-memory storefront implementing [`StoreDriver`].
//!
//! Renders the same shapes the live store does (size filter, found label,
//! product cards, floating cart button, cart panel) into a [`Dom`] arena.
//! Every state change re-renders the whole tree under a new generation, so
//! handles taken before a change go stale exactly like detached nodes in a
//! browser. The cart is persisted per origin and survives `reload`, while
//! `clear_storage` wipes it.

use super::dom::{ClickAction, Dom, Node};
use crate::config::{origin_of, SuiteConfig, ZeroBadgePolicy};
use crate::driver::{ElementHandle, StoreDriver};
use crate::locator::Selector;
use crate::money::format_cents;
use crate::result::{StoreError, StoreResult};
use crate::scenario::DriverFactory;
use crate::sizes::{Size, SizeSet};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A catalog entry of the in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogItem {
    /// Display name (natural key)
    pub name: &'static str,
    /// Unit price in cents
    pub price_cents: i64,
    /// Sizes the product is offered in
    pub sizes: &'static [Size],
}

const fn item(name: &'static str, price_cents: i64, sizes: &'static [Size]) -> CatalogItem {
    CatalogItem {
        name,
        price_cents,
        sizes,
    }
}

/// Products served by [`FakeStorefront`], in grid order
pub const CATALOG: &[CatalogItem] = &[
    item("Cropped Stay Groovy off white", 1090, &[Size::S, Size::M, Size::L]),
    item("Basic Cactus White T-shirt", 1325, &[Size::XS, Size::S]),
    item("Skater Black Sweatshirt", 2590, &[Size::XL]),
    item("Black Tule Oversized", 2945, &[Size::ML, Size::L, Size::XL]),
    item("Black Batman T-shirt", 1090, &[Size::S, Size::XXL]),
    item("Blue T-Shirt", 900, &[Size::ML, Size::L, Size::XL, Size::XXL]),
    item("Loose Black T-shirt", 1490, &[Size::XS, Size::M]),
    item("Ringer Hall Pass", 1090, &[Size::S, Size::M]),
    item("Grey T-shirt", 1490, &[Size::L]),
    item(
        "Black T-shirt with white stripes",
        1490,
        &[Size::XS, Size::S, Size::M, Size::ML, Size::L],
    ),
    item("Turtles Ninja T-shirt", 1090, &[Size::ML, Size::XL]),
    item("Slim black T-shirt", 4900, &[Size::XS, Size::XXL]),
    item("Blue Sweatshirt", 2250, &[Size::L, Size::XL]),
    item("Tso 3D Short Sleeve T-Shirt A", 1090, &[Size::M, Size::L]),
    item("Tso 3D Black T-shirt", 1870, &[Size::XL, Size::XXL]),
    item("Crazy Monkey Black T-shirt", 13490, &[Size::S, Size::M, Size::L]),
];

/// Catalog entry by display name
#[must_use]
pub fn catalog_item(name: &str) -> Option<&'static CatalogItem> {
    CATALOG.iter().find(|item| item.name == name)
}

/// Products shown for a size selection (empty selection shows everything)
#[must_use]
pub fn products_for(selected: &SizeSet) -> Vec<&'static CatalogItem> {
    CATALOG
        .iter()
        .filter(|item| selected.is_empty() || item.sizes.iter().any(|s| selected.contains(s)))
        .collect()
}

/// Faults injected into the fake store.
///
/// The `*_on_click` counters are consumed: each one fails that many upcoming
/// clicks (context first, then detach, then intercept) without applying
/// them. The lag settings persist: after every relevant change the rendered
/// text keeps its previous value for that many `find_all` calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Clicks that re-render the page and fail as detached
    pub detach_on_click: u32,
    /// Clicks swallowed by an overlay
    pub intercept_on_click: u32,
    /// Clicks that race a navigation
    pub context_destroyed_on_click: u32,
    /// Reads during which the found label trails a filter change
    pub label_lag_reads: u32,
    /// Reads during which badges and subtotal trail a cart change
    pub totals_lag_reads: u32,
}

impl FaultPlan {
    /// No faults
    #[must_use]
    pub const fn none() -> Self {
        Self {
            detach_on_click: 0,
            intercept_on_click: 0,
            context_destroyed_on_click: 0,
            label_lag_reads: 0,
            totals_lag_reads: 0,
        }
    }

    /// Fail the next `n` clicks as detached
    #[must_use]
    pub const fn with_detach(mut self, n: u32) -> Self {
        self.detach_on_click = n;
        self
    }

    /// Intercept the next `n` clicks
    #[must_use]
    pub const fn with_intercept(mut self, n: u32) -> Self {
        self.intercept_on_click = n;
        self
    }

    /// Destroy the context on the next `n` clicks
    #[must_use]
    pub const fn with_context_destroyed(mut self, n: u32) -> Self {
        self.context_destroyed_on_click = n;
        self
    }

    /// Lag the found label by `reads`
    #[must_use]
    pub const fn with_label_lag(mut self, reads: u32) -> Self {
        self.label_lag_reads = reads;
        self
    }

    /// Lag badges and subtotal by `reads`
    #[must_use]
    pub const fn with_totals_lag(mut self, reads: u32) -> Self {
        self.totals_lag_reads = reads;
        self
    }
}

#[derive(Debug)]
struct State {
    generation: u64,
    url: Option<String>,
    origin: Option<String>,
    storage: BTreeMap<String, Vec<(String, u32)>>,
    selected: SizeSet,
    lines: Vec<(String, u32)>,
    panel_open: bool,
    shown_found: usize,
    shown_count: u32,
    shown_subtotal: i64,
    label_lag_left: u32,
    totals_lag_left: u32,
    faults: FaultPlan,
    clicks: u64,
    zero_badge: ZeroBadgePolicy,
    open_on_add: bool,
    test_ids: bool,
    closed: bool,
    dom: Dom,
}

impl State {
    fn new() -> Self {
        Self {
            generation: 0,
            url: None,
            origin: None,
            storage: BTreeMap::new(),
            selected: SizeSet::new(),
            lines: Vec::new(),
            panel_open: false,
            shown_found: 0,
            shown_count: 0,
            shown_subtotal: 0,
            label_lag_left: 0,
            totals_lag_left: 0,
            faults: FaultPlan::none(),
            clicks: 0,
            zero_badge: ZeroBadgePolicy::Hidden,
            open_on_add: true,
            test_ids: true,
            closed: false,
            dom: Dom::new(),
        }
    }

    fn totals(&self) -> (u32, i64) {
        self.lines.iter().fold((0, 0), |(count, cents), (name, qty)| {
            let price = catalog_item(name).map_or(0, |item| item.price_cents);
            (count + qty, cents + price * i64::from(*qty))
        })
    }

    fn sync_label(&mut self) {
        self.shown_found = products_for(&self.selected).len();
        self.label_lag_left = 0;
    }

    fn sync_totals(&mut self) {
        (self.shown_count, self.shown_subtotal) = self.totals();
        self.totals_lag_left = 0;
    }

    fn rerender(&mut self) {
        self.generation += 1;
        self.dom = if self.url.is_some() {
            render(self)
        } else {
            Dom::new()
        };
    }

    fn load(&mut self, url: &str) -> StoreResult<()> {
        let origin = origin_of(url).map_err(|e| StoreError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        self.lines = self.storage.get(&origin).cloned().unwrap_or_default();
        self.url = Some(url.to_string());
        self.origin = Some(origin);
        self.selected.clear();
        self.panel_open = false;
        self.sync_label();
        self.sync_totals();
        self.rerender();
        Ok(())
    }

    /// Let lagging text advance one read
    fn catch_up(&mut self) {
        let mut changed = false;
        if self.label_lag_left > 0 {
            self.label_lag_left -= 1;
            if self.label_lag_left == 0 {
                self.sync_label();
                changed = true;
            }
        }
        if self.totals_lag_left > 0 {
            self.totals_lag_left -= 1;
            if self.totals_lag_left == 0 {
                self.sync_totals();
                changed = true;
            }
        }
        if changed {
            self.rerender();
        }
    }

    fn filters_changed(&mut self) {
        if self.faults.label_lag_reads == 0 {
            self.sync_label();
        } else {
            self.label_lag_left = self.faults.label_lag_reads;
        }
    }

    fn cart_changed(&mut self) {
        if let Some(origin) = &self.origin {
            self.storage.insert(origin.clone(), self.lines.clone());
        }
        if self.faults.totals_lag_reads == 0 {
            self.sync_totals();
        } else {
            self.totals_lag_left = self.faults.totals_lag_reads;
        }
    }

    fn apply(&mut self, action: ClickAction) {
        match action {
            ClickAction::ToggleSize(size) => {
                if !self.selected.remove(&size) {
                    self.selected.insert(size);
                }
                self.filters_changed();
            }
            ClickAction::AddToCart(name) => {
                match self.lines.iter_mut().find(|(n, _)| *n == name) {
                    Some((_, qty)) => *qty += 1,
                    None => self.lines.push((name, 1)),
                }
                if self.open_on_add {
                    self.panel_open = true;
                }
                self.cart_changed();
            }
            ClickAction::Increment(name) => {
                if let Some((_, qty)) = self.lines.iter_mut().find(|(n, _)| *n == name) {
                    *qty += 1;
                }
                self.cart_changed();
            }
            ClickAction::Decrement(name) => {
                if let Some((_, qty)) = self.lines.iter_mut().find(|(n, _)| *n == name) {
                    *qty -= 1;
                }
                self.lines.retain(|(_, qty)| *qty > 0);
                self.cart_changed();
            }
            ClickAction::Remove(name) => {
                self.lines.retain(|(n, _)| *n != name);
                self.cart_changed();
            }
            ClickAction::OpenCart => self.panel_open = true,
            ClickAction::CloseCart => self.panel_open = false,
        }
        self.rerender();
    }

    /// Resolve a handle against the current render
    fn node_index(&self, element: &ElementHandle) -> StoreResult<usize> {
        let stale = || StoreError::StaleElement {
            target: element.id.clone(),
        };
        let (generation, idx) = element.id.split_once(':').ok_or_else(stale)?;
        let generation: u64 = generation.parse().map_err(|_| stale())?;
        let idx: usize = idx.parse().map_err(|_| stale())?;
        if generation != self.generation || idx >= self.dom.len() {
            return Err(stale());
        }
        Ok(idx)
    }

    fn inject_click_fault(&mut self, element: &ElementHandle) -> StoreResult<()> {
        if self.faults.context_destroyed_on_click > 0 {
            self.faults.context_destroyed_on_click -= 1;
            self.rerender();
            return Err(StoreError::ContextDestroyed {
                message: "Execution context was destroyed, most likely because of a navigation"
                    .into(),
            });
        }
        if self.faults.detach_on_click > 0 {
            self.faults.detach_on_click -= 1;
            self.rerender();
            return Err(StoreError::StaleElement {
                target: element.id.clone(),
            });
        }
        if self.faults.intercept_on_click > 0 {
            self.faults.intercept_on_click -= 1;
            return Err(StoreError::Intercepted {
                target: element.id.clone(),
                message: "<div class=\"overlay\"> intercepts pointer events".into(),
            });
        }
        Ok(())
    }
}

fn render(state: &State) -> Dom {
    let mut dom = Dom::new();
    let body = dom.push(None, Node::new("body"));
    let main = dom.push(Some(body), Node::new("main"));

    let filter = dom.push(
        Some(main),
        Node::new("div").attr("data-testid", "size-filter"),
    );
    dom.push(Some(filter), Node::new("h4").text("Sizes:"));
    for size in Size::ALL {
        let label = dom.push(
            Some(filter),
            Node::new("label").on_click(ClickAction::ToggleSize(size)),
        );
        dom.push(
            Some(label),
            Node::new("input")
                .attr("type", "checkbox")
                .attr("data-testid", "checkbox")
                .attr("value", size.code())
                .checked(state.selected.contains(&size))
                .on_click(ClickAction::ToggleSize(size)),
        );
        dom.push(Some(label), Node::new("span").text(size.code()));
    }

    let shelf = dom.push(Some(main), Node::new("div"));
    dom.push(
        Some(shelf),
        Node::new("p").text(format!("{} Product(s) found", state.shown_found)),
    );
    let grid = dom.push(Some(shelf), Node::new("div"));
    for product in products_for(&state.selected) {
        let card = dom.push(Some(grid), Node::new("div").attr("tabindex", "1"));
        dom.push(Some(card), Node::new("div").attr("alt", product.name));
        dom.push(Some(card), Node::new("p").text(product.name));
        dom.push(
            Some(card),
            Node::new("p").text(format_cents(product.price_cents)),
        );
        dom.push(
            Some(card),
            Node::new("button")
                .text("Add to cart")
                .on_click(ClickAction::AddToCart(product.name.to_string())),
        );
    }

    let cart = dom.push(Some(body), Node::new("div"));
    if state.panel_open {
        render_panel(&mut dom, cart, state);
    } else {
        let open = dom.push(
            Some(cart),
            Node::new("button")
                .attr("title", "Open cart")
                .on_click(ClickAction::OpenCart),
        );
        dom.push(
            Some(open),
            Node::new("span")
                .attr("title", "Products in cart quantity")
                .text(state.shown_count.to_string()),
        );
    }
    dom
}

fn render_panel(dom: &mut Dom, cart: usize, state: &State) {
    let test_id = |node: Node, id: &str| {
        if state.test_ids {
            node.attr("data-testid", id)
        } else {
            node
        }
    };
    dom.push(
        Some(cart),
        Node::new("button")
            .attr("title", "Close cart")
            .text("X")
            .on_click(ClickAction::CloseCart),
    );
    let header = dom.push(Some(cart), Node::new("div"));
    if state.shown_count > 0 || state.zero_badge == ZeroBadgePolicy::RenderedZero {
        let icon = dom.push(Some(header), Node::new("div"));
        dom.push(
            Some(icon),
            test_id(Node::new("span"), "cart-quantity").text(state.shown_count.to_string()),
        );
    }
    dom.push(Some(header), Node::new("p").text("Cart"));

    let list = dom.push(Some(cart), Node::new("div"));
    if state.lines.is_empty() {
        dom.push(
            Some(list),
            Node::new("p").text("Add some products in the cart :)"),
        );
    }
    for (name, qty) in &state.lines {
        let price = catalog_item(name).map_or(0, |item| item.price_cents);
        let row = dom.push(Some(list), test_id(Node::new("div"), "cart-row"));
        dom.push(
            Some(row),
            Node::new("button")
                .attr("aria-label", "remove product from cart")
                .attr("title", "remove product from cart")
                .text("X")
                .on_click(ClickAction::Remove(name.clone())),
        );
        dom.push(Some(row), Node::new("div").attr("alt", name.as_str()));
        let details = dom.push(Some(row), Node::new("div"));
        dom.push(
            Some(details),
            test_id(Node::new("p"), "cart-row-title").text(name.as_str()),
        );
        dom.push(
            Some(details),
            Node::new("p").text(format!("Quantity: {qty}")),
        );
        let pricing = dom.push(Some(row), Node::new("div"));
        dom.push(
            Some(pricing),
            test_id(Node::new("p"), "cart-row-price").text(format_cents(price)),
        );
        let stepper = dom.push(Some(pricing), Node::new("div"));
        dom.push(
            Some(stepper),
            Node::new("button")
                .text("-")
                .on_click(ClickAction::Decrement(name.clone())),
        );
        dom.push(
            Some(stepper),
            Node::new("button")
                .text("+")
                .on_click(ClickAction::Increment(name.clone())),
        );
    }

    let footer = dom.push(Some(cart), Node::new("div"));
    dom.push(Some(footer), Node::new("p").text("SUBTOTAL"));
    let sub_price = dom.push(Some(footer), Node::new("div"));
    dom.push(
        Some(sub_price),
        test_id(Node::new("p"), "subtotal-value").text(format_cents(state.shown_subtotal)),
    );
}

/// Deterministic in-memory storefront
#[derive(Debug)]
pub struct FakeStorefront {
    state: Mutex<State>,
}

impl Default for FakeStorefront {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStorefront {
    /// Empty page; call `navigate` to load the store
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::new()),
        }
    }

    /// Render the header badge at zero items according to `policy`
    #[must_use]
    pub fn with_zero_badge(self, policy: ZeroBadgePolicy) -> Self {
        self.with_state(|s| s.zero_badge = policy);
        self
    }

    /// Install a fault plan
    #[must_use]
    pub fn with_faults(self, faults: FaultPlan) -> Self {
        self.set_faults(faults);
        self
    }

    /// Whether adding a product pops the cart panel open (default true)
    #[must_use]
    pub fn with_open_on_add(self, open: bool) -> Self {
        self.with_state(|s| s.open_on_add = open);
        self
    }

    /// Whether the cart panel carries `data-testid` hooks (default true).
    ///
    /// Without them the panel only offers structure and text to locate by.
    #[must_use]
    pub fn with_test_ids(self, test_ids: bool) -> Self {
        self.with_state(|s| {
            s.test_ids = test_ids;
            s.rerender();
        });
        self
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Replace the fault plan
    pub fn set_faults(&self, faults: FaultPlan) {
        self.with_state(|s| s.faults = faults);
    }

    /// Whether the page was closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.with_state(|s| s.closed)
    }

    /// Faults not yet consumed
    #[must_use]
    pub fn faults(&self) -> FaultPlan {
        self.with_state(|s| s.faults)
    }

    /// Cart lines as (name, quantity), in insertion order
    #[must_use]
    pub fn cart_lines(&self) -> Vec<(String, u32)> {
        self.with_state(|s| s.lines.clone())
    }

    /// Currently checked sizes
    #[must_use]
    pub fn selected_sizes(&self) -> SizeSet {
        self.with_state(|s| s.selected.clone())
    }

    /// Whether the cart panel is open
    #[must_use]
    pub fn panel_open(&self) -> bool {
        self.with_state(|s| s.panel_open)
    }

    /// Clicks that reached a handler
    #[must_use]
    pub fn clicks(&self) -> u64 {
        self.with_state(|s| s.clicks)
    }

    /// Current render generation
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.with_state(|s| s.generation)
    }
}

#[async_trait]
impl StoreDriver for FakeStorefront {
    async fn navigate(&self, url: &str) -> StoreResult<()> {
        tracing::debug!(url, "fake navigate");
        self.with_state(|s| s.load(url))
    }

    async fn reload(&self) -> StoreResult<()> {
        self.with_state(|s| {
            let url = s.url.clone().ok_or_else(|| StoreError::Navigation {
                url: String::new(),
                message: "reload before any navigation".into(),
            })?;
            s.load(&url)
        })
    }

    async fn clear_storage(&self, origin: &str) -> StoreResult<()> {
        self.with_state(|s| {
            s.storage.remove(origin.trim_end_matches('/'));
        });
        Ok(())
    }

    async fn find_all(&self, selector: &Selector) -> StoreResult<Vec<ElementHandle>> {
        Ok(self.with_state(|s| {
            s.catch_up();
            s.dom
                .query(selector)
                .into_iter()
                .filter_map(|idx| {
                    s.dom.node(idx).map(|node| {
                        ElementHandle::new(format!("{}:{idx}", s.generation), node.tag.as_str())
                    })
                })
                .collect()
        }))
    }

    async fn text(&self, element: &ElementHandle) -> StoreResult<String> {
        self.with_state(|s| {
            let idx = s.node_index(element)?;
            Ok(s.dom.text_content(idx))
        })
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> StoreResult<Option<String>> {
        self.with_state(|s| {
            let idx = s.node_index(element)?;
            Ok(s.dom.node(idx).and_then(|node| node.attrs.get(name).cloned()))
        })
    }

    async fn is_checked(&self, element: &ElementHandle) -> StoreResult<bool> {
        self.with_state(|s| {
            let idx = s.node_index(element)?;
            s.dom
                .node(idx)
                .and_then(|node| node.checked)
                .ok_or_else(|| StoreError::Driver {
                    message: format!("{} ({}) is not a checkbox", element.id, element.tag_name),
                })
        })
    }

    async fn click(&self, element: &ElementHandle, _timeout: Duration) -> StoreResult<()> {
        self.with_state(|s| {
            let idx = s.node_index(element)?;
            s.inject_click_fault(element)?;
            s.clicks += 1;
            if let Some(action) = s.dom.action_for(idx).cloned() {
                tracing::trace!(id = %element.id, ?action, "fake click");
                s.apply(action);
            }
            Ok(())
        })
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> StoreResult<()> {
        self.with_state(|s| s.node_index(element).map(|_| ()))
    }

    async fn close(&self) -> StoreResult<()> {
        self.with_state(|s| {
            s.closed = true;
            s.url = None;
            s.rerender();
        });
        Ok(())
    }
}

/// Opens a fresh [`FakeStorefront`] per scenario
#[derive(Debug, Default)]
pub struct FakeStoreFactory {
    zero_badge: Option<ZeroBadgePolicy>,
    faults: FaultPlan,
    last: Mutex<Option<Arc<FakeStorefront>>>,
}

impl FakeStoreFactory {
    /// Factory whose stores follow the suite's zero-badge policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the zero badge this way regardless of the suite configuration
    #[must_use]
    pub const fn with_zero_badge(mut self, policy: ZeroBadgePolicy) -> Self {
        self.zero_badge = Some(policy);
        self
    }

    /// Faults installed in every opened store
    #[must_use]
    pub const fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Most recently opened store
    #[must_use]
    pub fn last_opened(&self) -> Option<Arc<FakeStorefront>> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DriverFactory for FakeStoreFactory {
    async fn open(&self, config: &SuiteConfig) -> StoreResult<Arc<dyn StoreDriver>> {
        let store = Arc::new(
            FakeStorefront::new()
                .with_zero_badge(self.zero_badge.unwrap_or(config.zero_badge))
                .with_faults(self.faults),
        );
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&store));
        let driver: Arc<dyn StoreDriver> = store;
        Ok(driver)
    }
}
