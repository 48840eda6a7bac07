//! Chromium driver over the DevTools protocol.
//!
//! Selectors are shipped to the page as JSON and evaluated by a small
//! in-page matcher. Every matched node is tagged with a `data-sf-id`
//! attribute the first time it matches; handles carry that id. A node the
//! framework re-creates comes back without the tag, so an old handle fails
//! the lookup and surfaces as [`StoreError::StaleElement`].
//!
//! Clicks are real mouse events at the element's centre, preceded by an
//! in-page hit test so an overlay shows up as [`StoreError::Intercepted`]
//! instead of a silent misclick.

use crate::config::{BrowserOptions, SuiteConfig};
use crate::driver::{ElementHandle, StoreDriver};
use crate::locator::Selector;
use crate::result::{StoreError, StoreResult};
use crate::scenario::DriverFactory;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::storage::ClearDataForOriginParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const HANDLE_ATTR: &str = "data-sf-id";

const STORAGE_TYPES: &str = "local_storage,indexeddb,cache_storage";

const MATCHER_JS: &str = r#"
const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
const textOk = (m, raw) => {
  const t = norm(raw);
  switch (m.mode) {
    case 'exact': return t === norm(m.value);
    case 'contains': return t.includes(norm(m.value));
    case 'pattern':
      try { return new RegExp(m.value.pattern, m.value.ignore_case ? 'i' : '').test(t); }
      catch (e) { return false; }
  }
  return false;
};
const ownText = (el) => Array.from(el.childNodes)
  .filter((n) => n.nodeType === Node.TEXT_NODE)
  .map((n) => n.textContent)
  .join(' ');
const roleOf = (el) => {
  const explicit = el.getAttribute('role');
  if (explicit) return explicit;
  const tag = el.tagName.toLowerCase();
  if (tag === 'button') return 'button';
  if (tag === 'img') return 'img';
  if (tag === 'input' && (el.getAttribute('type') || '').toLowerCase() === 'checkbox') return 'checkbox';
  return null;
};
const accName = (el) => el.getAttribute('aria-label') || el.textContent;
const matches = (el, s) => {
  const a = s.arg;
  switch (s.kind) {
    case 'tag': return el.tagName.toLowerCase() === a;
    case 'attr': return el.getAttribute(a.name) === a.value;
    case 'attr_present': return el.hasAttribute(a);
    case 'role': return roleOf(el) === a.role && (!a.name || textOk(a.name, accName(el)));
    case 'text': { const t = ownText(el); return norm(t) !== '' && textOk(a, t); }
    case 'all': return a.every((part) => matches(el, part));
    case 'has': return matches(el, a.base)
      && Array.from(el.querySelectorAll('*')).some((d) => matches(d, a.descendant));
    case 'has_child': return matches(el, a.base)
      && Array.from(el.children).some((c) => matches(c, a.child));
    case 'within': {
      if (!matches(el, a.inner)) return false;
      for (let p = el.parentElement; p; p = p.parentElement) {
        if (matches(p, a.ancestor)) return true;
      }
      return false;
    }
  }
  return false;
};
"#;

#[derive(Debug, Deserialize)]
struct Found {
    id: String,
    tag: String,
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

fn js_string(value: &str) -> StoreResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn find_script(selector: &Selector) -> StoreResult<String> {
    let spec = serde_json::to_string(selector)?;
    Ok(format!(
        r#"(() => {{
{MATCHER_JS}
const spec = {spec};
window.__sfNext = window.__sfNext || 0;
const out = [];
for (const el of document.querySelectorAll('*')) {{
  if (!matches(el, spec)) continue;
  let id = el.getAttribute('{HANDLE_ATTR}');
  if (!id) {{
    window.__sfNext += 1;
    id = 'sf-' + window.__sfNext;
    el.setAttribute('{HANDLE_ATTR}', id);
  }}
  out.push({{ id, tag: el.tagName.toLowerCase() }});
}}
return JSON.stringify(out);
}})()"#
    ))
}

/// Wrap `body` so it runs with `el` bound to the handle's node
fn on_element(element: &ElementHandle, body: &str) -> StoreResult<String> {
    let id = js_string(&element.id)?;
    Ok(format!(
        r#"(() => {{
const id = {id};
const el = document.querySelector('[{HANDLE_ATTR}="' + id + '"]');
if (!el || !el.isConnected) throw new Error('Element is not attached to the DOM: ' + id);
{body}
}})()"#
    ))
}

const CLICK_POINT_JS: &str = r#"
el.scrollIntoView({ block: 'center', inline: 'center' });
const r = el.getBoundingClientRect();
if (r.width === 0 || r.height === 0) throw new Error('Element is not visible: ' + id);
const x = r.left + r.width / 2;
const y = r.top + r.height / 2;
const hit = document.elementFromPoint(x, y);
if (hit && hit !== el && !el.contains(hit) && !hit.contains(el)) {
  throw new Error('<' + hit.tagName.toLowerCase() + '> intercepts pointer events for ' + id);
}
return JSON.stringify({ x, y });
"#;

/// A single page driven over CDP
#[derive(Debug, Clone)]
pub struct ChromiumDriver {
    page: CdpPage,
}

impl ChromiumDriver {
    /// Drive an already-open page
    #[must_use]
    pub const fn new(page: CdpPage) -> Self {
        Self { page }
    }

    async fn eval<T: DeserializeOwned>(&self, target: &str, script: String) -> StoreResult<T> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|message| StoreError::Driver { message })?;
        let json: String = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| StoreError::from_driver_message(target, e.to_string()))?
            .into_value()?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn mouse(&self, target: &str, kind: DispatchMouseEventType, at: &Point) -> StoreResult<()> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(at.x)
            .y(at.y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(|message| StoreError::Driver { message })?;
        self.page
            .execute(params)
            .await
            .map_err(|e| StoreError::from_driver_message(target, e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StoreDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> StoreResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| StoreError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn reload(&self) -> StoreResult<()> {
        self.page
            .reload()
            .await
            .map_err(|e| StoreError::Navigation {
                url: "(reload)".to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn clear_storage(&self, origin: &str) -> StoreResult<()> {
        self.page
            .execute(ClearDataForOriginParams::new(origin, STORAGE_TYPES))
            .await
            .map_err(|e| StoreError::Driver {
                message: format!("clearing storage for {origin}: {e}"),
            })?;
        // session storage is per tab; only reachable from a page on the origin
        let origin_js = js_string(origin)?;
        let script = format!(
            "(() => {{ try {{ if (location.origin === {origin_js}) sessionStorage.clear(); }} catch (e) {{}} return 'true'; }})()"
        );
        let _: bool = self.eval(origin, script).await?;
        Ok(())
    }

    async fn find_all(&self, selector: &Selector) -> StoreResult<Vec<ElementHandle>> {
        let found: Vec<Found> = self
            .eval(&selector.to_string(), find_script(selector)?)
            .await?;
        Ok(found
            .into_iter()
            .map(|f| ElementHandle::new(f.id, f.tag))
            .collect())
    }

    async fn text(&self, element: &ElementHandle) -> StoreResult<String> {
        let script = on_element(
            element,
            "return JSON.stringify(el.innerText ?? el.textContent ?? '');",
        )?;
        self.eval(&element.id, script).await
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> StoreResult<Option<String>> {
        let body = format!("return JSON.stringify(el.getAttribute({}));", js_string(name)?);
        self.eval(&element.id, on_element(element, &body)?).await
    }

    async fn is_checked(&self, element: &ElementHandle) -> StoreResult<bool> {
        let script = on_element(
            element,
            "if (!('checked' in el)) throw new Error('not a checkbox: ' + id);\nreturn JSON.stringify(el.checked === true);",
        )?;
        self.eval(&element.id, script).await
    }

    async fn click(&self, element: &ElementHandle, timeout: Duration) -> StoreResult<()> {
        let started = Instant::now();
        let attempt = async {
            let at: Point = self
                .eval(&element.id, on_element(element, CLICK_POINT_JS)?)
                .await?;
            self.mouse(&element.id, DispatchMouseEventType::MouseMoved, &at)
                .await?;
            self.mouse(&element.id, DispatchMouseEventType::MousePressed, &at)
                .await?;
            self.mouse(&element.id, DispatchMouseEventType::MouseReleased, &at)
                .await
        };
        tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| StoreError::Timeout {
                what: format!("click on {}", element.id),
                last_observed: "no response from page".to_string(),
                elapsed: started.elapsed(),
            })?
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> StoreResult<()> {
        let script = on_element(
            element,
            "el.scrollIntoView({ block: 'center', inline: 'center' });\nreturn 'true';",
        )?;
        let _: bool = self.eval(&element.id, script).await?;
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| StoreError::Driver {
                message: format!("closing page: {e}"),
            })
    }
}

struct Launched {
    browser: CdpBrowser,
    handle: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for Launched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launched")
            .field("finished", &self.handle.is_finished())
            .finish_non_exhaustive()
    }
}

async fn launch(options: &BrowserOptions) -> StoreResult<Launched> {
    let mut builder = CdpConfig::builder().window_size(options.viewport_width, options.viewport_height);

    if !options.headless {
        builder = builder.with_head();
    }

    if !options.sandbox {
        builder = builder.no_sandbox();
    }

    if let Some(ref path) = options.chromium_path {
        builder = builder.chrome_executable(path);
    }

    let cdp_config = builder
        .build()
        .map_err(|message| StoreError::BrowserLaunch { message })?;

    let (browser, mut handler) =
        CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| StoreError::BrowserLaunch {
                message: e.to_string(),
            })?;

    let handle = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    tracing::info!(headless = options.headless, "chromium launched");
    Ok(Launched { browser, handle })
}

/// Launches Chromium once and hands out a fresh page per scenario
#[derive(Debug, Default)]
pub struct ChromiumFactory {
    inner: Mutex<Option<Launched>>,
}

impl ChromiumFactory {
    /// Factory that launches lazily on the first `open`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the browser if it was launched
    pub async fn close(&self) -> StoreResult<()> {
        let launched = self.inner.lock().await.take();
        if let Some(mut launched) = launched {
            let closed = launched.browser.close().await;
            launched.handle.abort();
            closed.map_err(|e| StoreError::Driver {
                message: format!("closing browser: {e}"),
            })?;
            tracing::info!("chromium closed");
        }
        Ok(())
    }
}

#[async_trait]
impl DriverFactory for ChromiumFactory {
    async fn open(&self, config: &SuiteConfig) -> StoreResult<Arc<dyn StoreDriver>> {
        let mut guard = self.inner.lock().await;
        if guard.is_none() {
            *guard = Some(launch(&config.browser).await?);
        }
        let launched = guard.as_ref().ok_or_else(|| StoreError::BrowserLaunch {
            message: "browser not running".to_string(),
        })?;
        let page = launched
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| StoreError::BrowserLaunch {
                message: e.to_string(),
            })?;
        let driver: Arc<dyn StoreDriver> = Arc::new(ChromiumDriver::new(page));
        Ok(driver)
    }
}
