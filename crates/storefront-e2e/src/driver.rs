//! StoreDriver - the browser boundary.
//!
//! Everything this crate knows about a page goes through this trait:
//! navigation, locating elements by [`Selector`], reading text, attributes
//! and checked state, clicking, scrolling. Handles are snapshots: once the
//! page re-renders, a handle may go stale and operations on it fail with
//! [`StoreError::StaleElement`](crate::StoreError::StaleElement).
//!
//! # Implementations
//!
//! - `ChromiumDriver` (feature `browser`) - real page over CDP
//! - [`FakeStorefront`](crate::mock::FakeStorefront) - in-memory storefront
//!   for tests

use crate::locator::Selector;
use crate::result::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Element handle for DOM interactions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-specific identifier; never reused for a different node
    pub id: String,
    /// Element tag name
    pub tag_name: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
        }
    }
}

/// Abstract driver for the page under test
#[async_trait]
pub trait StoreDriver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&self, url: &str) -> StoreResult<()>;

    /// Reload the current page
    async fn reload(&self) -> StoreResult<()>;

    /// Drop local and session storage for an origin
    async fn clear_storage(&self, origin: &str) -> StoreResult<()>;

    /// All elements matching the selector, in document order
    async fn find_all(&self, selector: &Selector) -> StoreResult<Vec<ElementHandle>>;

    /// Rendered text of the element and its descendants
    async fn text(&self, element: &ElementHandle) -> StoreResult<String>;

    /// Attribute value, if present
    async fn attribute(&self, element: &ElementHandle, name: &str) -> StoreResult<Option<String>>;

    /// Checked state of a checkbox
    async fn is_checked(&self, element: &ElementHandle) -> StoreResult<bool>;

    /// Click the element
    async fn click(&self, element: &ElementHandle, timeout: Duration) -> StoreResult<()>;

    /// Scroll the element into the viewport
    async fn scroll_into_view(&self, element: &ElementHandle) -> StoreResult<()>;

    /// Number of elements matching the selector
    async fn count(&self, selector: &Selector) -> StoreResult<usize> {
        Ok(self.find_all(selector).await?.len())
    }

    /// Release the page; handles are unusable afterwards
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}
