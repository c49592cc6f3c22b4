//! Renderer abstraction for browser-based page automation.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over the
//! page engine. The acquisition driver and the extraction sources only ever
//! talk to a `RenderContext`; Chromium (via chromiumoxide) and static HTML
//! snapshots (via scraper) are interchangeable behind it.

pub mod chromium;
pub mod snapshot;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// [`RenderContext::wait_for_element`] ran out of time with no match.
///
/// Callers tell a missing element apart from an engine failure by
/// downcasting the returned `anyhow::Error` to this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {timeout_ms}ms waiting for `{selector}`")]
pub struct WaitTimeout {
    pub selector: String,
    pub timeout_ms: u64,
}

/// Opaque handle to an element inside one context.
///
/// Handles are only meaningful to the context that produced them and stay
/// valid until the context navigates, releases its handles or is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub usize);

/// A page engine that can create isolated contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single page context.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Wait until at least one element matches `selector`. A timeout is
    /// reported as [`WaitTimeout`]; any other error is an engine failure.
    async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> Result<()>;
    /// All elements in the document matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>>;
    /// Descendants of `parent` matching `selector`, in document order.
    async fn query_within(&self, parent: ElementHandle, selector: &str)
        -> Result<Vec<ElementHandle>>;
    /// Number of descendants of `parent` matching `selector`.
    async fn count_within(&self, parent: ElementHandle, selector: &str) -> Result<usize> {
        Ok(self.query_within(parent, selector).await?.len())
    }
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Attribute value, or `None` when the attribute is absent.
    async fn get_attribute(&self, element: ElementHandle, name: &str) -> Result<Option<String>>;
    /// Rendered text content of an element.
    async fn get_text(&self, element: ElementHandle) -> Result<String>;
    /// Whether the element currently takes up space on the page.
    async fn is_visible(&self, element: ElementHandle) -> Result<bool>;
    /// Click the element.
    async fn click(&self, element: ElementHandle) -> Result<()>;
    /// Scroll the element into the middle of the viewport.
    async fn scroll_into_view(&self, element: ElementHandle) -> Result<()>;
    /// Invalidate every handle handed out so far.
    async fn release_handles(&self) -> Result<()> {
        Ok(())
    }
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Script that scrolls to the bottom and nudges lazy loaders.
pub const SCROLL_TO_BOTTOM_JS: &str = r#"(() => {
    window.scrollTo(0, document.body.scrollHeight);
    window.dispatchEvent(new Event('scroll'));
    return document.body.scrollHeight;
})()"#;

/// A renderer used when Chromium is unavailable.
///
/// Every context request fails, so only offline snapshot runs work.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!(
            "browser not available; install Chromium or use --from-html"
        ))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}
