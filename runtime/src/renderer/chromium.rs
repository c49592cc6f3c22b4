//! Chromium-based renderer using chromiumoxide.

use super::{ElementHandle, NavigationResult, RenderContext, Renderer, WaitTimeout};
use crate::wait::{poll_until, Backoff};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Desktop user agents; one is picked per browser launch.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/91.0.864.48",
];

const VISIBLE_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }";

const SCROLL_INTO_VIEW_JS: &str =
    "function() { this.scrollIntoView({ behavior: 'smooth', block: 'center' }); return true; }";

/// chromiumoxide reports a selector without a match as `NotFound`; that is an
/// empty result. Every other error is passed on.
fn matched(
    found: std::result::Result<Vec<Element>, CdpError>,
    selector: &str,
) -> Result<Vec<Element>> {
    match found {
        Err(CdpError::NotFound) => Ok(Vec::new()),
        other => other.with_context(|| format!("query for `{selector}` failed")),
    }
}

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. LISTHARVEST_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("LISTHARVEST_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.listharvest/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".listharvest/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".listharvest/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".listharvest/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".listharvest/chromium/chrome-linux64/chrome"),
                home.join(".listharvest/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launch options for [`ChromiumRenderer`].
#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    /// Show the browser window instead of running headless.
    pub headful: bool,
    /// Fixed user agent; a random entry of [`USER_AGENTS`] when `None`.
    pub user_agent: Option<String>,
    pub window: (u32, u32),
}

impl Default for ChromiumOptions {
    fn default() -> Self {
        Self {
            headful: false,
            user_agent: None,
            window: (1920, 1080),
        }
    }
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Browser,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance.
    pub async fn new(options: &ChromiumOptions) -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Set LISTHARVEST_CHROMIUM_PATH or install Chrome.")?;

        let user_agent = options.user_agent.clone().unwrap_or_else(|| {
            USER_AGENTS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(USER_AGENTS[0])
                .to_string()
        });
        tracing::debug!(%user_agent, "launching Chromium");

        let (width, height) = options.window;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(width, height)
            .arg(format!("--user-agent={user_agent}"))
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if options.headful {
            builder = builder.with_head();
        } else {
            builder = builder.arg("--headless=new");
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            elements: Mutex::new(Vec::new()),
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        // Browser is dropped when ChromiumRenderer is dropped
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
///
/// Elements handed out as [`ElementHandle`]s live in an arena owned by the
/// context; a handle is an index into it. The arena is emptied on navigation
/// and by [`RenderContext::release_handles`].
pub struct ChromiumContext {
    page: Page,
    elements: Mutex<Vec<Element>>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    async fn register(&self, found: Vec<Element>) -> Vec<ElementHandle> {
        let mut arena = self.elements.lock().await;
        let start = arena.len();
        arena.extend(found);
        (start..arena.len()).map(ElementHandle).collect()
    }

    async fn call_on(&self, element: ElementHandle, function: &str) -> Result<serde_json::Value> {
        let arena = self.elements.lock().await;
        let el = arena
            .get(element.0)
            .with_context(|| format!("stale element handle {}", element.0))?;
        let returns = el
            .call_js_fn(function, false)
            .await
            .context("element function call failed")?;
        Ok(returns.result.value.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result =
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url)).await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_response)) => {
                // Wait for page to be loaded
                let _ = self.page.wait_for_navigation().await;
                // Handles from the previous document are dead now.
                self.elements.lock().await.clear();

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let page = &self.page;
        // `Some(Err(..))` ends the wait early on an engine failure.
        let found = poll_until(
            || async move {
                match matched(page.find_elements(selector).await, selector) {
                    Ok(els) if els.is_empty() => None,
                    Ok(_) => Some(Ok(())),
                    Err(e) => Some(Err(e)),
                }
            },
            Duration::from_millis(timeout_ms),
            Backoff::default(),
        )
        .await;
        match found {
            Some(result) => result,
            None => Err(WaitTimeout {
                selector: selector.to_string(),
                timeout_ms,
            }
            .into()),
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let found = matched(self.page.find_elements(selector).await, selector)?;
        Ok(self.register(found).await)
    }

    async fn query_within(
        &self,
        parent: ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>> {
        let found = {
            let arena = self.elements.lock().await;
            let el = arena
                .get(parent.0)
                .with_context(|| format!("stale element handle {}", parent.0))?;
            matched(el.find_elements(selector).await, selector)?
        };
        Ok(self.register(found).await)
    }

    async fn count_within(&self, parent: ElementHandle, selector: &str) -> Result<usize> {
        // Counted every step, so skip the arena.
        let arena = self.elements.lock().await;
        let el = arena
            .get(parent.0)
            .with_context(|| format!("stale element handle {}", parent.0))?;
        Ok(matched(el.find_elements(selector).await, selector)?.len())
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn get_attribute(&self, element: ElementHandle, name: &str) -> Result<Option<String>> {
        let arena = self.elements.lock().await;
        let el = arena
            .get(element.0)
            .with_context(|| format!("stale element handle {}", element.0))?;
        el.attribute(name)
            .await
            .with_context(|| format!("failed to read attribute `{name}`"))
    }

    async fn get_text(&self, element: ElementHandle) -> Result<String> {
        let arena = self.elements.lock().await;
        let el = arena
            .get(element.0)
            .with_context(|| format!("stale element handle {}", element.0))?;
        let text = el.inner_text().await.context("failed to read text")?;
        Ok(text.unwrap_or_default())
    }

    async fn is_visible(&self, element: ElementHandle) -> Result<bool> {
        let value = self.call_on(element, VISIBLE_JS).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: ElementHandle) -> Result<()> {
        let arena = self.elements.lock().await;
        let el = arena
            .get(element.0)
            .with_context(|| format!("stale element handle {}", element.0))?;
        el.click().await.context("click failed")?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<()> {
        self.call_on(element, SCROLL_INTO_VIEW_JS).await?;
        Ok(())
    }

    async fn release_handles(&self) -> Result<()> {
        let mut arena = self.elements.lock().await;
        tracing::trace!(released = arena.len(), "releasing element handles");
        arena.clear();
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_found_reads_as_empty() {
        assert!(matched(Err(CdpError::NotFound), "div.entry").unwrap().is_empty());

        let err = matched(Err(CdpError::NoResponse), "div.entry").unwrap_err();
        assert!(err.to_string().contains("`div.entry`"));
        assert!(err.downcast_ref::<CdpError>().is_some());
    }

    #[test]
    fn user_agents_are_desktop() {
        assert!(USER_AGENTS.iter().all(|ua| ua.starts_with("Mozilla/5.0")));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_query_and_read() {
        let renderer = ChromiumRenderer::new(&ChromiumOptions::default())
            .await
            .expect("failed to create renderer");
        let mut ctx = renderer
            .new_context()
            .await
            .expect("failed to create context");

        ctx.navigate(
            "data:text/html,<div class='list-wrap'><h3 class='section-name'> Completed </h3>\
             <table data-items='[]'></table></div>",
            10000,
        )
        .await
        .expect("navigation failed");

        ctx.wait_for_element("div.list-wrap", 5000)
            .await
            .expect("wait failed");
        let wraps = ctx.query_all("div.list-wrap").await.unwrap();
        assert_eq!(wraps.len(), 1);
        let heading = ctx.query_within(wraps[0], "h3.section-name").await.unwrap();
        assert_eq!(ctx.get_text(heading[0]).await.unwrap().trim(), "Completed");
        let table = ctx.query_all("table[data-items]").await.unwrap();
        assert_eq!(
            ctx.get_attribute(table[0], "data-items").await.unwrap().as_deref(),
            Some("[]")
        );
        assert!(ctx.query_all("button.load-more").await.unwrap().is_empty());
        assert_eq!(ctx.count_within(wraps[0], "li").await.unwrap(), 0);

        let err = ctx.wait_for_element("div.never", 200).await.unwrap_err();
        assert!(err.downcast_ref::<WaitTimeout>().is_some());

        ctx.release_handles().await.unwrap();
        assert!(ctx.get_text(heading[0]).await.is_err());

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);
    }
}
