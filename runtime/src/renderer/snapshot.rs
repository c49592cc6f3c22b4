//! Static HTML renderer backed by the `scraper` crate.
//!
//! Serves one fixed document to every context. Scripts evaluate to `null`,
//! and clicks and scrolls are accepted but change nothing, so acquisition
//! against a snapshot settles on the first repeated count. Used for offline
//! extraction of saved pages.

use super::{ElementHandle, NavigationResult, RenderContext, Renderer, WaitTimeout};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Renderer that hands out contexts over a saved HTML document.
pub struct SnapshotRenderer {
    html: Arc<String>,
    active_count: Arc<AtomicUsize>,
}

impl SnapshotRenderer {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: Arc::new(html.into()),
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Load the document from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        Ok(Self::new(html))
    }
}

#[async_trait]
impl Renderer for SnapshotRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(SnapshotContext {
            html: Arc::clone(&self.html),
            url: String::from("about:blank"),
            active_count: Some(Arc::clone(&self.active_count)),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A context over a fixed document.
///
/// The document is re-parsed per call; an [`ElementHandle`] is the node's
/// position in the parsed tree, which is the same on every parse.
pub struct SnapshotContext {
    html: Arc<String>,
    url: String,
    active_count: Option<Arc<AtomicUsize>>,
}

impl SnapshotContext {
    /// A standalone context, not tied to a renderer.
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: Arc::new(html.into()),
            url: String::from("about:blank"),
            active_count: None,
        }
    }

    fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector `{css}`: {e:?}"))
}

fn handle_of(doc: &Html, el: &ElementRef<'_>) -> Option<ElementHandle> {
    let id = el.id();
    doc.tree.nodes().position(|n| n.id() == id).map(ElementHandle)
}

fn resolve(doc: &Html, handle: ElementHandle) -> Result<ElementRef<'_>> {
    doc.tree
        .nodes()
        .nth(handle.0)
        .and_then(ElementRef::wrap)
        .with_context(|| format!("stale element handle {}", handle.0))
}

fn handles<'a>(doc: &Html, found: impl Iterator<Item = ElementRef<'a>>) -> Vec<ElementHandle> {
    found.filter_map(|el| handle_of(doc, &el)).collect()
}

#[async_trait]
impl RenderContext for SnapshotContext {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        self.url = url.to_string();
        Ok(NavigationResult {
            final_url: self.url.clone(),
            load_time_ms: 0,
        })
    }

    async fn wait_for_element(&self, css: &str, timeout_ms: u64) -> Result<()> {
        let sel = selector(css)?;
        if self.parse().select(&sel).next().is_none() {
            return Err(WaitTimeout {
                selector: css.to_string(),
                timeout_ms,
            }
            .into());
        }
        Ok(())
    }

    async fn query_all(&self, css: &str) -> Result<Vec<ElementHandle>> {
        let sel = selector(css)?;
        let doc = self.parse();
        Ok(handles(&doc, doc.select(&sel)))
    }

    async fn query_within(&self, parent: ElementHandle, css: &str) -> Result<Vec<ElementHandle>> {
        let sel = selector(css)?;
        let doc = self.parse();
        let parent = resolve(&doc, parent)?;
        Ok(handles(&doc, parent.select(&sel)))
    }

    async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn get_attribute(&self, element: ElementHandle, name: &str) -> Result<Option<String>> {
        let doc = self.parse();
        let el = resolve(&doc, element)?;
        Ok(el.value().attr(name).map(String::from))
    }

    async fn get_text(&self, element: ElementHandle) -> Result<String> {
        let doc = self.parse();
        let el = resolve(&doc, element)?;
        Ok(el.text().collect())
    }

    async fn is_visible(&self, element: ElementHandle) -> Result<bool> {
        let doc = self.parse();
        let el = resolve(&doc, element)?;
        let hidden_attr = el.value().attr("hidden").is_some();
        let hidden_style = el
            .value()
            .attr("style")
            .map(|s| s.replace(' ', "").contains("display:none"))
            .unwrap_or(false);
        Ok(!hidden_attr && !hidden_style)
    }

    async fn click(&self, element: ElementHandle) -> Result<()> {
        resolve(&self.parse(), element)?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<()> {
        resolve(&self.parse(), element)?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        if let Some(count) = &self.active_count {
            count.fetch_sub(1, Ordering::Relaxed);
        }
        Ok(())
    }
}
