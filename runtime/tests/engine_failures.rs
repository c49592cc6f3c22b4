//! Engine failures reach the caller instead of reading as empty pages.
//!
//! `FaultyContext` serves a saved document through `SnapshotContext` and
//! fails selected calls the way a crashed tab would.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use listharvest_core::{HarvestError, TerminationReason};
use listharvest_runtime::acquisition::{acquire, DomGrower, TargetSection};
use listharvest_runtime::config::DriverConfig;
use listharvest_runtime::extraction::{extract, DomWalkSource};
use listharvest_runtime::progress::Reporter;
use listharvest_runtime::renderer::snapshot::SnapshotContext;
use listharvest_runtime::renderer::{ElementHandle, NavigationResult, RenderContext};

const PAGE: &str = r#"
    <div class="list-wrap">
        <div class="entry row"><div class="title"><a>Mushishi</a></div></div>
        <div class="entry row"><div class="title"><a>Monster</a></div></div>
    </div>
"#;

#[derive(Default)]
struct Faults {
    query_within: bool,
    wait: bool,
}

struct FaultyContext {
    inner: SnapshotContext,
    faults: Faults,
    released: AtomicUsize,
}

impl FaultyContext {
    fn new(faults: Faults) -> Self {
        Self {
            inner: SnapshotContext::new(PAGE),
            faults,
            released: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RenderContext for FaultyContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        self.inner.navigate(url, timeout_ms).await
    }

    async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        if self.faults.wait {
            bail!("websocket connection closed");
        }
        self.inner.wait_for_element(selector, timeout_ms).await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        self.inner.query_all(selector).await
    }

    async fn query_within(
        &self,
        parent: ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>> {
        if self.faults.query_within {
            bail!("target crashed");
        }
        self.inner.query_within(parent, selector).await
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        self.inner.execute_js(script).await
    }

    async fn get_attribute(&self, element: ElementHandle, name: &str) -> Result<Option<String>> {
        self.inner.get_attribute(element, name).await
    }

    async fn get_text(&self, element: ElementHandle) -> Result<String> {
        self.inner.get_text(element).await
    }

    async fn is_visible(&self, element: ElementHandle) -> Result<bool> {
        self.inner.is_visible(element).await
    }

    async fn click(&self, element: ElementHandle) -> Result<()> {
        self.inner.click(element).await
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<()> {
        self.inner.scroll_into_view(element).await
    }

    async fn release_handles(&self) -> Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let this = *self;
        Box::new(this.inner).close().await
    }
}

fn section() -> TargetSection {
    TargetSection {
        container: "div.list-wrap".into(),
        heading: None,
        items: "div.entry.row".into(),
    }
}

fn dom_walk() -> DomWalkSource {
    DomWalkSource {
        section: section(),
        title: "div.title a".into(),
        tags: None,
        alt_title: None,
    }
}

#[tokio::test]
async fn failing_query_within_aborts_extraction() {
    let ctx = FaultyContext::new(Faults {
        query_within: true,
        ..Faults::default()
    });
    let err = extract(&ctx, &dom_walk()).await.unwrap_err();
    assert!(matches!(err, HarvestError::Engine(_)), "{err}");
    assert!(format!("{err:#}").contains("target crashed"));
}

#[tokio::test]
async fn healthy_context_extracts_both_entries() {
    let ctx = FaultyContext::new(Faults::default());
    let result = extract(&ctx, &dom_walk()).await.unwrap();
    assert_eq!(result.titles().collect::<Vec<_>>(), ["Mushishi", "Monster"]);
}

#[tokio::test]
async fn failing_count_is_an_engine_error_not_a_missing_section() {
    let ctx = FaultyContext::new(Faults {
        query_within: true,
        ..Faults::default()
    });
    let section = section();
    let config = DriverConfig::instant();
    let mut grower = DomGrower::new(&ctx, &section, None, &config);
    let err = acquire(&mut grower, &config, &mut Reporter::silent())
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::Engine(_)), "{err}");
}

#[tokio::test]
async fn wait_failure_other_than_timeout_is_an_engine_error() {
    let ctx = FaultyContext::new(Faults {
        wait: true,
        ..Faults::default()
    });
    let section = section();
    let config = DriverConfig::instant();
    let mut grower = DomGrower::new(&ctx, &section, None, &config);
    let err = acquire(&mut grower, &config, &mut Reporter::silent())
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::Engine(_)), "{err}");
    assert!(format!("{err:#}").contains("websocket connection closed"));
}

#[tokio::test]
async fn every_count_starts_from_released_handles() {
    let ctx = FaultyContext::new(Faults::default());
    let section = section();
    let config = DriverConfig::instant();
    let mut grower = DomGrower::new(&ctx, &section, None, &config);
    let outcome = acquire(&mut grower, &config, &mut Reporter::silent())
        .await
        .unwrap();
    assert_eq!(outcome.reason, TerminationReason::Stable);
    assert_eq!(outcome.final_count, 2);
    // Two steps plus the re-check, one release per count.
    assert_eq!(outcome.steps, 2);
    assert_eq!(ctx.released.load(Ordering::SeqCst), 3);
}
