//! The acquisition loop: grow the page until its item count settles.
//!
//! Each step scrolls (and clicks load-more when offered), waits, then counts
//! the items in the target section. Decisions come from
//! [`StabilityTracker`]; the page itself is only reached through the
//! [`PageGrower`] trait so the loop can run against simulated pages.

use std::time::Instant;

use async_trait::async_trait;
use listharvest_core::{
    AcquireOutcome, HarvestError, HarvestResult, Observation, StabilityTracker, StepDecision,
};
use tracing::{debug, info, warn};

use super::section::TargetSection;
use crate::config::DriverConfig;
use crate::progress::{ProgressEventKind, Reporter};
use crate::renderer::{RenderContext, WaitTimeout, SCROLL_TO_BOTTOM_JS};

/// What one growth action did besides scrolling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrowReport {
    pub load_more_clicked: bool,
    /// Set when the load-more control was present but could not be used.
    pub load_more_error: Option<String>,
}

/// The side-effecting half of acquisition.
#[async_trait]
pub trait PageGrower: Send {
    /// Wait for the page's root container. Failing here ends the session.
    async fn wait_ready(&mut self, timeout_ms: u64) -> HarvestResult<()>;
    /// Ask the page for more content and let it settle.
    async fn grow(&mut self) -> HarvestResult<GrowReport>;
    /// Count the items currently in the target section.
    async fn observe(&mut self) -> HarvestResult<Observation>;
}

/// Run the acquisition loop to a terminal state.
pub async fn acquire<G>(
    grower: &mut G,
    config: &DriverConfig,
    reporter: &mut Reporter,
) -> HarvestResult<AcquireOutcome>
where
    G: PageGrower + ?Sized,
{
    grower.wait_ready(config.initial_wait_ms).await?;

    let started = Instant::now();
    let mut tracker = StabilityTracker::new(config.max_steps, config.window);

    let decision = loop {
        let step = tracker.steps() + 1;

        let report = grower.grow().await?;
        if let Some(message) = report.load_more_error {
            warn!(step, "couldn't use load-more control: {message}");
            reporter.emit(ProgressEventKind::LoadMoreFailed { step, message });
        }

        let observation = grower.observe().await?;
        note(&tracker, step, observation, reporter);

        let decision = match tracker.observe(observation) {
            StepDecision::Confirm => {
                let count = tracker
                    .last_observed()
                    .unwrap_or_else(|| tracker.load().count());
                debug!(step, count, "count unchanged, re-checking after a longer wait");
                reporter.emit(ProgressEventKind::ConfirmRequested { step, count });
                config.confirm_settle.wait().await;
                let recheck = grower.observe().await?;
                note(&tracker, step, recheck, reporter);
                tracker.confirm(recheck)
            }
            other => other,
        };

        if let StepDecision::Stop(reason) = decision {
            break reason;
        }
    };

    let outcome = tracker.outcome().ok_or_else(|| {
        HarvestError::Engine(anyhow::anyhow!(
            "acquisition stopped ({decision}) without a terminal state"
        ))
    })?;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        reason = %outcome.reason,
        final_count = outcome.final_count,
        steps = outcome.steps,
        elapsed_ms,
        "acquisition finished"
    );
    reporter.emit(ProgressEventKind::AcquisitionFinished {
        reason: outcome.reason,
        final_count: outcome.final_count,
        steps: outcome.steps,
        elapsed_ms,
    });
    Ok(outcome)
}

fn note(tracker: &StabilityTracker, step: u32, observation: Observation, reporter: &mut Reporter) {
    match observation {
        Observation::SectionMissing => {
            debug!(step, "target section not rendered yet");
            reporter.emit(ProgressEventKind::SectionMissing { step });
        }
        Observation::Count(count) => {
            let recorded = tracker.load().count();
            if count < recorded {
                warn!(step, count, recorded, "item count went backwards, keeping recorded count");
            } else {
                debug!(step, count, "items in section");
            }
            reporter.emit(ProgressEventKind::StepObserved { step, count });
        }
    }
}

/// [`PageGrower`] over a live [`RenderContext`].
pub struct DomGrower<'a> {
    ctx: &'a dyn RenderContext,
    section: &'a TargetSection,
    load_more: Option<&'a str>,
    config: &'a DriverConfig,
}

impl<'a> DomGrower<'a> {
    pub fn new(
        ctx: &'a dyn RenderContext,
        section: &'a TargetSection,
        load_more: Option<&'a str>,
        config: &'a DriverConfig,
    ) -> Self {
        Self {
            ctx,
            section,
            load_more,
            config,
        }
    }

    /// Click the first load-more control if it is visible. `Ok(false)` when
    /// there is nothing to click.
    async fn click_load_more(&self, selector: &str) -> anyhow::Result<bool> {
        let Some(&button) = self.ctx.query_all(selector).await?.first() else {
            return Ok(false);
        };
        if !self.ctx.is_visible(button).await? {
            return Ok(false);
        }
        self.ctx.click(button).await?;
        Ok(true)
    }
}

#[async_trait]
impl PageGrower for DomGrower<'_> {
    async fn wait_ready(&mut self, timeout_ms: u64) -> HarvestResult<()> {
        self.ctx
            .wait_for_element(&self.section.container, timeout_ms)
            .await
            .map_err(|e| {
                if e.downcast_ref::<WaitTimeout>().is_some() {
                    warn!("root container never appeared: {e:#}");
                    HarvestError::section_not_found(&self.section.container)
                } else {
                    HarvestError::Engine(e.context("waiting for the list container"))
                }
            })
    }

    async fn grow(&mut self) -> HarvestResult<GrowReport> {
        self.ctx.execute_js(SCROLL_TO_BOTTOM_JS).await?;
        self.config.step_settle.wait().await;

        let mut report = GrowReport::default();
        if let Some(selector) = self.load_more {
            match self.click_load_more(selector).await {
                Ok(clicked) => {
                    report.load_more_clicked = clicked;
                    if clicked {
                        self.config.load_more_settle.wait().await;
                    }
                }
                Err(e) => report.load_more_error = Some(format!("{e:#}")),
            }
        }
        Ok(report)
    }

    async fn observe(&mut self) -> HarvestResult<Observation> {
        // Nothing located by earlier steps is reused.
        self.ctx.release_handles().await?;
        let Some(section) = self.section.locate(self.ctx).await? else {
            self.config.missing_settle.wait().await;
            return Ok(Observation::SectionMissing);
        };
        if let Err(e) = self.ctx.scroll_into_view(section).await {
            debug!("scroll into view failed: {e:#}");
        }
        self.config.section_settle.wait().await;
        let count = self.ctx.count_within(section, &self.section.items).await?;
        Ok(Observation::Count(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::section::HeadingMatch;
    use crate::renderer::snapshot::SnapshotContext;
    use listharvest_core::TerminationReason;

    fn section() -> TargetSection {
        TargetSection {
            container: "div.list-wrap".into(),
            heading: Some(HeadingMatch {
                selector: "h3.section-name".into(),
                label: "Completed".into(),
            }),
            items: "div.entry.row".into(),
        }
    }

    #[tokio::test]
    async fn snapshot_page_settles_immediately() {
        let ctx = SnapshotContext::new(
            r#"<div class="list-wrap"><h3 class="section-name">Completed</h3>
               <div class="entry row"></div><div class="entry row"></div>
               <div class="entry row"></div></div>
               <button class="load-more">More</button>"#,
        );
        let section = section();
        let config = DriverConfig::instant();
        let mut grower = DomGrower::new(&ctx, &section, Some("button.load-more"), &config);

        assert_eq!(
            grower.grow().await.unwrap(),
            GrowReport {
                load_more_clicked: true,
                load_more_error: None
            }
        );

        let outcome = acquire(&mut grower, &config, &mut Reporter::silent())
            .await
            .unwrap();
        assert_eq!(outcome.reason, TerminationReason::Stable);
        assert_eq!(outcome.final_count, 3);
        assert_eq!(outcome.steps, 2);
    }

    #[tokio::test]
    async fn missing_root_is_section_not_found() {
        let ctx = SnapshotContext::new("<p>private list</p>");
        let section = section();
        let config = DriverConfig::instant();
        let mut grower = DomGrower::new(&ctx, &section, None, &config);
        let err = acquire(&mut grower, &config, &mut Reporter::silent())
            .await
            .unwrap_err();
        assert!(
            matches!(err, HarvestError::SectionNotFound { ref selector } if selector == "div.list-wrap")
        );
    }

    #[tokio::test]
    async fn unlabelled_sections_run_out_the_budget() {
        let ctx = SnapshotContext::new(
            r#"<div class="list-wrap"><h3 class="section-name">Watching</h3></div>"#,
        );
        let section = section();
        let config = DriverConfig {
            max_steps: 4,
            ..DriverConfig::instant()
        };
        let mut grower = DomGrower::new(&ctx, &section, None, &config);
        let outcome = acquire(&mut grower, &config, &mut Reporter::silent())
            .await
            .unwrap();
        assert_eq!(outcome.reason, TerminationReason::BudgetExhausted);
        assert_eq!(outcome.steps, 4);
        assert_eq!(outcome.final_count, 0);
    }
}
