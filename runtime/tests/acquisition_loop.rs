//! Acquisition loop against scripted pages.
//!
//! A `ScriptedPage` replays a fixed sequence of observations, one per
//! `observe` call, and repeats the last one once the script runs out.

use async_trait::async_trait;
use listharvest_core::{HarvestError, HarvestResult, Observation, TerminationReason};
use listharvest_runtime::acquisition::{acquire, GrowReport, PageGrower};
use listharvest_runtime::config::DriverConfig;
use listharvest_runtime::progress::{self, ProgressEventKind, Reporter};

struct ScriptedPage {
    script: Vec<Observation>,
    cursor: usize,
    grows: u32,
    /// Steps (1-based) on which the load-more control fails.
    failing_load_more: Vec<u32>,
    ready: bool,
}

impl ScriptedPage {
    fn counts(counts: &[usize]) -> Self {
        Self::new(counts.iter().map(|&c| Observation::Count(c)).collect())
    }

    fn new(script: Vec<Observation>) -> Self {
        Self {
            script,
            cursor: 0,
            grows: 0,
            failing_load_more: Vec::new(),
            ready: true,
        }
    }
}

#[async_trait]
impl PageGrower for ScriptedPage {
    async fn wait_ready(&mut self, _timeout_ms: u64) -> HarvestResult<()> {
        if self.ready {
            Ok(())
        } else {
            Err(HarvestError::section_not_found("div.list-wrap"))
        }
    }

    async fn grow(&mut self) -> HarvestResult<GrowReport> {
        self.grows += 1;
        if self.failing_load_more.contains(&self.grows) {
            return Ok(GrowReport {
                load_more_clicked: false,
                load_more_error: Some("element is detached".into()),
            });
        }
        Ok(GrowReport {
            load_more_clicked: true,
            load_more_error: None,
        })
    }

    async fn observe(&mut self) -> HarvestResult<Observation> {
        let obs = self
            .script
            .get(self.cursor)
            .or(self.script.last())
            .copied()
            .unwrap_or(Observation::SectionMissing);
        self.cursor += 1;
        Ok(obs)
    }
}

fn config(max_steps: u32) -> DriverConfig {
    DriverConfig {
        max_steps,
        ..DriverConfig::instant()
    }
}

#[tokio::test]
async fn constant_count_is_stable_within_three_steps() {
    let mut page = ScriptedPage::counts(&[5, 5, 5, 5]);
    let outcome = acquire(&mut page, &config(50), &mut Reporter::silent())
        .await
        .unwrap();
    assert_eq!(outcome.reason, TerminationReason::Stable);
    assert_eq!(outcome.final_count, 5);
    assert!(outcome.steps <= 3, "took {} steps", outcome.steps);
}

#[tokio::test]
async fn growing_page_exhausts_budget() {
    let counts: Vec<usize> = (1..=40).map(|i| i * 25).collect();
    let mut page = ScriptedPage::counts(&counts);
    let outcome = acquire(&mut page, &config(10), &mut Reporter::silent())
        .await
        .unwrap();
    assert_eq!(outcome.reason, TerminationReason::BudgetExhausted);
    assert_eq!(outcome.steps, 10);
    assert_eq!(outcome.final_count, 250);
    assert_eq!(page.grows, 10);
}

#[tokio::test]
async fn late_growth_during_confirmation_keeps_going() {
    // 10, 10 asks for a re-check; the re-check sees 20, so the loop continues
    // until 20 is confirmed.
    let mut page = ScriptedPage::counts(&[10, 10, 20, 20, 20]);
    let outcome = acquire(&mut page, &config(50), &mut Reporter::silent())
        .await
        .unwrap();
    assert_eq!(outcome.reason, TerminationReason::Stable);
    assert_eq!(outcome.final_count, 20);
    assert_eq!(outcome.steps, 3);
}

#[tokio::test]
async fn regressions_never_lower_the_count() {
    let mut page = ScriptedPage::counts(&[30, 12, 30, 30]);
    let outcome = acquire(&mut page, &config(50), &mut Reporter::silent())
        .await
        .unwrap();
    assert_eq!(outcome.final_count, 30);
    assert!(outcome.history.iter().all(|&c| c == 30));
}

#[tokio::test]
async fn page_that_shrinks_for_good_still_settles() {
    let mut page = ScriptedPage::counts(&[10, 4, 4, 4]);
    let outcome = acquire(&mut page, &config(50), &mut Reporter::silent())
        .await
        .unwrap();
    assert_eq!(outcome.reason, TerminationReason::Stable);
    assert_eq!(outcome.final_count, 10);
    assert_eq!(outcome.steps, 3);
    assert_eq!(page.grows, 3);
}

#[tokio::test]
async fn section_that_never_renders_runs_out_the_budget() {
    let mut page = ScriptedPage::new(vec![Observation::SectionMissing]);
    let outcome = acquire(&mut page, &config(6), &mut Reporter::silent())
        .await
        .unwrap();
    assert_eq!(outcome.reason, TerminationReason::BudgetExhausted);
    assert_eq!(outcome.steps, 6);
    assert_eq!(outcome.final_count, 0);
}

#[tokio::test]
async fn missing_root_aborts_before_any_step() {
    let mut page = ScriptedPage::counts(&[1]);
    page.ready = false;
    let err = acquire(&mut page, &config(6), &mut Reporter::silent())
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::SectionNotFound { .. }));
    assert_eq!(page.grows, 0);
}

#[tokio::test]
async fn load_more_failure_is_reported_and_the_loop_continues() {
    let mut page = ScriptedPage::counts(&[4, 8, 8, 8]);
    page.failing_load_more = vec![2];
    let (tx, mut rx) = progress::channel();
    let mut reporter = Reporter::new(Some(tx), "sess-1");

    let outcome = acquire(&mut page, &config(50), &mut reporter)
        .await
        .unwrap();
    drop(reporter);
    assert_eq!(outcome.reason, TerminationReason::Stable);
    assert_eq!(outcome.final_count, 8);

    let mut events = Vec::new();
    while let Ok(event) = rx.recv().await {
        assert_eq!(event.session_id, "sess-1");
        events.push(event.event);
    }
    assert!(events.contains(&ProgressEventKind::LoadMoreFailed {
        step: 2,
        message: "element is detached".into(),
    }));
    assert!(matches!(
        events.last(),
        Some(ProgressEventKind::AcquisitionFinished {
            reason: TerminationReason::Stable,
            final_count: 8,
            ..
        })
    ));
}
