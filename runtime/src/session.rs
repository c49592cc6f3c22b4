//! Harvest sessions: one username, one list view, one page context.
//!
//! A session opens its own context, navigates to the list, drives the page
//! to a stable item count and extracts the entries. The whole run is bounded
//! by `session_timeout_secs`. Several sessions can run concurrently against
//! one renderer; they share nothing but the renderer itself.

use std::time::Duration;

use futures::future::join_all;
use listharvest_core::{
    AcquireOutcome, ExtractionResult, HarvestError, HarvestResult, TerminationReason,
};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::acquisition::{acquire, DomGrower};
use crate::config::HarvestConfig;
use crate::extraction::extract;
use crate::profiles::{ListStatus, Site, SiteProfile};
use crate::progress::{ProgressEventKind, ProgressSender, Reporter};
use crate::renderer::{RenderContext, Renderer};

/// A single harvest request.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub status: ListStatus,
    pub profile: SiteProfile,
}

impl Session {
    pub fn new(username: impl Into<String>, profile: SiteProfile) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            status: profile.status,
            profile,
        }
    }
}

/// Everything a finished session produced.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: String,
    pub username: String,
    pub site: Site,
    pub status: ListStatus,
    pub url: String,
    pub outcome: AcquireOutcome,
    pub result: ExtractionResult,
}

/// Run one session to completion or until the session timeout fires.
///
/// The context is closed on every path that managed to open one.
pub async fn run_session(
    renderer: &dyn Renderer,
    session: &Session,
    config: &HarvestConfig,
    progress: Option<ProgressSender>,
) -> HarvestResult<SessionReport> {
    let url = session.profile.list_url(&session.username)?;
    let secs = config.session_timeout_secs;
    let deadline = Instant::now() + Duration::from_secs(secs);
    let mut reporter = Reporter::new(progress, session.id.clone());

    let span = tracing::info_span!(
        "session",
        id = %session.id,
        user = %session.username,
        site = %session.profile.site,
    );

    async move {
        let mut ctx = match tokio::time::timeout_at(deadline, renderer.new_context()).await {
            Ok(ctx) => ctx?,
            Err(_) => return Err(timed_out(secs, &mut reporter)),
        };

        reporter.emit(ProgressEventKind::SessionStarted {
            username: session.username.clone(),
            url: url.to_string(),
        });
        info!(%url, "session started");

        let run = tokio::time::timeout_at(
            deadline,
            harvest(ctx.as_mut(), url.as_str(), session, config, &mut reporter),
        )
        .await;

        if let Err(e) = ctx.close().await {
            warn!("failed to close context: {e:#}");
        }

        let (outcome, result) = match run {
            Ok(harvested) => harvested?,
            Err(_) => return Err(timed_out(secs, &mut reporter)),
        };

        Ok(SessionReport {
            session_id: session.id.clone(),
            username: session.username.clone(),
            site: session.profile.site,
            status: session.status,
            url: url.to_string(),
            outcome,
            result,
        })
    }
    .instrument(span)
    .await
}

/// Run several sessions concurrently, one context each.
///
/// Results come back in the order of `sessions`.
pub async fn run_sessions(
    renderer: &dyn Renderer,
    sessions: &[Session],
    config: &HarvestConfig,
    progress: Option<ProgressSender>,
) -> Vec<HarvestResult<SessionReport>> {
    join_all(
        sessions
            .iter()
            .map(|s| run_session(renderer, s, config, progress.clone())),
    )
    .await
}

fn timed_out(secs: u64, reporter: &mut Reporter) -> HarvestError {
    warn!(secs, "session timed out");
    reporter.emit(ProgressEventKind::Warning {
        message: format!("session timed out after {secs}s"),
    });
    HarvestError::Timeout { secs }
}

async fn harvest(
    ctx: &mut dyn RenderContext,
    url: &str,
    session: &Session,
    config: &HarvestConfig,
    reporter: &mut Reporter,
) -> HarvestResult<(AcquireOutcome, ExtractionResult)> {
    let nav = ctx.navigate(url, config.navigation_timeout_ms).await?;
    debug!(final_url = %nav.final_url, load_time_ms = nav.load_time_ms, "navigated");

    let profile = &session.profile;
    let ctx: &dyn RenderContext = ctx;
    if let Some(selector) = &profile.consent {
        match dismiss_consent(ctx, selector).await {
            Ok(true) => {
                debug!("dismissed consent banner");
                config.driver.step_settle.wait().await;
            }
            Ok(false) => {}
            Err(e) => debug!("consent banner not dismissed: {e:#}"),
        }
    }

    let mut grower = DomGrower::new(
        ctx,
        &profile.target,
        profile.load_more.as_deref(),
        &config.driver,
    );
    let outcome = acquire(&mut grower, &config.driver, reporter).await?;
    if outcome.reason == TerminationReason::BudgetExhausted {
        let message = format!(
            "step budget ran out at {} items; the list may be incomplete",
            outcome.final_count
        );
        warn!("{message}");
        reporter.emit(ProgressEventKind::Warning { message });
    }

    ctx.release_handles().await?;
    let result = extract(ctx, profile.source.as_source()).await?;
    reporter.emit(ProgressEventKind::ExtractionFinished {
        records: result.count,
        dropped: result.dropped,
    });
    Ok((outcome, result))
}

async fn dismiss_consent(ctx: &dyn RenderContext, selector: &str) -> anyhow::Result<bool> {
    let Some(&button) = ctx.query_all(selector).await?.first() else {
        return Ok(false);
    };
    if !ctx.is_visible(button).await? {
        return Ok(false);
    }
    ctx.click(button).await?;
    Ok(true)
}
