//! `listharvest harvest <USER>...` — harvest one list view per user.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use listharvest_core::{persist, FileStore, MemoryStore, PersistSummary, RecordStore};
use serde::Serialize;
use tracing::{info, warn};

use super::output::{print_json, render_report, Output};
use super::spinner;
use crate::config::{resolve_data_dir, DriverConfig, HarvestConfig};
use crate::profiles::{ListStatus, Site};
use crate::progress;
use crate::renderer::chromium::{ChromiumOptions, ChromiumRenderer};
use crate::renderer::snapshot::SnapshotRenderer;
use crate::renderer::Renderer;
use crate::session::{run_sessions, Session, SessionReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct HarvestArgs {
    /// Usernames whose lists to harvest
    #[arg(required = true)]
    pub users: Vec<String>,
    /// Site preset
    #[arg(long, value_enum, default_value_t = Site::Anilist)]
    pub site: Site,
    /// List partition
    #[arg(long, value_enum, default_value_t = ListStatus::Completed)]
    pub status: ListStatus,
    /// Override the acquisition step budget
    #[arg(long)]
    pub max_steps: Option<u32>,
    /// Read a saved page instead of launching a browser
    #[arg(long, value_name = "FILE")]
    pub from_html: Option<PathBuf>,
    /// Keep results in memory only
    #[arg(long)]
    pub no_store: bool,
    /// Directory for titles, tags and the oldest marker
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
    /// Result format on stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Pretty)]
    pub format: ReportFormat,
}

/// One user's outcome as printed with `--format json`.
#[derive(Debug, Serialize)]
struct UserOutput<'a> {
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a SessionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stored: Option<&'a PersistSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Apply command-line overrides on top of the loaded config.
pub fn effective_config(mut config: HarvestConfig, args: &HarvestArgs) -> HarvestConfig {
    if args.from_html.is_some() {
        // Saved pages never change, so the settle pauses are pointless.
        config.driver = DriverConfig {
            max_steps: config.driver.max_steps,
            window: config.driver.window,
            ..DriverConfig::instant()
        };
    }
    if let Some(steps) = args.max_steps {
        config.driver.max_steps = steps;
    }
    if args.headful {
        config.headful = true;
    }
    if args.data_dir.is_some() {
        config.data_dir = args.data_dir.clone();
    }
    config
}

pub async fn run(args: HarvestArgs, config: HarvestConfig, out: Output) -> Result<()> {
    let config = effective_config(config, &args);
    let sessions = args
        .users
        .iter()
        .map(|user| Ok(Session::new(user.clone(), args.site.profile(args.status)?)))
        .collect::<Result<Vec<_>>>()?;

    let renderer: Box<dyn Renderer> = match &args.from_html {
        Some(path) => {
            info!(path = %path.display(), "harvesting from saved page");
            Box::new(SnapshotRenderer::from_file(path)?)
        }
        None => {
            let options = ChromiumOptions {
                headful: config.headful,
                user_agent: config.user_agent.clone(),
                ..ChromiumOptions::default()
            };
            Box::new(ChromiumRenderer::new(&options).await?)
        }
    };

    let (tx, rx) = progress::channel();
    let spin = out.chatty().then(|| spinner::spawn(rx));

    let results = run_sessions(renderer.as_ref(), &sessions, &config, Some(tx)).await;
    if let Some(handle) = spin {
        let _ = handle.await;
    }
    if let Err(e) = renderer.shutdown().await {
        warn!("renderer shutdown failed: {e:#}");
    }

    let mut store: Box<dyn RecordStore> = if args.no_store {
        Box::new(MemoryStore::default())
    } else {
        Box::new(FileStore::open(resolve_data_dir(config.data_dir.as_deref()))?)
    };

    let mut failures = 0usize;
    let mut rows = Vec::with_capacity(results.len());
    for (session, result) in sessions.iter().zip(&results) {
        match result {
            Ok(report) => {
                let summary = persist(store.as_mut(), &report.result)?;
                rows.push((session, Ok(report), Some(summary)));
            }
            Err(e) => {
                failures += 1;
                rows.push((session, Err(format!("{e:#}")), None));
            }
        }
    }

    if out.json || args.format == ReportFormat::Json {
        let items: Vec<UserOutput<'_>> = rows
            .iter()
            .map(|(session, result, summary)| UserOutput {
                username: &session.username,
                report: result.as_ref().ok().copied(),
                stored: summary.as_ref(),
                error: result.as_ref().err().cloned(),
            })
            .collect();
        print_json(&items);
    } else {
        for (session, result, summary) in &rows {
            match result {
                Ok(report) => print!("{}", render_report(report, summary.as_ref())),
                Err(message) => eprintln!("  {}: {message}", session.username),
            }
        }
    }

    if failures == sessions.len() {
        bail!("every session failed");
    }
    Ok(())
}
