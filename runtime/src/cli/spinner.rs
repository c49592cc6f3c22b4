//! Terminal spinner fed by progress events.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::progress::{ProgressEventKind, ProgressReceiver};

/// One-line status text for an event, or `None` to leave the line alone.
pub fn describe(event: &ProgressEventKind) -> Option<String> {
    Some(match event {
        ProgressEventKind::SessionStarted { username, .. } => format!("{username}: loading list"),
        ProgressEventKind::StepObserved { step, count } => format!("step {step}: {count} items"),
        ProgressEventKind::SectionMissing { step } => {
            format!("step {step}: waiting for the list section")
        }
        ProgressEventKind::ConfirmRequested { count, .. } => {
            format!("{count} items, confirming the count")
        }
        ProgressEventKind::AcquisitionFinished {
            reason,
            final_count,
            ..
        } => format!("{reason} at {final_count} items, extracting"),
        ProgressEventKind::ExtractionFinished { records, .. } => format!("{records} records"),
        ProgressEventKind::LoadMoreFailed { .. } | ProgressEventKind::Warning { .. } => {
            return None
        }
    })
}

/// Drive a spinner until the channel closes.
pub fn spawn(mut rx: ProgressReceiver) -> JoinHandle<()> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("  {spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar.set_message("starting");

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match &event.event {
                    ProgressEventKind::Warning { message } => bar.println(format!("  ! {message}")),
                    other => {
                        if let Some(msg) = describe(other) {
                            bar.set_message(msg);
                        }
                    }
                },
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        bar.finish_and_clear();
    })
}
