//! Configuration loading and resolution.

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A pause whose length is drawn uniformly from `min_ms..=max_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const ZERO: Self = Self::fixed(0);

    pub const fn fixed(ms: u64) -> Self {
        Self {
            min_ms: ms,
            max_ms: ms,
        }
    }

    pub const fn between(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn sample(&self) -> Duration {
        let ms = if self.max_ms > self.min_ms {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        } else {
            self.min_ms
        };
        Duration::from_millis(ms)
    }

    /// Sleep for a sampled duration. Zero ranges return immediately.
    pub async fn wait(&self) {
        let d = self.sample();
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}

/// Timing and budget knobs for the acquisition driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Maximum number of steps before giving up on stability.
    pub max_steps: u32,
    /// Number of recent counts kept for termination decisions.
    pub window: usize,
    /// How long to wait for the root container to first appear.
    pub initial_wait_ms: u64,
    /// Pause after each scroll.
    pub step_settle: DelayRange,
    /// Pause after clicking the load-more control.
    pub load_more_settle: DelayRange,
    /// Pause after scrolling the located section into view.
    pub section_settle: DelayRange,
    /// Longer pause before the confirmatory re-check.
    pub confirm_settle: DelayRange,
    /// Extra pause when the section has not rendered yet.
    pub missing_settle: DelayRange,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_steps: 50,
            window: listharvest_core::stability::DEFAULT_WINDOW,
            initial_wait_ms: 15_000,
            step_settle: DelayRange::fixed(3_000),
            load_more_settle: DelayRange::fixed(2_000),
            section_settle: DelayRange::fixed(2_000),
            confirm_settle: DelayRange::fixed(5_000),
            missing_settle: DelayRange::fixed(2_000),
        }
    }
}

impl DriverConfig {
    /// No pauses at all; for snapshots and tests.
    pub fn instant() -> Self {
        Self {
            step_settle: DelayRange::ZERO,
            load_more_settle: DelayRange::ZERO,
            section_settle: DelayRange::ZERO,
            confirm_settle: DelayRange::ZERO,
            missing_settle: DelayRange::ZERO,
            ..Self::default()
        }
    }
}

/// Top-level configuration for a harvest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub driver: DriverConfig,
    /// Wall-clock limit for one whole session.
    pub session_timeout_secs: u64,
    pub navigation_timeout_ms: u64,
    /// Where the file store lives; resolved by [`resolve_data_dir`] when unset.
    pub data_dir: Option<PathBuf>,
    /// Run the browser with a visible window.
    pub headful: bool,
    /// Fixed user agent instead of a random desktop one.
    pub user_agent: Option<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            session_timeout_secs: 600,
            navigation_timeout_ms: 30_000,
            data_dir: None,
            headful: false,
            user_agent: None,
        }
    }
}

impl HarvestConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Defaults, overlaid with the file at `path` when given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

/// Resolve the data directory for the file store.
///
/// Order: explicit path, `LISTHARVEST_DATA_DIR`, then `~/.listharvest/data`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(env_path) = std::env::var("LISTHARVEST_DATA_DIR") {
        if !env_path.is_empty() {
            return PathBuf::from(env_path);
        }
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".listharvest")
        .join("data")
}
