//! Bounded polling with backoff, used where the engine has no native wait.

use std::future::Future;

use tokio::time::{sleep, Duration, Instant};

/// Backoff configuration for poll loops.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Delay before the second poll.
    pub initial: Duration,
    /// Maximum delay between polls.
    pub max: Duration,
    /// Multiplicative growth factor.
    pub factor: u32,
}

impl Backoff {
    #[must_use]
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(self.factor).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(50),
            max: Duration::from_secs(1),
            factor: 2,
        }
    }
}

/// Poll `check` until it yields `Some` or `timeout` elapses.
///
/// The check always runs at least once. Returns `None` on timeout.
pub async fn poll_until<F, Fut, T>(mut check: F, timeout: Duration, backoff: Backoff) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    let mut delay = backoff.initial;
    loop {
        if let Some(value) = check().await {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        let remaining = deadline.saturating_duration_since(now);
        sleep(delay.min(remaining)).await;
        delay = backoff.next_delay(delay);
    }
}
