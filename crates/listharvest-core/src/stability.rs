//! Termination detection for incrementally loading pages.
//!
//! The driver loop feeds one [`Observation`] per step into a
//! [`StabilityTracker`]. The tracker decides whether to keep growing the page,
//! re-check after a longer settle, or stop. All decisions come from the pure
//! [`decide`] / [`decide_confirmation`] functions so they can be exercised
//! against simulated count sequences.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of recent counts kept in a [`StabilityWindow`].
pub const DEFAULT_WINDOW: usize = 8;

/// Why acquisition stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The count stopped changing and a delayed re-check agreed.
    Stable,
    /// The step budget ran out first. The result may be incomplete.
    BudgetExhausted,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::BudgetExhausted => write!(f, "budget exhausted"),
        }
    }
}

/// Lifecycle of one acquisition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    Initializing,
    Growing,
    Confirming,
    Stable,
    BudgetExhausted,
}

/// What one step saw on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The target section has not rendered yet.
    SectionMissing,
    /// Number of materialized items in the target section.
    Count(usize),
}

/// What the driver should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDecision {
    Continue,
    /// Count unchanged once: wait longer and look again before stopping.
    Confirm,
    Stop(TerminationReason),
}

fn within_budget(decision: StepDecision, step: u32, budget: u32) -> StepDecision {
    match decision {
        StepDecision::Continue if step >= budget => {
            StepDecision::Stop(TerminationReason::BudgetExhausted)
        }
        other => other,
    }
}

/// Decide the outcome of step `step` (1-based) given the previous observed
/// count.
///
/// A missing section never counts as a stability signal, and neither does a
/// single drop below the previous reading.
pub fn decide(previous: Option<usize>, current: Observation, step: u32, budget: u32) -> StepDecision {
    let decision = match (previous, current) {
        (Some(prev), Observation::Count(n)) if n == prev => StepDecision::Confirm,
        _ => StepDecision::Continue,
    };
    within_budget(decision, step, budget)
}

/// Decide after the confirmatory re-check that follows [`StepDecision::Confirm`].
pub fn decide_confirmation(
    previous: Option<usize>,
    recheck: Observation,
    step: u32,
    budget: u32,
) -> StepDecision {
    let decision = match (previous, recheck) {
        (Some(prev), Observation::Count(n)) if n == prev => {
            StepDecision::Stop(TerminationReason::Stable)
        }
        _ => StepDecision::Continue,
    };
    within_budget(decision, step, budget)
}

/// Number of items currently materialized. Never decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadState {
    count: usize,
}

impl LoadState {
    pub fn count(&self) -> usize {
        self.count
    }

    /// Record a new count. Returns `false` (and keeps the old value) if it
    /// would move backwards.
    pub fn advance(&mut self, count: usize) -> bool {
        if count < self.count {
            return false;
        }
        self.count = count;
        true
    }
}

/// The last N recorded counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilityWindow {
    counts: VecDeque<usize>,
    capacity: usize,
}

impl StabilityWindow {
    /// Create a window; capacities below 2 are raised to 2.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            counts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, count: usize) {
        if self.counts.len() == self.capacity {
            self.counts.pop_front();
        }
        self.counts.push_back(count);
    }

    pub fn last(&self) -> Option<usize> {
        self.counts.back().copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.counts.iter().copied().collect()
    }
}

impl Default for StabilityWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Final result of an acquisition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireOutcome {
    pub final_count: usize,
    pub reason: TerminationReason,
    /// Steps taken, including the one that terminated.
    pub steps: u32,
    /// Most recent recorded counts, oldest first.
    pub history: Vec<usize>,
}

/// Owns the load state and window for one session and applies the
/// decision rules step by step.
///
/// The stop rule compares consecutive *observed* counts. A page that drops
/// to a lower count and stays there still settles, while the recorded count
/// and the window keep the highest value seen.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    load: LoadState,
    window: StabilityWindow,
    last_observed: Option<usize>,
    state: DriverState,
    steps: u32,
    budget: u32,
    regressions: u32,
}

impl StabilityTracker {
    /// `budget` is the maximum number of steps; zero is treated as one.
    pub fn new(budget: u32, window: usize) -> Self {
        Self {
            load: LoadState::default(),
            window: StabilityWindow::new(window),
            last_observed: None,
            state: DriverState::Initializing,
            steps: 0,
            budget: budget.max(1),
            regressions: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn load(&self) -> LoadState {
        self.load
    }

    pub fn window(&self) -> &StabilityWindow {
        &self.window
    }

    /// Observed counts that were lower than the recorded one.
    pub fn regressions(&self) -> u32 {
        self.regressions
    }

    /// Count seen by the most recent step or re-check, lower or not.
    pub fn last_observed(&self) -> Option<usize> {
        self.last_observed
    }

    /// Feed the observation of a new step.
    pub fn observe(&mut self, observation: Observation) -> StepDecision {
        if let Some(done) = self.terminal_decision() {
            return done;
        }
        self.steps += 1;
        let decision = decide(self.last_observed, observation, self.steps, self.budget);
        self.record(observation);
        self.apply(decision)
    }

    /// Feed the delayed re-check requested by [`StepDecision::Confirm`].
    pub fn confirm(&mut self, observation: Observation) -> StepDecision {
        if let Some(done) = self.terminal_decision() {
            return done;
        }
        let decision =
            decide_confirmation(self.last_observed, observation, self.steps, self.budget);
        self.record(observation);
        self.apply(decision)
    }

    /// The outcome, once a terminal state has been reached.
    pub fn outcome(&self) -> Option<AcquireOutcome> {
        let reason = match self.state {
            DriverState::Stable => TerminationReason::Stable,
            DriverState::BudgetExhausted => TerminationReason::BudgetExhausted,
            _ => return None,
        };
        Some(AcquireOutcome {
            final_count: self.load.count(),
            reason,
            steps: self.steps,
            history: self.window.to_vec(),
        })
    }

    fn terminal_decision(&self) -> Option<StepDecision> {
        match self.state {
            DriverState::Stable => Some(StepDecision::Stop(TerminationReason::Stable)),
            DriverState::BudgetExhausted => {
                Some(StepDecision::Stop(TerminationReason::BudgetExhausted))
            }
            _ => None,
        }
    }

    fn record(&mut self, observation: Observation) {
        let Observation::Count(count) = observation else {
            return;
        };
        if self.last_observed == Some(count) {
            return;
        }
        self.last_observed = Some(count);
        if !self.load.advance(count) {
            self.regressions += 1;
        } else if self.window.last() != Some(count) {
            self.window.push(count);
        }
    }

    fn apply(&mut self, decision: StepDecision) -> StepDecision {
        self.state = match decision {
            StepDecision::Stop(TerminationReason::Stable) => DriverState::Stable,
            StepDecision::Stop(TerminationReason::BudgetExhausted) => DriverState::BudgetExhausted,
            StepDecision::Confirm => DriverState::Confirming,
            StepDecision::Continue if self.window.is_empty() => DriverState::Initializing,
            StepDecision::Continue => DriverState::Growing,
        };
        decision
    }
}
