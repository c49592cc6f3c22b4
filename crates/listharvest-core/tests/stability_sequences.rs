//! Drive the stability tracker with simulated page count sequences.

use listharvest_core::stability::DEFAULT_WINDOW;
use listharvest_core::{Observation, StabilityTracker, StepDecision, TerminationReason};

/// Replays a count sequence the way the driver would, repeating the last
/// value once the sequence runs out. Returns the tracker and total reads.
fn run(counts: &[Option<usize>], budget: u32) -> (StabilityTracker, usize) {
    let mut reads = 0usize;
    let mut next = || {
        let value = counts
            .get(reads)
            .or_else(|| counts.last())
            .copied()
            .flatten();
        reads += 1;
        value.map_or(Observation::SectionMissing, Observation::Count)
    };

    let mut tracker = StabilityTracker::new(budget, DEFAULT_WINDOW);
    loop {
        match tracker.observe(next()) {
            StepDecision::Continue => {}
            StepDecision::Confirm => {
                if let StepDecision::Stop(_) = tracker.confirm(next()) {
                    break;
                }
            }
            StepDecision::Stop(_) => break,
        }
    }
    (tracker, reads)
}

#[test]
fn flat_page_is_stable_within_three_steps() {
    let (tracker, _) = run(&[Some(5), Some(5)], 50);
    let outcome = tracker.outcome().unwrap();
    assert_eq!(outcome.reason, TerminationReason::Stable);
    assert_eq!(outcome.final_count, 5);
    assert!(outcome.steps <= 3);
}

#[test]
fn endless_growth_hits_budget_exactly() {
    let growing: Vec<Option<usize>> = (1..=1000).map(Some).collect();
    let (tracker, _) = run(&growing, 10);
    let outcome = tracker.outcome().unwrap();
    assert_eq!(outcome.reason, TerminationReason::BudgetExhausted);
    assert_eq!(outcome.steps, 10);
    assert_eq!(outcome.final_count, 10);
}

#[test]
fn late_section_then_growth_then_stable() {
    let seq = [None, None, Some(20), Some(40), Some(40), Some(55), Some(55)];
    let (tracker, reads) = run(&seq, 50);
    let outcome = tracker.outcome().unwrap();
    assert_eq!(outcome.reason, TerminationReason::Stable);
    assert_eq!(outcome.final_count, 55);
    // 40 repeated once, re-check saw 55, then 55 again plus its re-check.
    assert_eq!(reads, 8);
    assert_eq!(outcome.history, vec![20, 40, 55]);
}

#[test]
fn missing_section_until_budget() {
    let (tracker, _) = run(&[None], 7);
    let outcome = tracker.outcome().unwrap();
    assert_eq!(outcome.reason, TerminationReason::BudgetExhausted);
    assert_eq!(outcome.steps, 7);
    assert_eq!(outcome.final_count, 0);
    assert!(outcome.history.is_empty());
}

#[test]
fn recorded_counts_never_decrease() {
    let seq = [
        Some(3),
        Some(9),
        Some(4),
        Some(12),
        None,
        Some(11),
        Some(30),
        Some(2),
        Some(30),
        Some(30),
    ];
    let (tracker, _) = run(&seq, 50);
    let history = tracker.window().to_vec();
    assert!(history.windows(2).all(|w| w[0] <= w[1]), "{history:?}");
    assert_eq!(tracker.load().count(), 30);
    assert_eq!(tracker.regressions(), 3);
}

#[test]
fn page_that_drops_and_stays_lower_settles() {
    let (tracker, reads) = run(&[Some(10), Some(4), Some(4), Some(4)], 50);
    let outcome = tracker.outcome().unwrap();
    assert_eq!(outcome.reason, TerminationReason::Stable);
    assert_eq!(outcome.final_count, 10);
    assert_eq!(outcome.steps, 3);
    assert_eq!(reads, 4);
    assert_eq!(outcome.history, vec![10]);
    assert_eq!(tracker.regressions(), 1);
    assert_eq!(tracker.last_observed(), Some(4));
}

#[test]
fn window_stays_bounded_on_long_runs() {
    let growing: Vec<Option<usize>> = (0..500).map(Some).collect();
    let (tracker, _) = run(&growing, 400);
    assert!(tracker.window().len() <= DEFAULT_WINDOW);
}
