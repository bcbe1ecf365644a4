//! Property-based tests for the domain crate.
//!
//! These tests use proptest to verify invariants around:
//! - Outcome aggregation (dominance order, commutativity, idempotence)
//! - Halting semantics of strict and tolerant runs
//! - Revert passes over registries with failing changes

use crate::assessment::Assessment;
use crate::change::{Change, ChangeError, ChangeRegistry};
use crate::evaluation::ControlEvaluation;
use crate::policy::SignalHandling;
use crate::step::Step;
use assessor_types::{Outcome, aggregate};
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Strategies for generating arbitrary values
// ============================================================================

/// Outcomes that steps may report and that aggregation ranks.
fn arb_ranked_outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Passed),
        Just(Outcome::NeedsReview),
        Just(Outcome::Unknown),
        Just(Outcome::Failed),
    ]
}

fn rank(outcome: Outcome) -> u8 {
    match outcome {
        Outcome::Failed => 3,
        Outcome::Unknown => 2,
        Outcome::NeedsReview => 1,
        _ => 0,
    }
}

/// Shape of one generated change: was it applied, does its revert fail.
#[derive(Clone, Copy, Debug)]
struct ChangeShape {
    applied: bool,
    revert_fails: bool,
}

fn arb_change_shape() -> impl Strategy<Value = ChangeShape> {
    (any::<bool>(), any::<bool>()).prop_map(|(applied, revert_fails)| ChangeShape {
        applied,
        revert_fails,
    })
}

fn counted_steps(outcomes: &[Outcome], calls: &Arc<AtomicUsize>) -> Vec<Step<()>> {
    outcomes
        .iter()
        .enumerate()
        .map(|(i, outcome)| {
            let outcome = *outcome;
            let calls = calls.clone();
            Step::new(format!("step_{i}"), move |_: &(), _| {
                calls.fetch_add(1, Ordering::SeqCst);
                (outcome, String::new())
            })
        })
        .collect()
}

fn assessment(steps: Vec<Step<()>>) -> Assessment<()> {
    Assessment::new("REQ-P", "property", ["any"], steps).unwrap()
}

// ============================================================================
// Aggregation
// ============================================================================

proptest! {
    #[test]
    fn aggregate_is_commutative(a in arb_ranked_outcome(), b in arb_ranked_outcome()) {
        prop_assert_eq!(aggregate(a, b), aggregate(b, a));
    }

    #[test]
    fn aggregate_is_idempotent(a in arb_ranked_outcome()) {
        prop_assert_eq!(aggregate(a, a), a);
    }

    #[test]
    fn aggregate_picks_the_more_severe(a in arb_ranked_outcome(), b in arb_ranked_outcome()) {
        let expected = if rank(a) >= rank(b) { a } else { b };
        prop_assert_eq!(aggregate(a, b), expected);
    }

    #[test]
    fn folding_is_order_independent(outcomes in prop::collection::vec(arb_ranked_outcome(), 1..12)) {
        let forward = outcomes.iter().fold(Outcome::NotRun, |acc, o| acc.aggregate(*o));
        let backward = outcomes.iter().rev().fold(Outcome::NotRun, |acc, o| acc.aggregate(*o));
        let worst = outcomes.iter().copied().max_by_key(|o| rank(*o)).unwrap();
        prop_assert_eq!(forward, backward);
        prop_assert_eq!(forward, worst);
    }
}

// ============================================================================
// Run loop halting
// ============================================================================

proptest! {
    #[test]
    fn strict_run_halts_at_first_failure(outcomes in prop::collection::vec(arb_ranked_outcome(), 1..10)) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut a = assessment(counted_steps(&outcomes, &calls));
        let result = a.run(&(), &["any"]);

        match outcomes.iter().position(|o| *o == Outcome::Failed) {
            Some(idx) => {
                prop_assert_eq!(result, Outcome::Failed);
                prop_assert_eq!(a.steps_executed(), idx + 1);
                prop_assert_eq!(calls.load(Ordering::SeqCst), idx + 1);
            }
            None => {
                prop_assert_eq!(a.steps_executed(), outcomes.len());
                prop_assert_ne!(result, Outcome::Failed);
            }
        }
    }

    #[test]
    fn tolerant_run_executes_every_step(outcomes in prop::collection::vec(arb_ranked_outcome(), 1..10)) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut a = assessment(counted_steps(&outcomes, &calls));
        let result = a.run_tolerate_failures(&(), &["any"]);

        let expected = outcomes.iter().fold(Outcome::NotRun, |acc, o| acc.aggregate(*o));
        prop_assert_eq!(result, expected);
        prop_assert_eq!(a.steps_executed(), outcomes.len());
        prop_assert_eq!(calls.load(Ordering::SeqCst), outcomes.len());
    }

    #[test]
    fn disjoint_applicability_runs_nothing(
        tags in prop::collection::vec("[a-z]{1,8}", 1..4),
        outcomes in prop::collection::vec(arb_ranked_outcome(), 1..5),
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut a: Assessment<()> =
            Assessment::new("REQ-P", "property", tags, counted_steps(&outcomes, &calls)).unwrap();
        // Upper-case tags can never match the lower-case ones above.
        let result = a.run(&(), &["ZZZ"]);

        prop_assert_eq!(result, Outcome::NotApplicable);
        prop_assert_eq!(a.steps_executed(), 0);
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn strict_control_result_matches_tolerant_unless_failed(
        groups in prop::collection::vec(prop::collection::vec(arb_ranked_outcome(), 1..4), 1..5),
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let build = || {
            let mut c: ControlEvaluation<()> = ControlEvaluation::new("prop", "P-1")
                .with_signal_handling(SignalHandling::Ignore);
            for (i, group) in groups.iter().enumerate() {
                c.add_assessment(format!("P-1.{i}"), "d", ["any"], counted_steps(group, &calls))
                    .unwrap();
            }
            c
        };

        let strict = build().evaluate(&(), &["any"]);
        let tolerant = build().tolerant_evaluate(&(), &["any"]);
        prop_assert_eq!(strict.is_failed(), tolerant.is_failed());
        if !tolerant.is_failed() {
            prop_assert_eq!(strict, tolerant);
        }
    }
}

// ============================================================================
// Revert passes
// ============================================================================

proptest! {
    #[test]
    fn revert_all_visits_each_eligible_change_once(shapes in prop::collection::vec(arb_change_shape(), 0..12)) {
        let mut registry = ChangeRegistry::new();
        let mut counters = Vec::new();

        for (i, shape) in shapes.iter().enumerate() {
            let reverts = Arc::new(AtomicUsize::new(0));
            counters.push(reverts.clone());
            let fails = shape.revert_fails;
            let change = registry.record(
                format!("change_{i:02}"),
                Change::new("t", "d", || Ok(()), move || {
                    reverts.fetch_add(1, Ordering::SeqCst);
                    if fails { Err(ChangeError::new("stuck")) } else { Ok(()) }
                }),
            );
            if shape.applied {
                change.apply().unwrap();
            }
        }

        let corrupted = registry.revert_all();

        let expect_corrupted = shapes.iter().any(|s| s.applied && s.revert_fails);
        prop_assert_eq!(corrupted, expect_corrupted);
        for (shape, counter) in shapes.iter().zip(&counters) {
            let expected = usize::from(shape.applied);
            prop_assert_eq!(counter.load(Ordering::SeqCst), expected);
        }
    }
}
