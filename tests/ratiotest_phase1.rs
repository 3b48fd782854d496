//! Integration tests for the phase-1 (feasibility-restoring) ratio test
//!
//! Fixtures are hand-computed: the phase objective is the negated sum of
//! infeasibilities, the caller-supplied reduced cost equals the initial
//! rate of infeasibility reduction, and every expected step, outgoing row,
//! and objective value is derived on paper from the piecewise-linear walk.

use pivr::prelude::*;
use pivr::ratiotest::Phase1Strategy;

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "{a} != {b} (tolerance {tol})");
}

fn options_with(strategy: Phase1Strategy) -> RatioTestOptions {
    RatioTestOptions {
        phase1_strategy: strategy,
        ..RatioTestOptions::default()
    }
}

#[test]
fn test_piecewise_linear_stops_at_slope_crossing() {
    // row 0 below its lower bound by 2 (the only infeasibility), rows 1-2
    // feasible. Slope starts at |d| = 1; row 2's breakpoint at t = 0.5
    // drops it by 2, so the walk stops there.
    let test = PrimalRatioTest::new(options_with(Phase1Strategy::PiecewiseLinear));
    let alpha = AdaptiveVector::from_slice(&[-1.0, 1.0, 2.0]);
    let basis = vec![
        BasicVariable::bounded(0.0, 10.0, -2.0),
        BasicVariable::bounded(0.0, 10.0, 4.0),
        BasicVariable::bounded(0.0, 5.0, 1.0),
    ];
    let incoming = IncomingVariable::bounded(0.0, 8.0);

    let outcome = test.perform_phase1(&alpha, &basis, &incoming, -1.0, -2.0);
    assert_eq!(outcome.step, PivotStep::BasisChange { row: 2 });
    assert_close(outcome.step_length, 0.5, 1e-12);
    assert_close(outcome.phase_objective, -1.5, 1e-12);
    assert!(!outcome.degenerate);
}

#[test]
fn test_piecewise_linear_walks_multiple_breakpoints() {
    // three rows below their lower bounds (total infeasibility 9), one
    // feasible row whose bound hit at t = 1 costs slope 1. The slope
    // 3 -> 2 -> 1 -> 0 walk tops out at row 1's breakpoint, t = 3.
    let test = PrimalRatioTest::new(options_with(Phase1Strategy::PiecewiseLinear));
    let alpha = AdaptiveVector::from_slice(&[-1.0, -1.0, -1.0, 1.0]);
    let basis = vec![
        BasicVariable::bounded(0.0, 10.0, -2.0),
        BasicVariable::bounded(0.0, 10.0, -3.0),
        BasicVariable::bounded(0.0, 10.0, -4.0),
        BasicVariable::bounded(0.0, 10.0, 1.0),
    ];
    let incoming = IncomingVariable::free();

    let outcome = test.perform_phase1(&alpha, &basis, &incoming, -3.0, -9.0);
    assert_eq!(outcome.step, PivotStep::BasisChange { row: 1 });
    assert_close(outcome.step_length, 3.0, 1e-12);
    assert_close(outcome.phase_objective, -3.0, 1e-12);
}

#[test]
fn test_one_step_takes_first_breakpoint() {
    // same fixture as above; the one-step strategy stops at t = 1
    let test = PrimalRatioTest::new(options_with(Phase1Strategy::OneStep));
    let alpha = AdaptiveVector::from_slice(&[-1.0, -1.0, -1.0, 1.0]);
    let basis = vec![
        BasicVariable::bounded(0.0, 10.0, -2.0),
        BasicVariable::bounded(0.0, 10.0, -3.0),
        BasicVariable::bounded(0.0, 10.0, -4.0),
        BasicVariable::bounded(0.0, 10.0, 1.0),
    ];
    let incoming = IncomingVariable::free();

    let outcome = test.perform_phase1(&alpha, &basis, &incoming, -3.0, -9.0);
    assert_eq!(outcome.step, PivotStep::BasisChange { row: 3 });
    assert_close(outcome.step_length, 1.0, 1e-12);
    assert_close(outcome.phase_objective, -6.0, 1e-12);
}

#[test]
fn test_positive_reduced_cost_gives_negative_signed_step() {
    // row 0 sits above its upper bound; the improving direction has
    // sigma = -1, so the signed step comes back negative.
    let test = PrimalRatioTest::new(options_with(Phase1Strategy::PiecewiseLinear));
    let alpha = AdaptiveVector::from_slice(&[-1.0, 1.0]);
    let basis = vec![
        BasicVariable::bounded(0.0, 5.0, 7.0),
        BasicVariable::bounded(0.0, 10.0, 2.0),
    ];
    let incoming = IncomingVariable::free();

    let outcome = test.perform_phase1(&alpha, &basis, &incoming, 1.0, -2.0);
    assert_eq!(outcome.step, PivotStep::BasisChange { row: 0 });
    assert_close(outcome.step_length, -2.0, 1e-12);
    assert_close(outcome.phase_objective, 0.0, 1e-12);
}

#[test]
fn test_fixed_variable_preferred_immediately() {
    // the fixed variable's breakpoint sits at t = 0 and is taken the moment
    // the scan meets it, ahead of the slope bookkeeping
    let test = PrimalRatioTest::new(options_with(Phase1Strategy::PiecewiseLinear));
    let alpha = AdaptiveVector::from_slice(&[-1.0, 0.5]);
    let basis = vec![
        BasicVariable::bounded(0.0, 10.0, -2.0),
        BasicVariable::fixed(3.0, 3.0),
    ];
    let incoming = IncomingVariable::free();

    let outcome = test.perform_phase1(&alpha, &basis, &incoming, -1.0, -2.0);
    assert_eq!(outcome.step, PivotStep::BasisChange { row: 1 });
    assert_eq!(outcome.step_length, 0.0);
    assert!(outcome.degenerate);
    assert_close(outcome.phase_objective, -2.0, 1e-12);
}

#[test]
fn test_fake_feasibility_skip_exhausts_candidates() {
    // the caller's bookkeeping still says "below lower", but the value has
    // drifted back inside the bounds: the breakpoint lands at t = -0.5 and
    // is skipped, leaving nothing
    let test = PrimalRatioTest::new(options_with(Phase1Strategy::PiecewiseLinear));
    let alpha = AdaptiveVector::from_slice(&[-1.0]);
    let basis = vec![BasicVariable {
        value: 0.5,
        lower: 0.0,
        upper: 10.0,
        kind: VariableType::Bounded,
        feasibility: Feasibility::BelowLower,
    }];
    let incoming = IncomingVariable::free();

    let outcome = test.perform_phase1(&alpha, &basis, &incoming, -1.0, -0.5);
    assert_eq!(outcome.step, PivotStep::NoPivot);
    assert_eq!(outcome.step_length, 0.0);
    assert_close(outcome.phase_objective, -0.5, 1e-12);
}

#[test]
fn test_incoming_bound_resolves_to_bound_flip() {
    // the incoming variable's own range (0.3) is the first breakpoint; the
    // scan cannot pass it, so the step is a bound flip
    let test = PrimalRatioTest::new(options_with(Phase1Strategy::PiecewiseLinear));
    let alpha = AdaptiveVector::from_slice(&[-1.0, 1.0, 2.0]);
    let basis = vec![
        BasicVariable::bounded(0.0, 10.0, -2.0),
        BasicVariable::bounded(0.0, 10.0, 4.0),
        BasicVariable::bounded(0.0, 5.0, 1.0),
    ];
    let incoming = IncomingVariable::bounded(0.0, 0.3);

    let outcome = test.perform_phase1(&alpha, &basis, &incoming, -1.0, -2.0);
    assert_eq!(outcome.step, PivotStep::BoundFlip);
    assert_close(outcome.step_length, 0.3, 1e-12);
    assert_close(outcome.phase_objective, -1.7, 1e-12);
}

#[test]
fn test_stable_pivot_escapes_tiny_pivot() {
    // the slope crossing lands on a pivot of magnitude 5e-4, below the
    // 1e-3 tolerance; the bidirectional search settles on row 0 (pivot 1)
    // whose objective is no worse
    let options = RatioTestOptions {
        phase1_strategy: Phase1Strategy::StablePivot,
        tolerances: Tolerances {
            pivot: 1e-3,
            ..Tolerances::default()
        },
        ..RatioTestOptions::default()
    };
    let test = PrimalRatioTest::new(options);
    let alpha = AdaptiveVector::from_slice(&[-1.0, 5e-4, 0.9995]);
    let basis = vec![
        BasicVariable::bounded(0.0, 10.0, -3.0),
        BasicVariable::bounded(0.0, 10.0, 5e-4),
        BasicVariable::bounded(0.0, 10.0, 0.49975),
    ];
    let incoming = IncomingVariable::free();

    let outcome = test.perform_phase1(&alpha, &basis, &incoming, -1.0, -3.0);
    assert_eq!(outcome.step, PivotStep::BasisChange { row: 0 });
    assert_close(outcome.step_length, 3.0, 1e-9);
    assert_close(outcome.phase_objective, -2.49975, 1e-9);
}

#[test]
fn test_empty_direction_yields_no_pivot() {
    let test = PrimalRatioTest::with_defaults();
    let alpha = AdaptiveVector::new(3);
    let basis = vec![
        BasicVariable::bounded(0.0, 10.0, 1.0),
        BasicVariable::bounded(0.0, 10.0, 2.0),
        BasicVariable::bounded(0.0, 10.0, 3.0),
    ];
    let incoming = IncomingVariable::free();

    let outcome = test.perform_phase1(&alpha, &basis, &incoming, -1.0, 0.0);
    assert_eq!(outcome.step, PivotStep::NoPivot);
}
