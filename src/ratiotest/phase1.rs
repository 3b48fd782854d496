//! Phase-1 (feasibility-restoring) primal ratio test
//!
//! The phase-1 objective is the negated sum of infeasibilities, a
//! non-positive piecewise-linear function of the step length that increases
//! toward zero while its slope stays positive. The slope starts at the
//! magnitude of the phase-1 reduced cost; every breakpoint passed subtracts
//! the owning row's `|alpha|`. The scan stops at the breakpoint where the
//! slope would go non-positive — the maximizer of the objective.

use log::{debug, warn};

use crate::vector::AdaptiveVector;

use super::{
    BasicVariable, BreakpointHandler, BreakpointOwner, Feasibility, IncomingVariable,
    Phase1Strategy, PivotStep, PrimalRatioTest, RatioTestOutcome, VariableType,
};

impl PrimalRatioTest {
    /// Runs the phase-1 ratio test for one simplex iteration
    ///
    /// `alpha` is the incoming variable's column after FTRAN, `basis` the
    /// per-row variable metadata (with caller-maintained feasibility
    /// classes), `reduced_cost` the phase-1 reduced cost of the incoming
    /// variable, and `phase_objective` the current negated infeasibility
    /// sum. Never fails: an empty or exhausted candidate set resolves to
    /// [`PivotStep::NoPivot`].
    pub fn perform_phase1(
        &self,
        alpha: &AdaptiveVector,
        basis: &[BasicVariable],
        incoming: &IncomingVariable,
        reduced_cost: f64,
        phase_objective: f64,
    ) -> RatioTestOutcome {
        debug_assert_eq!(alpha.dimension(), basis.len(), "alpha/basis size mismatch");
        let sigma = Self::sigma(reduced_cost);

        let mut handler = BreakpointHandler::with_capacity(alpha.non_zeros() + 1);
        generate_breakpoints(&mut handler, alpha, basis, sigma);
        if incoming.range().is_finite() {
            handler.insert(BreakpointOwner::IncomingBound, incoming.range());
        }
        handler.finalize();
        if handler.is_empty() {
            warn!("phase-1 ratio test found no breakpoints");
            return RatioTestOutcome::no_pivot(phase_objective);
        }
        handler.init_sorting();

        let mut slope = reduced_cost.abs();
        let mut start = 0;

        // Breakpoints with negative step length come from stale feasibility
        // bookkeeping: the variable is only infinitesimally infeasible. Skip
        // them and remove their slope contribution.
        if self.options().handle_fake_feasibility {
            while start < handler.len() && handler.get(start).value < 0.0 {
                if let BreakpointOwner::Basic(row) = handler.get(start).owner {
                    slope -= (sigma * alpha.at(row)).abs();
                }
                start += 1;
            }
            if start == handler.len() || slope <= 0.0 {
                warn!(
                    "phase-1 ratio test exhausted by fake-feasible breakpoints \
                     (skipped {start}, remaining slope {slope:.3e})"
                );
                return RatioTestOutcome::no_pivot(phase_objective);
            }
            if start > 0 {
                debug!("phase-1 ratio test skipped {start} fake-feasible breakpoints");
            }
        }

        let chosen = match self.options().phase1_strategy {
            Phase1Strategy::OneStep => {
                let objective = phase_objective + slope * handler.get(start).value;
                handler.set_functional_value(start, objective);
                Some(start)
            }
            Phase1Strategy::PiecewiseLinear => {
                scan_piecewise(&mut handler, alpha, basis, sigma, slope, start, phase_objective)
                    .map(|(position, _)| position)
            }
            Phase1Strategy::StablePivot => {
                match scan_piecewise(
                    &mut handler,
                    alpha,
                    basis,
                    sigma,
                    slope,
                    start,
                    phase_objective,
                ) {
                    Some((position, slope_after)) => self.stabilize_phase1(
                        &mut handler,
                        alpha,
                        position,
                        slope_after,
                    ),
                    None => None,
                }
            }
        };

        match chosen {
            Some(position) => self.resolve_phase1(&handler, position, alpha, sigma),
            None => {
                warn!("phase-1 ratio test found no acceptable pivot");
                RatioTestOutcome::no_pivot(phase_objective)
            }
        }
    }

    /// Bidirectional search away from an unstable breakpoint
    ///
    /// Walks forward and backward from `chosen`, always stepping the side
    /// whose breakpoint carries the better objective value, until a
    /// candidate clears the pivot tolerance. Backward objective values were
    /// memoized by the scan; forward ones are computed (and memoized) on
    /// demand with the continuing, now non-positive slope.
    fn stabilize_phase1(
        &self,
        handler: &mut BreakpointHandler,
        alpha: &AdaptiveVector,
        chosen: usize,
        slope_after: f64,
    ) -> Option<usize> {
        let pivot_tolerance = self.options().tolerances.pivot;
        if breakpoint_is_stable(handler, chosen, alpha, pivot_tolerance) {
            return Some(chosen);
        }
        debug!(
            "phase-1 pivot at breakpoint {chosen} below tolerance {pivot_tolerance:.3e}; \
             searching both directions"
        );

        let mut forward = chosen + 1;
        let mut forward_slope = slope_after;
        let mut forward_prev = handler.get(chosen).value;
        let mut forward_objective = handler
            .get(chosen)
            .functional_value
            .unwrap_or(f64::NEG_INFINITY);
        let mut backward = chosen as isize - 1;

        loop {
            let forward_value = if forward < handler.len() {
                if handler.get(forward).functional_value.is_none() {
                    let value = handler.get(forward).value;
                    forward_objective += forward_slope * (value - forward_prev);
                    forward_prev = value;
                    handler.set_functional_value(forward, forward_objective);
                }
                handler.get(forward).functional_value
            } else {
                None
            };
            let backward_value = if backward >= 0 {
                handler.get(backward as usize).functional_value
            } else {
                None
            };

            let go_forward = match (forward_value, backward_value) {
                (Some(f), Some(b)) => f >= b,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => return None,
            };

            if go_forward {
                if breakpoint_is_stable(handler, forward, alpha, pivot_tolerance) {
                    return Some(forward);
                }
                if let BreakpointOwner::Basic(row) = handler.get(forward).owner {
                    forward_slope -= alpha.at(row).abs();
                }
                forward += 1;
            } else {
                let position = backward as usize;
                if breakpoint_is_stable(handler, position, alpha, pivot_tolerance) {
                    return Some(position);
                }
                backward -= 1;
            }
        }
    }

    /// Converts the chosen breakpoint into an outcome
    fn resolve_phase1(
        &self,
        handler: &BreakpointHandler,
        position: usize,
        alpha: &AdaptiveVector,
        sigma: f64,
    ) -> RatioTestOutcome {
        let breakpoint = *handler.get(position);
        let objective = breakpoint
            .functional_value
            .unwrap_or(f64::NEG_INFINITY);
        let step_length = sigma * breakpoint.value;
        match breakpoint.owner {
            BreakpointOwner::IncomingBound => {
                debug!("phase-1 ratio test resolves to a bound flip, step {step_length:.6e}");
                RatioTestOutcome {
                    step: PivotStep::BoundFlip,
                    step_length,
                    phase_objective: objective,
                    degenerate: breakpoint.value == 0.0,
                }
            }
            BreakpointOwner::Basic(row) => {
                let pivot = alpha.at(row);
                if pivot.abs() < self.options().tolerances.pivot {
                    debug!(
                        "phase-1 accepting small pivot {pivot:.3e} in row {row} \
                         (no stable alternative)"
                    );
                }
                debug!(
                    "phase-1 ratio test: outgoing row {row}, step {step_length:.6e}, \
                     objective {objective:.6e}"
                );
                RatioTestOutcome {
                    step: PivotStep::BasisChange { row },
                    step_length,
                    phase_objective: objective,
                    degenerate: breakpoint.value == 0.0,
                }
            }
        }
    }
}

/// Collects the phase-1 breakpoints of every basic variable
///
/// Each variable contributes the step length at which it reaches the bound
/// consistent with reducing the infeasibility sum: infeasible variables the
/// bound they violate, feasible variables the bound the step drives them
/// toward. Fixed variables act as both a lower- and an upper-bound hit, so
/// they contribute twice and their removal is preferred by the scan.
fn generate_breakpoints(
    handler: &mut BreakpointHandler,
    alpha: &AdaptiveVector,
    basis: &[BasicVariable],
    sigma: f64,
) {
    for (row, raw) in alpha.nonzero_iter() {
        let a = sigma * raw;
        let variable = &basis[row];
        match variable.feasibility {
            Feasibility::BelowLower => {
                // the step must raise this variable toward its lower bound
                if a < 0.0 {
                    handler.insert(
                        BreakpointOwner::Basic(row),
                        (variable.value - variable.lower) / a,
                    );
                }
            }
            Feasibility::AboveUpper => {
                if a > 0.0 {
                    handler.insert(
                        BreakpointOwner::Basic(row),
                        (variable.value - variable.upper) / a,
                    );
                }
            }
            Feasibility::Feasible => {
                if variable.kind == VariableType::Fixed {
                    let value = (variable.value - variable.lower) / a;
                    handler.insert(BreakpointOwner::Basic(row), value);
                    handler.insert(BreakpointOwner::Basic(row), value);
                } else if a > 0.0 && variable.lower.is_finite() {
                    handler.insert(
                        BreakpointOwner::Basic(row),
                        (variable.value - variable.lower) / a,
                    );
                } else if a < 0.0 && variable.upper.is_finite() {
                    handler.insert(
                        BreakpointOwner::Basic(row),
                        (variable.value - variable.upper) / a,
                    );
                }
            }
        }
    }
}

/// Walks the sorted breakpoints while the slope stays positive
///
/// Memoizes the objective value at every visited breakpoint. Returns the
/// position where the slope goes non-positive (the objective's maximizer)
/// and the slope after that breakpoint, or `None` if the breakpoints run
/// out first. A fixed-variable breakpoint is selected the moment it is
/// encountered, and the incoming variable's own bound cannot be passed.
fn scan_piecewise(
    handler: &mut BreakpointHandler,
    alpha: &AdaptiveVector,
    basis: &[BasicVariable],
    sigma: f64,
    mut slope: f64,
    start: usize,
    mut objective: f64,
) -> Option<(usize, f64)> {
    let mut previous = 0.0;
    for position in start..handler.len() {
        let breakpoint = *handler.get(position);
        objective += slope * (breakpoint.value - previous);
        previous = breakpoint.value;
        handler.set_functional_value(position, objective);
        match breakpoint.owner {
            BreakpointOwner::IncomingBound => {
                // the incoming variable cannot move past its own range
                return Some((position, slope));
            }
            BreakpointOwner::Basic(row) => {
                if basis[row].kind == VariableType::Fixed {
                    return Some((position, slope));
                }
                slope -= (sigma * alpha.at(row)).abs();
                if slope <= 0.0 {
                    return Some((position, slope));
                }
            }
        }
    }
    None
}

/// True if the breakpoint can be pivoted on without numerical risk
///
/// The incoming variable's own bound involves no pivot element and is
/// always acceptable.
fn breakpoint_is_stable(
    handler: &BreakpointHandler,
    position: usize,
    alpha: &AdaptiveVector,
    pivot_tolerance: f64,
) -> bool {
    match handler.get(position).owner {
        BreakpointOwner::IncomingBound => true,
        BreakpointOwner::Basic(row) => alpha.at(row).abs() >= pivot_tolerance,
    }
}
