//! Phase-2 (optimality-restoring) primal ratio test
//!
//! All basic variables are feasible; the step length is bounded by the first
//! basic variable driven to one of its bounds. The textbook rule takes the
//! minimum ratio. Under Harris/Expand relaxation a second pass instead picks
//! the candidate with the largest pivot magnitude among every breakpoint
//! inside the tolerance-relaxed window, trading a bounded bound violation
//! for a numerically stable basis update. Zero-length steps are flagged
//! degenerate and, when enabled, handed to Wolfe's anti-cycling method.

use log::{debug, warn};
use rand::Rng;

use crate::error::Result;
use crate::vector::AdaptiveVector;

use super::{
    BasicVariable, BreakpointHandler, BreakpointOwner, IncomingVariable, PivotStep,
    PrimalRatioTest, RatioTestOutcome, VariableType,
};

impl PrimalRatioTest {
    /// Runs the phase-2 ratio test for one simplex iteration
    ///
    /// `basis` is mutable because a Wolfe perturbation, when triggered by a
    /// degenerate step, nudges basic-variable values in place and the
    /// perturbation stands when a pivot is found. The RNG drives only the
    /// Wolfe perturbation; inject a seeded generator for reproducibility.
    ///
    /// # Errors
    ///
    /// [`Error::WolfeFallback`](crate::error::Error::WolfeFallback) when
    /// Wolfe initialization meets a variable violating its bounds beyond
    /// the feasibility tolerance.
    pub fn perform_phase2<R: Rng>(
        &mut self,
        alpha: &AdaptiveVector,
        basis: &mut [BasicVariable],
        incoming: &IncomingVariable,
        reduced_cost: f64,
        phase_objective: f64,
        rng: &mut R,
    ) -> Result<RatioTestOutcome> {
        debug_assert_eq!(alpha.dimension(), basis.len(), "alpha/basis size mismatch");
        let sigma = Self::sigma(reduced_cost);
        let relaxation = self.advance_expand_tolerance();

        let mut handler = BreakpointHandler::with_capacity(alpha.non_zeros());
        let mut fixed_candidate: Option<(usize, f64)> = None;
        for (row, raw) in alpha.nonzero_iter() {
            let a = sigma * raw;
            let variable = &basis[row];
            match variable.kind {
                VariableType::Free => {}
                VariableType::Fixed => {
                    let t = (variable.value - variable.lower) / a;
                    if t >= 0.0
                        && fixed_candidate.is_none_or(|(_, best)| t < best)
                    {
                        fixed_candidate = Some((row, t));
                    }
                }
                _ => {
                    // the binding bound is the one the step drives the
                    // variable toward
                    let bound = if a > 0.0 { variable.lower } else { variable.upper };
                    if !bound.is_finite() {
                        continue;
                    }
                    let exact = (variable.value - bound) / a;
                    if relaxation > 0.0 {
                        let relaxed = if a > 0.0 {
                            (variable.value - bound + relaxation) / a
                        } else {
                            (variable.value - bound - relaxation) / a
                        };
                        handler.insert_expanded(BreakpointOwner::Basic(row), exact, relaxed);
                    } else {
                        handler.insert(BreakpointOwner::Basic(row), exact);
                    }
                }
            }
        }

        // A fixed basic variable with a feasible non-negative step leaves
        // the basis immediately; removing it can never hurt and frees the
        // row for good.
        if let Some((row, t)) = fixed_candidate {
            debug!("phase-2: fixed variable in row {row} leaves immediately, step {t:.6e}");
            let outcome = self.basis_change(
                row,
                t,
                sigma,
                reduced_cost,
                phase_objective,
                t <= 0.0,
                alpha,
            );
            return Ok(outcome);
        }

        handler.finalize();
        if handler.is_empty() {
            warn!("phase-2 ratio test found no breakpoints");
            return Ok(RatioTestOutcome::no_pivot(phase_objective));
        }
        handler.init_sorting();

        // First pass: the minimum ratio. Beyond the incoming variable's own
        // range the step resolves into a bound flip, not a basis change.
        let first_value = handler.get(0).value;
        if incoming.range().is_finite() && first_value > incoming.range() {
            let step_length = sigma * incoming.range();
            debug!("phase-2 ratio test resolves to a bound flip, step {step_length:.6e}");
            return Ok(RatioTestOutcome {
                step: PivotStep::BoundFlip,
                step_length,
                phase_objective: phase_objective + reduced_cost * step_length,
                degenerate: false,
            });
        }

        let outcome = if relaxation > 0.0 {
            self.second_pass(&handler, alpha, sigma, reduced_cost, phase_objective)
        } else {
            let BreakpointOwner::Basic(row) = handler.get(0).owner else {
                unreachable!("phase-2 breakpoints are always basic-owned");
            };
            self.basis_change(
                row,
                first_value,
                sigma,
                reduced_cost,
                phase_objective,
                first_value <= 0.0,
                alpha,
            )
        };

        if outcome.degenerate && self.options().enable_wolfe {
            return match self.wolfe_adhoc(alpha, basis, reduced_cost, sigma, phase_objective, rng)?
            {
                Some(wolfe_outcome) => Ok(wolfe_outcome),
                // Wolfe ran dry and deactivated itself; the ordinary
                // (degenerate) resolution stands
                None => Ok(outcome),
            };
        }
        Ok(outcome)
    }

    /// Harris/Expand second pass: most stable pivot inside the relaxed window
    fn second_pass(
        &self,
        handler: &BreakpointHandler,
        alpha: &AdaptiveVector,
        sigma: f64,
        reduced_cost: f64,
        phase_objective: f64,
    ) -> RatioTestOutcome {
        let window = handler.second_pass_window();
        let candidates = handler.second_pass_candidates(window);

        let mut best: Option<(usize, usize, f64)> = None; // position, row, |pivot|
        for &position in &candidates {
            let BreakpointOwner::Basic(row) = handler.get(position).owner else {
                continue;
            };
            let magnitude = alpha.at(row).abs();
            if best.is_none_or(|(_, _, m)| magnitude > m) {
                best = Some((position, row, magnitude));
            }
        }
        let Some((position, row, magnitude)) = best else {
            warn!("phase-2 second pass found no candidate inside the window");
            return RatioTestOutcome::no_pivot(phase_objective);
        };

        let chosen_value = handler.get(position).value;
        let theta_min = self.tolerance_step() / magnitude;
        if chosen_value < theta_min {
            if self.options().avoid_theta_min {
                if let Some((alt_row, alt_value)) =
                    self.candidate_above_floor(handler, alpha, &candidates, theta_min)
                {
                    debug!(
                        "phase-2 second pass avoids theta-min clamp: row {alt_row}, \
                         step {alt_value:.6e}"
                    );
                    return self.basis_change(
                        alt_row,
                        alt_value,
                        sigma,
                        reduced_cost,
                        phase_objective,
                        false,
                        alpha,
                    );
                }
            }
            debug!(
                "phase-2 second pass clamps step {chosen_value:.6e} to \
                 theta-min {theta_min:.6e} (degenerate)"
            );
            return self.basis_change(
                row,
                theta_min,
                sigma,
                reduced_cost,
                phase_objective,
                true,
                alpha,
            );
        }

        self.basis_change(
            row,
            chosen_value,
            sigma,
            reduced_cost,
            phase_objective,
            chosen_value <= 0.0,
            alpha,
        )
    }

    /// Largest-pivot candidate whose step clears the theta-min floor
    fn candidate_above_floor(
        &self,
        handler: &BreakpointHandler,
        alpha: &AdaptiveVector,
        candidates: &[usize],
        theta_min: f64,
    ) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64, f64)> = None; // row, value, |pivot|
        for &position in candidates {
            let BreakpointOwner::Basic(row) = handler.get(position).owner else {
                continue;
            };
            let value = handler.get(position).value;
            if value < theta_min {
                continue;
            }
            let magnitude = alpha.at(row).abs();
            if best.is_none_or(|(_, _, m)| magnitude > m) {
                best = Some((row, value, magnitude));
            }
        }
        best.map(|(row, value, _)| (row, value))
    }

    /// Assembles a basis-change outcome and applies the objective update
    fn basis_change(
        &self,
        row: usize,
        t: f64,
        sigma: f64,
        reduced_cost: f64,
        phase_objective: f64,
        degenerate: bool,
        alpha: &AdaptiveVector,
    ) -> RatioTestOutcome {
        let pivot = alpha.at(row);
        if pivot.abs() < self.options().tolerances.pivot {
            debug!("phase-2 accepting small pivot {pivot:.3e} in row {row}");
        }
        let step_length = sigma * t;
        debug!(
            "phase-2 ratio test: outgoing row {row}, step {step_length:.6e}, \
             degenerate {degenerate}"
        );
        RatioTestOutcome {
            step: PivotStep::BasisChange { row },
            step_length,
            phase_objective: phase_objective + reduced_cost * step_length,
            degenerate,
        }
    }
}
