//! Wolfe's ad-hoc anti-cycling method
//!
//! A phase-2 step of length zero removes no infeasibility and improves no
//! objective; repeated forever it cycles. Wolfe's method breaks the tie by
//! randomly nudging every bound-degenerate basic variable away from its
//! bound, then running the ordinary ratio test restricted to the perturbed
//! set. Perturbations are staged by an integer depth so that successive
//! degenerate iterations stack further nudges, and unwound depth by depth
//! when no pivot emerges. When the staging underflows, the method deactivates
//! itself and the ordinary (degenerate) resolution stands.
//!
//! The perturbation magnitude is drawn from
//! `Uniform(feasibility_tolerance, 2 * feasibility_tolerance)` with an
//! injected RNG: determinism is the caller's choice of generator, not a
//! property this module hides.

use log::{debug, warn};
use rand::Rng;

use crate::error::{Error, Result};
use crate::vector::AdaptiveVector;

use super::{BasicVariable, PivotStep, PrimalRatioTest, RatioTestOutcome};

/// Staged perturbation bookkeeping, persisted across ratio-test invocations
///
/// Each bound-degenerate basic variable sits in the lower- or upper-bound
/// partition with an integer depth; `-1` marks rows outside both partitions.
#[derive(Debug, Clone, Default)]
pub(crate) struct WolfeState {
    active: bool,
    depth: Vec<i32>,
    at_lower: Vec<bool>,
    current_depth: i32,
}

impl WolfeState {
    fn clear(&mut self) {
        self.active = false;
        self.depth.clear();
        self.at_lower.clear();
        self.current_depth = 0;
    }
}

impl PrimalRatioTest {
    /// Runs one Wolfe round after a degenerate phase-2 resolution
    ///
    /// Returns `Ok(Some(outcome))` when a perturbed pivot was found (the
    /// perturbation stands in `basis`), `Ok(None)` when the staging ran dry
    /// and Wolfe deactivated itself, and `Err(WolfeFallback)` when a basic
    /// variable violates its bounds beyond tolerance at initialization.
    pub(crate) fn wolfe_adhoc<R: Rng>(
        &mut self,
        alpha: &AdaptiveVector,
        basis: &mut [BasicVariable],
        reduced_cost: f64,
        sigma: f64,
        phase_objective: f64,
        rng: &mut R,
    ) -> Result<Option<RatioTestOutcome>> {
        let feasibility = self.options().tolerances.feasibility;

        if !self.wolfe.active {
            self.initialize_wolfe(basis, feasibility)?;
        }
        debug_assert_eq!(self.wolfe.depth.len(), basis.len(), "basis size changed");

        // Nudge every variable at the active depth away from its bound and
        // promote it one depth deeper.
        let depth = self.wolfe.current_depth;
        for (row, variable) in basis.iter_mut().enumerate() {
            if self.wolfe.depth[row] != depth {
                continue;
            }
            let nudge = rng.random_range(feasibility..2.0 * feasibility);
            variable.value = if self.wolfe.at_lower[row] {
                variable.lower + nudge
            } else {
                variable.upper - nudge
            };
            self.wolfe.depth[row] = depth + 1;
        }
        self.wolfe.current_depth = depth + 1;
        debug!(
            "Wolfe perturbation advanced to depth {}",
            self.wolfe.current_depth
        );

        loop {
            if let Some((row, t)) = self.wolfe_ratiotest(alpha, basis, sigma) {
                let step_length = sigma * t;
                debug!("Wolfe ratio test: outgoing row {row}, step {step_length:.6e}");
                return Ok(Some(RatioTestOutcome {
                    step: PivotStep::BasisChange { row },
                    step_length,
                    phase_objective: phase_objective + reduced_cost * step_length,
                    degenerate: false,
                }));
            }
            if self.wolfe.current_depth == 0 {
                break;
            }
            // No pivot at this depth: undo its perturbations exactly and
            // retry one depth shallower.
            let failed_depth = self.wolfe.current_depth;
            for (row, variable) in basis.iter_mut().enumerate() {
                if self.wolfe.depth[row] != failed_depth {
                    continue;
                }
                variable.value = if self.wolfe.at_lower[row] {
                    variable.lower
                } else {
                    variable.upper
                };
                self.wolfe.depth[row] = failed_depth - 1;
            }
            self.wolfe.current_depth = failed_depth - 1;
        }

        warn!("Wolfe staging exhausted without a pivot; deactivating");
        self.wolfe.clear();
        Ok(None)
    }

    /// Assigns every bound-degenerate variable to a partition at depth 0
    ///
    /// A variable strictly outside its tolerance-widened bounds aborts the
    /// method: perturbing an infeasible basis would hide the infeasibility.
    fn initialize_wolfe(&mut self, basis: &[BasicVariable], feasibility: f64) -> Result<()> {
        self.wolfe.depth = vec![-1; basis.len()];
        self.wolfe.at_lower = vec![false; basis.len()];
        for (row, variable) in basis.iter().enumerate() {
            if variable.value < variable.lower - feasibility {
                let violation = (variable.lower - variable.value) - feasibility;
                self.wolfe.clear();
                return Err(Error::WolfeFallback { row, violation });
            }
            if variable.value > variable.upper + feasibility {
                let violation = (variable.value - variable.upper) - feasibility;
                self.wolfe.clear();
                return Err(Error::WolfeFallback { row, violation });
            }
            if (variable.value - variable.lower).abs() <= feasibility {
                self.wolfe.depth[row] = 0;
                self.wolfe.at_lower[row] = true;
            } else if (variable.value - variable.upper).abs() <= feasibility {
                self.wolfe.depth[row] = 0;
                self.wolfe.at_lower[row] = false;
            }
        }
        self.wolfe.active = true;
        self.wolfe.current_depth = 0;
        debug!(
            "Wolfe initialized: {} degenerate rows",
            self.wolfe.depth.iter().filter(|&&d| d == 0).count()
        );
        Ok(())
    }

    /// Minimum-ratio test restricted to rows at the active staging depth
    ///
    /// Only stable pivots qualify; ties on the step length prefer the larger
    /// pivot magnitude. A step that is negative within the feasibility
    /// tolerance (the variable sits a hair past its bound) counts as zero.
    fn wolfe_ratiotest(
        &self,
        alpha: &AdaptiveVector,
        basis: &[BasicVariable],
        sigma: f64,
    ) -> Option<(usize, f64)> {
        let tolerances = &self.options().tolerances;
        let depth = self.wolfe.current_depth;
        let mut best: Option<(usize, f64, f64)> = None; // row, t, |pivot|
        for (row, raw) in alpha.nonzero_iter() {
            if self.wolfe.depth[row] != depth {
                continue;
            }
            if raw.abs() < tolerances.pivot {
                continue;
            }
            let a = sigma * raw;
            let variable = &basis[row];
            let bound = if a > 0.0 { variable.lower } else { variable.upper };
            if !bound.is_finite() {
                continue;
            }
            let mut t = (variable.value - bound) / a;
            if t < 0.0 {
                if (variable.value - bound).abs() <= tolerances.feasibility {
                    t = 0.0;
                } else {
                    continue;
                }
            }
            let magnitude = raw.abs();
            let better = match best {
                None => true,
                Some((_, best_t, best_magnitude)) => {
                    t < best_t || (t == best_t && magnitude > best_magnitude)
                }
            };
            if better {
                best = Some((row, t, magnitude));
            }
        }
        best.map(|(row, t, _)| (row, t))
    }
}
