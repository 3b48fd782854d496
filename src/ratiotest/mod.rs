//! Primal ratio test: outgoing-variable selection for one simplex iteration
//!
//! Given the incoming variable's direction vector `alpha` (its column after
//! FTRAN), the current basic-variable values, and bound metadata, the ratio
//! test decides which basic variable leaves the basis, how long the step is,
//! and whether the step degenerates into a bound flip of the incoming
//! variable. Both the feasibility-restoring phase-1 variant and the
//! optimality-restoring phase-2 variant maximize a piecewise-linear function
//! over sorted breakpoints; phase 2 optionally applies Harris/Expand
//! tolerance relaxation, and zero-length (degenerate) phase-2 steps can hand
//! off to Wolfe's randomized anti-cycling perturbation.
//!
//! The test itself never raises a hard error for an empty candidate set: it
//! reports [`PivotStep::NoPivot`] and leaves the optimality/unboundedness
//! verdict to the calling simplex loop. The only error surfaced here is the
//! recoverable [`Error::WolfeFallback`](crate::error::Error::WolfeFallback).

mod breakpoint;
mod phase1;
mod phase2;
mod wolfe;

pub use breakpoint::{Breakpoint, BreakpointHandler, BreakpointOwner};

use crate::stable::Tolerances;

use wolfe::WolfeState;

// ============================================================================
// Variable metadata supplied by the (out-of-scope) model layer
// ============================================================================

/// Bound structure of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    /// Lower bound equals upper bound
    Fixed,
    /// Finite lower and upper bounds
    Bounded,
    /// Finite lower bound only
    LowerBounded,
    /// Finite upper bound only
    UpperBounded,
    /// No finite bounds
    Free,
}

/// Phase-1 feasibility class of a basic variable
///
/// Maintained by the caller's bound bookkeeping; the ratio test consumes it
/// as-is. A stale classification (a variable that drifted back inside its
/// bounds while still marked infeasible) produces a negative breakpoint,
/// which the fake-feasibility option skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feasibility {
    /// Below the lower bound beyond tolerance
    BelowLower,
    /// Within bounds (up to tolerance)
    Feasible,
    /// Above the upper bound beyond tolerance
    AboveUpper,
}

impl Feasibility {
    /// Classifies a value against its bounds with the given tolerance
    pub fn classify(value: f64, lower: f64, upper: f64, tolerance: f64) -> Self {
        if value < lower - tolerance {
            Feasibility::BelowLower
        } else if value > upper + tolerance {
            Feasibility::AboveUpper
        } else {
            Feasibility::Feasible
        }
    }
}

/// One basic variable as the ratio test sees it: current value, bounds,
/// type, and the caller-maintained feasibility class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicVariable {
    /// Current value
    pub value: f64,
    /// Lower bound (`f64::NEG_INFINITY` if absent)
    pub lower: f64,
    /// Upper bound (`f64::INFINITY` if absent)
    pub upper: f64,
    /// Bound structure
    pub kind: VariableType,
    /// Phase-1 feasibility class
    pub feasibility: Feasibility,
}

impl BasicVariable {
    /// A fixed variable (both bounds at `bound`)
    pub fn fixed(bound: f64, value: f64) -> Self {
        Self::classified(VariableType::Fixed, bound, bound, value)
    }

    /// A variable with finite bounds on both sides
    pub fn bounded(lower: f64, upper: f64, value: f64) -> Self {
        Self::classified(VariableType::Bounded, lower, upper, value)
    }

    /// A variable with a finite lower bound only
    pub fn lower_bounded(lower: f64, value: f64) -> Self {
        Self::classified(VariableType::LowerBounded, lower, f64::INFINITY, value)
    }

    /// A variable with a finite upper bound only
    pub fn upper_bounded(upper: f64, value: f64) -> Self {
        Self::classified(VariableType::UpperBounded, f64::NEG_INFINITY, upper, value)
    }

    /// A variable with no finite bounds
    pub fn free(value: f64) -> Self {
        Self::classified(VariableType::Free, f64::NEG_INFINITY, f64::INFINITY, value)
    }

    fn classified(kind: VariableType, lower: f64, upper: f64, value: f64) -> Self {
        Self {
            value,
            lower,
            upper,
            kind,
            feasibility: Feasibility::classify(
                value,
                lower,
                upper,
                crate::stable::DEFAULT_FEASIBILITY_TOLERANCE,
            ),
        }
    }

    /// Re-derives the feasibility class from the current value
    pub fn reclassify(&mut self, tolerance: f64) {
        self.feasibility = Feasibility::classify(self.value, self.lower, self.upper, tolerance);
    }
}

/// Bound description of the incoming variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomingVariable {
    /// Bound structure
    pub kind: VariableType,
    /// Lower bound (`f64::NEG_INFINITY` if absent)
    pub lower: f64,
    /// Upper bound (`f64::INFINITY` if absent)
    pub upper: f64,
}

impl IncomingVariable {
    /// An incoming variable with finite bounds on both sides
    pub fn bounded(lower: f64, upper: f64) -> Self {
        Self {
            kind: VariableType::Bounded,
            lower,
            upper,
        }
    }

    /// An incoming variable with a finite lower bound only
    pub fn lower_bounded(lower: f64) -> Self {
        Self {
            kind: VariableType::LowerBounded,
            lower,
            upper: f64::INFINITY,
        }
    }

    /// An incoming variable with no finite bounds
    pub fn free() -> Self {
        Self {
            kind: VariableType::Free,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// Width of the bound range; infinite when either bound is absent
    #[inline]
    pub fn range(&self) -> f64 {
        self.upper - self.lower
    }
}

// ============================================================================
// Options
// ============================================================================

/// Breakpoint-scanning strategy for the phase-1 ratio test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase1Strategy {
    /// Take the first breakpoint unconditionally; fast, least stable
    OneStep,
    /// Walk the piecewise-linear objective while its slope stays positive
    #[default]
    PiecewiseLinear,
    /// As [`PiecewiseLinear`](Self::PiecewiseLinear), then search both
    /// directions for an alternative when the chosen pivot is unstable
    StablePivot,
}

/// Tolerance-relaxation policy for the phase-2 ratio test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpandPolicy {
    /// Textbook minimum-ratio selection, no relaxation
    #[default]
    Inactive,
    /// Expand procedure: the working tolerance grows a little every
    /// invocation and wraps back when it reaches the feasibility tolerance
    Expanding,
    /// Harris ratio test: fixed relaxation at the feasibility tolerance
    Harris,
}

/// Configuration of the primal ratio test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioTestOptions {
    /// Phase-1 scanning strategy (default: `PiecewiseLinear`)
    pub phase1_strategy: Phase1Strategy,
    /// Phase-2 tolerance relaxation (default: `Inactive`)
    pub expand: ExpandPolicy,
    /// Numerator scale of the Expand tolerance step (default: 100.0)
    pub expand_multiplier: f64,
    /// Denominator scale of the Expand tolerance step (default: 10000.0)
    pub expand_divider: f64,
    /// Skip negative phase-1 breakpoints as infinitesimally infeasible
    /// (default: true)
    pub handle_fake_feasibility: bool,
    /// Hand degenerate phase-2 steps to Wolfe's anti-cycling perturbation
    /// (default: false)
    pub enable_wolfe: bool,
    /// Search for a second-pass candidate above the theta-min floor before
    /// accepting a clamped degenerate step (default: false)
    pub avoid_theta_min: bool,
    /// Tolerance bundle
    pub tolerances: Tolerances,
}

impl Default for RatioTestOptions {
    fn default() -> Self {
        Self {
            phase1_strategy: Phase1Strategy::default(),
            expand: ExpandPolicy::default(),
            expand_multiplier: 100.0,
            expand_divider: 10_000.0,
            handle_fake_feasibility: true,
            enable_wolfe: false,
            avoid_theta_min: false,
            tolerances: Tolerances::default(),
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// What kind of step the ratio test resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotStep {
    /// A basic variable leaves the basis at the given row
    BasisChange {
        /// Basis row of the outgoing variable
        row: usize,
    },
    /// No basis change: the incoming variable moves to its opposite bound
    BoundFlip,
    /// No breakpoint qualified; the caller decides whether this means
    /// optimality, unboundedness, or an upstream modeling error
    NoPivot,
}

/// Result of one ratio-test invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioTestOutcome {
    /// The resolved step kind
    pub step: PivotStep,
    /// Signed step length of the incoming variable (sign carries the
    /// improving direction)
    pub step_length: f64,
    /// Phase objective value after the step
    pub phase_objective: f64,
    /// True if the step length is (or was clamped from) zero
    pub degenerate: bool,
}

impl RatioTestOutcome {
    pub(crate) fn no_pivot(phase_objective: f64) -> Self {
        Self {
            step: PivotStep::NoPivot,
            step_length: 0.0,
            phase_objective,
            degenerate: false,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Primal ratio-test session
///
/// One instance lives per solve: it owns the options, the Expand working
/// tolerance that advances across invocations, and the Wolfe perturbation
/// partitions that persist between degenerate iterations.
#[derive(Debug, Clone)]
pub struct PrimalRatioTest {
    options: RatioTestOptions,
    working_tolerance: f64,
    pub(crate) wolfe: WolfeState,
}

impl PrimalRatioTest {
    /// Creates a session with the given options
    pub fn new(options: RatioTestOptions) -> Self {
        Self {
            options,
            working_tolerance: options.tolerances.feasibility / 2.0,
            wolfe: WolfeState::default(),
        }
    }

    /// Creates a session with default options
    pub fn with_defaults() -> Self {
        Self::new(RatioTestOptions::default())
    }

    /// The active options
    #[inline]
    pub fn options(&self) -> &RatioTestOptions {
        &self.options
    }

    /// Sign convention applied to `alpha` so the feasible step direction is
    /// a non-negative `t`; the signed step length is `sigma * t`
    #[inline]
    pub(crate) fn sigma(reduced_cost: f64) -> f64 {
        if reduced_cost > 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    /// Increment of the Expand working tolerance, also the numerator of the
    /// theta-min floor
    #[inline]
    pub(crate) fn tolerance_step(&self) -> f64 {
        self.options.tolerances.feasibility * self.options.expand_multiplier
            / self.options.expand_divider
    }

    /// Advances and returns the relaxation tolerance for this invocation
    ///
    /// `Expanding` grows it by one tolerance step per call and wraps back to
    /// half the feasibility tolerance when the full tolerance is reached;
    /// `Harris` keeps it pinned at the feasibility tolerance; `Inactive`
    /// yields zero.
    pub(crate) fn advance_expand_tolerance(&mut self) -> f64 {
        match self.options.expand {
            ExpandPolicy::Inactive => 0.0,
            ExpandPolicy::Harris => self.options.tolerances.feasibility,
            ExpandPolicy::Expanding => {
                let current = self.working_tolerance;
                self.working_tolerance += self.tolerance_step();
                if self.working_tolerance > self.options.tolerances.feasibility {
                    self.working_tolerance = self.options.tolerances.feasibility / 2.0;
                }
                current
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feasibility_classification() {
        let tol = 1e-8;
        assert_eq!(
            Feasibility::classify(-1.0, 0.0, 10.0, tol),
            Feasibility::BelowLower
        );
        assert_eq!(
            Feasibility::classify(5.0, 0.0, 10.0, tol),
            Feasibility::Feasible
        );
        assert_eq!(
            Feasibility::classify(10.0 + 1e-9, 0.0, 10.0, tol),
            Feasibility::Feasible
        );
        assert_eq!(
            Feasibility::classify(11.0, 0.0, 10.0, tol),
            Feasibility::AboveUpper
        );
    }

    #[test]
    fn test_sigma_sign_convention() {
        assert_eq!(PrimalRatioTest::sigma(3.0), -1.0);
        assert_eq!(PrimalRatioTest::sigma(-3.0), 1.0);
        assert_eq!(PrimalRatioTest::sigma(0.0), 1.0);
    }

    #[test]
    fn test_expand_tolerance_advances_and_wraps() {
        let options = RatioTestOptions {
            expand: ExpandPolicy::Expanding,
            tolerances: Tolerances {
                feasibility: 1e-6,
                ..Tolerances::default()
            },
            ..RatioTestOptions::default()
        };
        let mut test = PrimalRatioTest::new(options);
        let step = test.tolerance_step();
        assert_eq!(step, 1e-6 * 100.0 / 10_000.0);

        let first = test.advance_expand_tolerance();
        let second = test.advance_expand_tolerance();
        assert_eq!(first, 5e-7);
        assert!((second - (5e-7 + step)).abs() < 1e-20);

        // enough advances to hit the wrap
        let mut last = second;
        for _ in 0..200 {
            last = test.advance_expand_tolerance();
            assert!(last <= 1e-6);
        }
        assert!(last < 1e-6);
    }

    #[test]
    fn test_incoming_range() {
        assert_eq!(IncomingVariable::bounded(0.0, 8.0).range(), 8.0);
        assert!(IncomingVariable::free().range().is_infinite());
        assert!(IncomingVariable::lower_bounded(2.0).range().is_infinite());
    }
}
