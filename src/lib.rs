//! # pivr
//!
//! **Numerical pivoting core for primal simplex LP solvers.**
//!
//! pivr provides the two hardest pieces of a simplex implementation as a
//! reusable library: an adaptive sparse/dense vector with numerically
//! stabilized arithmetic, and the primal ratio test that selects which basic
//! variable leaves the basis each iteration.
//!
//! ## Components
//!
//! - **Stabilized scalars** ([`stable`]): tolerance-guarded addition that
//!   collapses cancellation noise to exact zeros, and pairwise summation
//!   that bounds accumulation error.
//! - **Adaptive vectors** ([`vector`]): a fixed-dimension vector that
//!   silently switches between dense and sparse storage at a configurable
//!   sparsity threshold, with element access, scaled addition, stabilized
//!   dot products, structural edits, and adaptive index sorting.
//! - **Ratio test** ([`ratiotest`]): phase-1 (infeasibility-driven) and
//!   phase-2 (optimality-driven) breakpoint scans with Harris/Expand
//!   tolerance relaxation and Wolfe's randomized anti-cycling perturbation.
//!
//! ## Quick Start
//!
//! ```
//! use pivr::prelude::*;
//!
//! let mut ctx = ArithmeticContext::new();
//! let mut direction = AdaptiveVector::from_slice(&[2.0, -1.0, 0.0]);
//! let correction = AdaptiveVector::from_slice(&[0.0, 1.0, 4.0]);
//! direction.add_vector(1.0, &correction, AddMode::Absolute, &mut ctx);
//! assert_eq!(direction.at(1), 0.0);
//! assert_eq!(direction.non_zeros(), 2);
//! ```
//!
//! ## Scope
//!
//! Model storage, presolve, basis factorization (FTRAN/BTRAN), and the
//! simplex main loop are deliberately out of scope: pivr consumes the
//! direction vector `alpha` and per-row bound metadata they produce, and
//! hands back the outgoing row, the step length, and the updated phase
//! objective. Execution is strictly single-threaded per solve; concurrent
//! solves each own their [`vector::ArithmeticContext`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ratiotest;
pub mod stable;
pub mod vector;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::ratiotest::{
        BasicVariable, Feasibility, IncomingVariable, PivotStep, PrimalRatioTest,
        RatioTestOptions, RatioTestOutcome, VariableType,
    };
    pub use crate::stable::{AddMode, Tolerances};
    pub use crate::vector::{AdaptiveVector, ArithmeticContext, StorageMode, VectorPolicy};
}
