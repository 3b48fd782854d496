//! Error types for pivr

use thiserror::Error;

/// Result type alias using pivr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a pivoting step
///
/// The taxonomy separates recoverable conditions (the caller switches
/// algorithmic path and continues the solve) from fatal classifications
/// of the problem itself. An empty breakpoint set is deliberately NOT an
/// error: the ratio test reports it as a normal
/// [`PivotStep::NoPivot`](crate::ratiotest::PivotStep::NoPivot) outcome
/// and leaves the optimality/unboundedness verdict to the simplex loop.
#[derive(Error, Debug)]
pub enum Error {
    /// A basic variable violated its bounds during Wolfe setup or perturbation
    ///
    /// Recoverable: the caller must abandon Wolfe's anti-cycling method for
    /// this iteration and retry with the ordinary ratio test (or another
    /// algorithmic path). The perturbation state has already been cleared
    /// when this error is returned.
    #[error(
        "basic variable in row {row} is outside its bounds by {violation:.6e}; \
         abandoning Wolfe perturbation"
    )]
    WolfeFallback {
        /// Basis row of the offending variable
        row: usize,
        /// Magnitude of the bound violation, beyond the feasibility tolerance
        violation: f64,
    },

    /// The problem was classified as primal infeasible
    ///
    /// Fatal. Never raised by the ratio test itself; defined here so the
    /// collaborating simplex loop has a named destination for the
    /// "no pivot in phase 1" signal when its own bookkeeping rules out a
    /// feasible basis.
    #[error("problem is primal infeasible")]
    Infeasible,

    /// The problem was classified as unbounded
    ///
    /// Fatal. Never raised by the ratio test itself; the simplex loop raises
    /// it when a "no pivot" outcome coincides with an unbounded improving
    /// direction.
    #[error("problem is unbounded")]
    Unbounded,
}

impl Error {
    /// Returns true if the solve can continue on a different algorithmic path
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::WolfeFallback { .. })
    }
}
