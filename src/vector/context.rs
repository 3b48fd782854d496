//! Scratch-buffer context for vector arithmetic
//!
//! Sparse-sparse addition, unsorted dot products, and counting sort all need
//! a full-length dense scatter buffer plus a mark buffer. Rather than hiding
//! those in process-wide thread-static state, they live in an explicit
//! [`ArithmeticContext`] that callers pass `&mut` into the operations that
//! need scratch space. One context per solve (or per worker thread) makes
//! concurrent solves safe by construction; nothing in this crate locks.
//!
//! Invariant: between calls, `scratch` is all-zero and `mark` is all-false.
//! Every operation that scatters is responsible for re-zeroing exactly the
//! entries it touched on its way out; debug builds assert the invariant on
//! entry.

use crate::stable::Tolerances;

/// Reusable scratch state for [`AdaptiveVector`](super::AdaptiveVector)
/// operations
///
/// Owns the dense scatter buffer, the counting-sort/scatter mark buffer, and
/// the tolerance bundle applied by stabilized arithmetic. Buffers grow lazily
/// to the largest dimension seen and are never shrunk.
#[derive(Debug, Clone)]
pub struct ArithmeticContext {
    pub(crate) scratch: Vec<f64>,
    pub(crate) mark: Vec<bool>,
    tolerances: Tolerances,
}

impl ArithmeticContext {
    /// Creates a context with default tolerances and empty buffers
    pub fn new() -> Self {
        Self::with_tolerances(Tolerances::default())
    }

    /// Creates a context with the given tolerance bundle
    pub fn with_tolerances(tolerances: Tolerances) -> Self {
        Self {
            scratch: Vec::new(),
            mark: Vec::new(),
            tolerances,
        }
    }

    /// Returns the tolerance bundle applied by stabilized operations
    #[inline]
    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Replaces the tolerance bundle
    pub fn set_tolerances(&mut self, tolerances: Tolerances) {
        self.tolerances = tolerances;
    }

    /// Current capacity of the scatter buffers, in logical indices
    #[inline]
    pub fn capacity(&self) -> usize {
        self.scratch.len()
    }

    /// Grows the scatter buffers to cover `dimension` indices
    pub(crate) fn ensure_dimension(&mut self, dimension: usize) {
        if self.scratch.len() < dimension {
            self.scratch.resize(dimension, 0.0);
            self.mark.resize(dimension, false);
        }
    }

    /// Asserts the clean-buffer invariant over the first `dimension` slots
    ///
    /// Compiled out of release builds; scatter/gather bugs show up here
    /// rather than as silently corrupted arithmetic two calls later.
    pub(crate) fn debug_assert_clean(&self, dimension: usize) {
        if cfg!(debug_assertions) {
            let limit = dimension.min(self.scratch.len());
            debug_assert!(
                self.scratch[..limit].iter().all(|&v| v == 0.0),
                "scatter buffer left dirty by a previous operation"
            );
            debug_assert!(
                !self.mark[..limit].iter().any(|&m| m),
                "mark buffer left dirty by a previous operation"
            );
        }
    }
}

impl Default for ArithmeticContext {
    fn default() -> Self {
        Self::new()
    }
}
