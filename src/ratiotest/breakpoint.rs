//! Breakpoint collection for the primal ratio test
//!
//! The ratio test maximizes a piecewise-linear function of the step length;
//! every point where that function changes slope is a breakpoint owned by
//! one basic variable (or by the incoming variable's own bound range).
//! Breakpoints are appended unsorted during generation, finalized, and
//! sorted ascending exactly once per ratio-test invocation. After sorting
//! the sequence is append-only, except for the memoized objective value that
//! the scan fills in as it walks.

/// Owner of a ratio-test breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakpointOwner {
    /// A basic variable, identified by its basis row
    Basic(usize),
    /// The incoming variable's own bound range; reaching it means the step
    /// resolves into a bound flip instead of a basis change
    IncomingBound,
}

/// One slope change of the piecewise-linear ratio-test objective
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    /// Who hits a bound at this step length
    pub owner: BreakpointOwner,
    /// Step length at which the slope changes
    pub value: f64,
    /// Tolerance-relaxed threshold for Harris/Expand two-pass selection;
    /// equals `value` when no relaxation was requested
    pub second_pass_value: f64,
    /// Objective value at this breakpoint, memoized lazily during the scan
    pub functional_value: Option<f64>,
}

/// Collects, sorts, and serves the breakpoints of one ratio-test invocation
#[derive(Debug, Clone, Default)]
pub struct BreakpointHandler {
    breakpoints: Vec<Breakpoint>,
    finalized: bool,
    sorted: bool,
}

impl BreakpointHandler {
    /// Creates an empty handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty handler with room for `capacity` breakpoints
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            breakpoints: Vec::with_capacity(capacity),
            finalized: false,
            sorted: false,
        }
    }

    /// Appends a breakpoint; O(1) amortized
    pub fn insert(&mut self, owner: BreakpointOwner, value: f64) {
        self.insert_expanded(owner, value, value);
    }

    /// Appends a breakpoint carrying a tolerance-relaxed second-pass value
    pub fn insert_expanded(&mut self, owner: BreakpointOwner, value: f64, second_pass_value: f64) {
        debug_assert!(!self.finalized, "insert after finalize");
        self.breakpoints.push(Breakpoint {
            owner,
            value,
            second_pass_value,
            functional_value: None,
        });
    }

    /// Marks insertion complete; must precede [`init_sorting`](Self::init_sorting)
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    /// Stable-sorts the breakpoints ascending by value; ties keep insertion
    /// order. O(k log k).
    pub fn init_sorting(&mut self) {
        debug_assert!(self.finalized, "sort before finalize");
        self.breakpoints
            .sort_by(|a, b| a.value.total_cmp(&b.value));
        self.sorted = true;
    }

    /// Number of collected breakpoints
    #[inline]
    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    /// Returns true if no breakpoints were collected
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Read access into the (sorted) sequence
    #[inline]
    pub fn get(&self, position: usize) -> &Breakpoint {
        &self.breakpoints[position]
    }

    /// Memoizes the objective value at `position` for later backtracking
    #[inline]
    pub fn set_functional_value(&mut self, position: usize, objective: f64) {
        self.breakpoints[position].functional_value = Some(objective);
    }

    /// Smallest tolerance-relaxed threshold over all breakpoints
    ///
    /// This is the upper edge of the Harris/Expand selection window: any
    /// step up to it violates no basic variable by more than the relaxation
    /// tolerance. Infinity when the handler is empty.
    pub fn second_pass_window(&self) -> f64 {
        self.breakpoints
            .iter()
            .map(|bp| bp.second_pass_value)
            .fold(f64::INFINITY, f64::min)
    }

    /// Positions of the breakpoints inside the tolerance-relaxed window
    ///
    /// Callers pick the candidate with the largest pivot magnitude from this
    /// set instead of blindly taking the minimum ratio.
    pub fn second_pass_candidates(&self, window: f64) -> Vec<usize> {
        debug_assert!(self.sorted, "second pass before sorting");
        self.breakpoints
            .iter()
            .enumerate()
            .filter(|(_, bp)| bp.value <= window)
            .map(|(position, _)| position)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorting_is_ascending_and_stable() {
        let mut handler = BreakpointHandler::new();
        handler.insert(BreakpointOwner::Basic(0), 3.0);
        handler.insert(BreakpointOwner::Basic(1), 1.0);
        handler.insert(BreakpointOwner::Basic(2), 3.0);
        handler.insert(BreakpointOwner::IncomingBound, 0.5);
        handler.finalize();
        handler.init_sorting();

        for position in 1..handler.len() {
            assert!(handler.get(position - 1).value <= handler.get(position).value);
        }
        // the two value-3.0 breakpoints keep insertion order
        assert_eq!(handler.get(2).owner, BreakpointOwner::Basic(0));
        assert_eq!(handler.get(3).owner, BreakpointOwner::Basic(2));
    }

    #[test]
    fn test_functional_value_memoization() {
        let mut handler = BreakpointHandler::new();
        handler.insert(BreakpointOwner::Basic(0), 1.0);
        handler.finalize();
        handler.init_sorting();
        assert_eq!(handler.get(0).functional_value, None);
        handler.set_functional_value(0, -4.5);
        assert_eq!(handler.get(0).functional_value, Some(-4.5));
    }

    #[test]
    fn test_second_pass_window_and_candidates() {
        let mut handler = BreakpointHandler::new();
        handler.insert_expanded(BreakpointOwner::Basic(0), 1.0, 1.1);
        handler.insert_expanded(BreakpointOwner::Basic(1), 0.51, 0.56);
        handler.insert_expanded(BreakpointOwner::Basic(2), 0.5, 0.6);
        handler.finalize();
        handler.init_sorting();

        let window = handler.second_pass_window();
        assert_eq!(window, 0.56);
        let candidates = handler.second_pass_candidates(window);
        // 0.5 and 0.51 are inside the window, 1.0 is not
        assert_eq!(candidates.len(), 2);
        for position in candidates {
            assert!(handler.get(position).value <= window);
        }
    }

    #[test]
    fn test_empty_window_is_infinite() {
        let handler = BreakpointHandler::new();
        assert_eq!(handler.second_pass_window(), f64::INFINITY);
    }
}
