//! Sparse-index sorting with adaptive algorithm selection
//!
//! Sorting a sparse vector's parallel value/index arrays unlocks binary
//! search in `at` and the O(n1 + n2) merge path in `dot_product`. No single
//! sort wins across the workloads the solver produces, so the algorithm is
//! chosen from a cost estimate over the nonzero count and the index value
//! range. The selection function is exposed separately from the sorts so it
//! can be unit-tested against the cost model without touching any data.

use super::{AdaptiveVector, ArithmeticContext, Storage};

/// Nonzero count at or below which selection sort's minimal element moves win
const SELECTION_CUTOFF: usize = 8;

/// Nonzero count at or below which insertion sort beats the O(n log n) sorts
const INSERTION_CUTOFF: usize = 64;

/// Sorting strategy for a sparse vector's index array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortAlgorithm {
    /// O(n²) comparisons, O(n) element moves; best for a handful of entries
    Selection,
    /// O(n²) worst case, O(n + inversions) in practice; best for small or
    /// nearly-sorted arrays
    Insertion,
    /// O(range + n); best when the occupied index range is tight
    Counting,
    /// O(n log n) worst case, in place; the fallback for everything else
    Heap,
}

/// Chooses a sorting strategy from the nonzero count and index value range
///
/// The estimate charges counting sort one unit per index in the occupied
/// range plus the scatter/gather passes, and heap sort its comparison bound.
/// Tiny inputs skip the estimate: below [`SELECTION_CUTOFF`] entries the
/// dominant cost is moving the paired value/index elements, which selection
/// sort minimizes; up to [`INSERTION_CUTOFF`] entries insertion sort's cache
/// behavior wins regardless of the model.
pub fn choose_sort_algorithm(nonzeros: usize, index_range: usize) -> SortAlgorithm {
    if nonzeros <= SELECTION_CUTOFF {
        return SortAlgorithm::Selection;
    }
    if nonzeros <= INSERTION_CUTOFF {
        return SortAlgorithm::Insertion;
    }
    let counting_cost = index_range + 2 * nonzeros;
    let log2 = (usize::BITS - nonzeros.leading_zeros()) as usize;
    let heap_cost = 2 * nonzeros * log2;
    if counting_cost <= heap_cost {
        SortAlgorithm::Counting
    } else {
        SortAlgorithm::Heap
    }
}

impl AdaptiveVector {
    /// Sorts sparse storage ascending by index; no-op for dense storage
    ///
    /// The strategy comes from [`choose_sort_algorithm`]; counting sort
    /// borrows the context's scratch and mark buffers. On return the
    /// `sorted` flag is set and `at` answers by binary search.
    pub fn sort_elements(&mut self, ctx: &mut ArithmeticContext) {
        let Storage::Sparse {
            values,
            indices,
            sorted,
        } = &mut self.storage
        else {
            return;
        };
        if *sorted || indices.len() <= 1 {
            *sorted = true;
            return;
        }
        let mut min = indices[0];
        let mut max = indices[0];
        for &index in indices.iter() {
            min = min.min(index);
            max = max.max(index);
        }
        match choose_sort_algorithm(indices.len(), max - min + 1) {
            SortAlgorithm::Selection => selection_sort(values, indices),
            SortAlgorithm::Insertion => insertion_sort(values, indices),
            SortAlgorithm::Counting => counting_sort(values, indices, ctx, min, max),
            SortAlgorithm::Heap => heap_sort(values, indices),
        }
        *sorted = true;
    }
}

/// Selection sort over the paired arrays: n²/2 comparisons, at most n swaps
fn selection_sort(values: &mut [f64], indices: &mut [usize]) {
    for slot in 0..indices.len() {
        let mut smallest = slot;
        for probe in slot + 1..indices.len() {
            if indices[probe] < indices[smallest] {
                smallest = probe;
            }
        }
        if smallest != slot {
            indices.swap(slot, smallest);
            values.swap(slot, smallest);
        }
    }
}

/// Insertion sort over the paired arrays
fn insertion_sort(values: &mut [f64], indices: &mut [usize]) {
    for sorted_end in 1..indices.len() {
        let key_index = indices[sorted_end];
        let key_value = values[sorted_end];
        let mut slot = sorted_end;
        while slot > 0 && indices[slot - 1] > key_index {
            indices[slot] = indices[slot - 1];
            values[slot] = values[slot - 1];
            slot -= 1;
        }
        indices[slot] = key_index;
        values[slot] = key_value;
    }
}

/// Counting sort: scatter into the context buffers, gather ascending
///
/// Indices are unique by the sparse-storage invariant, so one mark bit per
/// slot is enough. Touched scratch entries are re-zeroed during the gather.
fn counting_sort(
    values: &mut [f64],
    indices: &mut [usize],
    ctx: &mut ArithmeticContext,
    min: usize,
    max: usize,
) {
    ctx.ensure_dimension(max + 1);
    ctx.debug_assert_clean(max + 1);
    for (pos, &index) in indices.iter().enumerate() {
        ctx.scratch[index] = values[pos];
        ctx.mark[index] = true;
    }
    let mut write = 0;
    for index in min..=max {
        if ctx.mark[index] {
            ctx.mark[index] = false;
            indices[write] = index;
            values[write] = ctx.scratch[index];
            ctx.scratch[index] = 0.0;
            write += 1;
        }
    }
    debug_assert_eq!(write, indices.len(), "counting sort lost entries");
}

/// In-place heap sort over the paired arrays, keyed by index
fn heap_sort(values: &mut [f64], indices: &mut [usize]) {
    let len = indices.len();
    for start in (0..len / 2).rev() {
        sift_down(values, indices, start, len);
    }
    for end in (1..len).rev() {
        indices.swap(0, end);
        values.swap(0, end);
        sift_down(values, indices, 0, end);
    }
}

fn sift_down(values: &mut [f64], indices: &mut [usize], start: usize, end: usize) {
    let mut root = start;
    loop {
        let left = 2 * root + 1;
        if left >= end {
            break;
        }
        let mut child = left;
        if left + 1 < end && indices[left + 1] > indices[left] {
            child = left + 1;
        }
        if indices[root] >= indices[child] {
            break;
        }
        indices.swap(root, child);
        values.swap(root, child);
        root = child;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrambled(n: usize, stride: usize, modulus: usize) -> (Vec<f64>, Vec<usize>) {
        // stride coprime to modulus visits every residue once
        let indices: Vec<usize> = (0..n).map(|i| (i * stride) % modulus).collect();
        let values: Vec<f64> = indices.iter().map(|&i| i as f64 + 0.5).collect();
        (values, indices)
    }

    fn assert_sorted_and_paired(values: &[f64], indices: &[usize]) {
        for pair in indices.windows(2) {
            assert!(pair[0] < pair[1], "indices not strictly ascending");
        }
        for (pos, &index) in indices.iter().enumerate() {
            assert_eq!(values[pos], index as f64 + 0.5, "value lost its index");
        }
    }

    #[test]
    fn test_choose_sort_algorithm_cutoffs() {
        assert_eq!(choose_sort_algorithm(3, 1000), SortAlgorithm::Selection);
        assert_eq!(choose_sort_algorithm(8, 8), SortAlgorithm::Selection);
        assert_eq!(choose_sort_algorithm(9, 1000), SortAlgorithm::Insertion);
        assert_eq!(choose_sort_algorithm(64, 64), SortAlgorithm::Insertion);
        // tight range: counting wins
        assert_eq!(choose_sort_algorithm(1000, 1200), SortAlgorithm::Counting);
        // huge range relative to the population: heap wins
        assert_eq!(
            choose_sort_algorithm(100, 1_000_000),
            SortAlgorithm::Heap
        );
    }

    #[test]
    fn test_each_sort_orders_paired_arrays() {
        for sort in [
            selection_sort as fn(&mut [f64], &mut [usize]),
            insertion_sort,
            heap_sort,
        ] {
            let (mut values, mut indices) = scrambled(97, 31, 97);
            sort(&mut values, &mut indices);
            assert_sorted_and_paired(&values, &indices);
        }
    }

    #[test]
    fn test_counting_sort_cleans_context() {
        let mut ctx = ArithmeticContext::new();
        let (mut values, mut indices) = scrambled(97, 31, 97);
        counting_sort(&mut values, &mut indices, &mut ctx, 0, 96);
        assert_sorted_and_paired(&values, &indices);
        ctx.debug_assert_clean(97);
    }

    #[test]
    fn test_already_sorted_input_is_stable() {
        let mut values = vec![1.0, 2.0, 3.0];
        let mut indices = vec![2, 5, 9];
        insertion_sort(&mut values, &mut indices);
        assert_eq!(indices, vec![2, 5, 9]);
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }
}
