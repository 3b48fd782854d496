//! Vector arithmetic: scaled addition and stabilized dot products
//!
//! `add_vector` computes `self += lambda * other` and dispatches to one of
//! four specialized paths chosen by both operands' storage modes. The
//! sparse+sparse path scatters the right-hand operand into the context's
//! dense scratch buffer and gathers the merged result back, avoiding the
//! O(n²) cost of repeated positional lookups.
//!
//! `dot_product` accumulates through a sign-separated pairwise summer
//! instead of a naive left-to-right sum, so long cancellation-heavy inner
//! products keep their leading digits. Sorted sparse operands merge by index
//! in O(n1 + n2); unsorted pairs scatter the smaller operand.

use crate::stable::{self, AddMode, SignedSummer};

use super::{AdaptiveVector, ArithmeticContext, Storage, StorageMode};

impl AdaptiveVector {
    /// Computes `self += lambda * other` under the given summation discipline
    ///
    /// Both vectors must share the same dimension (`debug_assert`ed). The
    /// nonzero-count invariant is maintained entry by entry, and the storage
    /// mode is re-checked once at the end.
    pub fn add_vector(
        &mut self,
        lambda: f64,
        other: &AdaptiveVector,
        mode: AddMode,
        ctx: &mut ArithmeticContext,
    ) {
        debug_assert_eq!(
            self.dimension,
            other.dimension,
            "dimension mismatch in add_vector"
        );
        if lambda == 0.0 || other.non_zeros() == 0 {
            return;
        }
        match (self.storage_mode(), other.storage_mode()) {
            (StorageMode::Dense, StorageMode::Dense) => {
                self.add_dense_dense(lambda, other, mode, ctx);
            }
            (StorageMode::Dense, StorageMode::Sparse) => {
                self.add_dense_sparse(lambda, other, mode, ctx);
            }
            (StorageMode::Sparse, StorageMode::Dense) => {
                self.add_sparse_dense(lambda, other, mode, ctx);
            }
            (StorageMode::Sparse, StorageMode::Sparse) => {
                self.add_sparse_sparse(lambda, other, mode, ctx);
            }
        }
        self.update_storage_mode();
    }

    fn add_dense_dense(
        &mut self,
        lambda: f64,
        other: &AdaptiveVector,
        mode: AddMode,
        ctx: &ArithmeticContext,
    ) {
        let tolerances = *ctx.tolerances();
        let (
            Storage::Dense { values, nonzeros },
            Storage::Dense {
                values: other_values,
                ..
            },
        ) = (&mut self.storage, &other.storage)
        else {
            unreachable!("dispatched on storage modes");
        };
        for (slot, &rhs) in values.iter_mut().zip(other_values.iter()) {
            if rhs == 0.0 {
                continue;
            }
            let old = *slot;
            let new = stable::add(old, lambda * rhs, mode, &tolerances);
            if old != 0.0 && new == 0.0 {
                *nonzeros -= 1;
            } else if old == 0.0 && new != 0.0 {
                *nonzeros += 1;
            }
            *slot = new;
        }
    }

    fn add_dense_sparse(
        &mut self,
        lambda: f64,
        other: &AdaptiveVector,
        mode: AddMode,
        ctx: &ArithmeticContext,
    ) {
        let tolerances = *ctx.tolerances();
        let (
            Storage::Dense { values, nonzeros },
            Storage::Sparse {
                values: other_values,
                indices: other_indices,
                ..
            },
        ) = (&mut self.storage, &other.storage)
        else {
            unreachable!("dispatched on storage modes");
        };
        for (pos, &index) in other_indices.iter().enumerate() {
            let old = values[index];
            let new = stable::add(old, lambda * other_values[pos], mode, &tolerances);
            if old != 0.0 && new == 0.0 {
                *nonzeros -= 1;
            } else if old == 0.0 && new != 0.0 {
                *nonzeros += 1;
            }
            values[index] = new;
        }
    }

    /// Sparse target, dense operand: the result is usually dense, so the
    /// sparse entries are scattered into a fresh full-length buffer and the
    /// operand folded in with one pass over the dimension.
    fn add_sparse_dense(
        &mut self,
        lambda: f64,
        other: &AdaptiveVector,
        mode: AddMode,
        ctx: &ArithmeticContext,
    ) {
        let tolerances = *ctx.tolerances();
        let (
            Storage::Sparse {
                values, indices, ..
            },
            Storage::Dense {
                values: other_values,
                ..
            },
        ) = (&self.storage, &other.storage)
        else {
            unreachable!("dispatched on storage modes");
        };
        let mut buffer = Vec::with_capacity(self.dimension + self.policy.elbow_room);
        buffer.resize(self.dimension, 0.0);
        for (pos, &index) in indices.iter().enumerate() {
            buffer[index] = values[pos];
        }
        let mut nonzeros = 0;
        for (slot, &rhs) in buffer.iter_mut().zip(other_values.iter()) {
            if rhs != 0.0 {
                *slot = stable::add(*slot, lambda * rhs, mode, &tolerances);
            }
            if *slot != 0.0 {
                nonzeros += 1;
            }
        }
        self.storage = Storage::Dense {
            values: buffer,
            nonzeros,
        };
    }

    /// Sparse target, sparse operand: scatter the operand into the context's
    /// scratch buffer, merge the overlap in place, append the rest, and
    /// re-zero every touched scratch slot on the way out.
    fn add_sparse_sparse(
        &mut self,
        lambda: f64,
        other: &AdaptiveVector,
        mode: AddMode,
        ctx: &mut ArithmeticContext,
    ) {
        ctx.ensure_dimension(self.dimension);
        ctx.debug_assert_clean(self.dimension);
        let tolerances = *ctx.tolerances();
        let (
            Storage::Sparse {
                values,
                indices,
                sorted,
            },
            Storage::Sparse {
                values: other_values,
                indices: other_indices,
                ..
            },
        ) = (&mut self.storage, &other.storage)
        else {
            unreachable!("dispatched on storage modes");
        };

        for (pos, &index) in other_indices.iter().enumerate() {
            ctx.scratch[index] = other_values[pos];
            ctx.mark[index] = true;
        }

        // merge the overlap; dropping cancelled entries preserves order
        let mut write = 0;
        for read in 0..indices.len() {
            let index = indices[read];
            let value = if ctx.mark[index] {
                ctx.mark[index] = false;
                let merged =
                    stable::add(values[read], lambda * ctx.scratch[index], mode, &tolerances);
                ctx.scratch[index] = 0.0;
                merged
            } else {
                values[read]
            };
            if value != 0.0 {
                indices[write] = index;
                values[write] = value;
                write += 1;
            }
        }
        indices.truncate(write);
        values.truncate(write);

        // gather the operand-only entries and clean the scratch
        let mut still_sorted = *sorted;
        for (pos, &index) in other_indices.iter().enumerate() {
            if ctx.mark[index] {
                ctx.mark[index] = false;
                ctx.scratch[index] = 0.0;
                let value = stable::add(0.0, lambda * other_values[pos], mode, &tolerances);
                if value != 0.0 {
                    if let Some(&last) = indices.last() {
                        still_sorted = still_sorted && last < index;
                    }
                    indices.push(index);
                    values.push(value);
                }
            }
        }
        *sorted = still_sorted;
    }

    /// Computes the inner product of `self` and `other`
    ///
    /// Accumulation is sign-separated and pairwise (see
    /// [`SignedSummer`]); the `mode` guards apply once, to the combined
    /// total. Sorted sparse operands merge by index; an unsorted sparse pair
    /// scatters the smaller operand into the context's scratch buffer.
    pub fn dot_product(
        &self,
        other: &AdaptiveVector,
        mode: AddMode,
        ctx: &mut ArithmeticContext,
    ) -> f64 {
        debug_assert_eq!(
            self.dimension,
            other.dimension,
            "dimension mismatch in dot_product"
        );
        let mut summer = SignedSummer::new();
        match (&self.storage, &other.storage) {
            (
                Storage::Dense { values: a, .. },
                Storage::Dense { values: b, .. },
            ) => {
                for (&x, &y) in a.iter().zip(b.iter()) {
                    summer.push(x * y);
                }
            }
            (
                Storage::Dense { values: dense, .. },
                Storage::Sparse {
                    values, indices, ..
                },
            )
            | (
                Storage::Sparse {
                    values, indices, ..
                },
                Storage::Dense { values: dense, .. },
            ) => {
                for (pos, &index) in indices.iter().enumerate() {
                    summer.push(values[pos] * dense[index]);
                }
            }
            (
                Storage::Sparse {
                    values: a_values,
                    indices: a_indices,
                    sorted: a_sorted,
                },
                Storage::Sparse {
                    values: b_values,
                    indices: b_indices,
                    sorted: b_sorted,
                },
            ) => {
                if *a_sorted && *b_sorted {
                    merge_product(
                        a_values, a_indices, b_values, b_indices, &mut summer,
                    );
                } else {
                    scatter_product(
                        a_values, a_indices, b_values, b_indices, ctx, &mut summer,
                    );
                }
            }
        }
        summer.finish(mode, ctx.tolerances())
    }
}

/// O(n1 + n2) two-pointer merge over sorted index arrays
fn merge_product(
    a_values: &[f64],
    a_indices: &[usize],
    b_values: &[f64],
    b_indices: &[usize],
    summer: &mut SignedSummer,
) {
    let mut a = 0;
    let mut b = 0;
    while a < a_indices.len() && b < b_indices.len() {
        match a_indices[a].cmp(&b_indices[b]) {
            std::cmp::Ordering::Less => a += 1,
            std::cmp::Ordering::Greater => b += 1,
            std::cmp::Ordering::Equal => {
                summer.push(a_values[a] * b_values[b]);
                a += 1;
                b += 1;
            }
        }
    }
}

/// Scatters the smaller operand and streams the larger one past it
fn scatter_product(
    a_values: &[f64],
    a_indices: &[usize],
    b_values: &[f64],
    b_indices: &[usize],
    ctx: &mut ArithmeticContext,
    summer: &mut SignedSummer,
) {
    let (small_values, small_indices, large_values, large_indices) =
        if a_indices.len() <= b_indices.len() {
            (a_values, a_indices, b_values, b_indices)
        } else {
            (b_values, b_indices, a_values, a_indices)
        };
    let needed = small_indices.iter().copied().max().map_or(0, |m| m + 1);
    ctx.ensure_dimension(needed);
    ctx.debug_assert_clean(needed);
    for (pos, &index) in small_indices.iter().enumerate() {
        ctx.scratch[index] = small_values[pos];
        ctx.mark[index] = true;
    }
    for (pos, &index) in large_indices.iter().enumerate() {
        if index < needed && ctx.mark[index] {
            summer.push(large_values[pos] * ctx.scratch[index]);
        }
    }
    for &index in small_indices {
        ctx.scratch[index] = 0.0;
        ctx.mark[index] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{StorageMode, VectorPolicy};

    fn always_sparse() -> VectorPolicy {
        VectorPolicy {
            sparsity_ratio: 2.0,
            elbow_room: 5,
        }
    }

    fn sparse_from(dimension: usize, entries: &[(usize, f64)]) -> AdaptiveVector {
        let mut v =
            AdaptiveVector::with_policy(dimension, StorageMode::Sparse, always_sparse());
        for &(index, value) in entries {
            v.set(index, value);
        }
        v
    }

    #[test]
    fn test_add_dense_dense_tracks_nonzeros() {
        let mut ctx = ArithmeticContext::new();
        let mut a = AdaptiveVector::from_slice(&[1.0, 0.0, 2.0]);
        let b = AdaptiveVector::from_slice(&[1.0, 3.0, -2.0]);
        a.add_vector(1.0, &b, AddMode::Fast, &mut ctx);
        assert_eq!(a.at(0), 2.0);
        assert_eq!(a.at(1), 3.0);
        assert_eq!(a.at(2), 0.0);
        assert_eq!(a.non_zeros(), 2);
    }

    #[test]
    fn test_add_sparse_sparse_merges_and_cleans_scratch() {
        let mut ctx = ArithmeticContext::new();
        let mut a = sparse_from(10, &[(1, 2.0), (5, -1.0)]);
        let b = sparse_from(10, &[(5, 1.0), (7, 4.0)]);
        a.add_vector(1.0, &b, AddMode::Absolute, &mut ctx);
        assert_eq!(a.at(1), 2.0);
        assert_eq!(a.at(5), 0.0);
        assert_eq!(a.at(7), 4.0);
        assert_eq!(a.non_zeros(), 2);
        // scratch invariant holds for the next operation
        ctx.debug_assert_clean(10);
    }

    #[test]
    fn test_dot_product_merge_and_scatter_agree() {
        let mut ctx = ArithmeticContext::new();
        let sorted_a = sparse_from(12, &[(0, 1.0), (4, 2.0), (9, -3.0)]);
        let sorted_b = sparse_from(12, &[(4, 5.0), (9, 1.0), (11, 7.0)]);
        assert!(sorted_a.is_sorted() && sorted_b.is_sorted());
        let merged = sorted_a.dot_product(&sorted_b, AddMode::Fast, &mut ctx);

        // force the scatter path with an unsorted copy of a
        let unsorted_a = sparse_from(12, &[(9, -3.0), (0, 1.0), (4, 2.0)]);
        assert!(!unsorted_a.is_sorted());
        let scattered = unsorted_a.dot_product(&sorted_b, AddMode::Fast, &mut ctx);

        assert_eq!(merged, 7.0);
        assert_eq!(scattered, 7.0);
        ctx.debug_assert_clean(12);
    }

    #[test]
    fn test_dot_product_mixed_modes() {
        let mut ctx = ArithmeticContext::new();
        let dense = AdaptiveVector::from_slice(&[1.0, 2.0, 0.0, 4.0]);
        let sparse = sparse_from(4, &[(1, 3.0), (3, -1.0)]);
        assert_eq!(dense.dot_product(&sparse, AddMode::Fast, &mut ctx), 2.0);
        assert_eq!(sparse.dot_product(&dense, AddMode::Fast, &mut ctx), 2.0);
    }
}
