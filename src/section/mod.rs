//! Section engine (component C7): the four on-disk section kinds and
//! their collective read/write protocols. Every function here operates
//! on a [`crate::context::FileContext`] and follows spec.md §4.7's rule
//! that all non-payload parameters are identical on every rank; only the
//! local payload (and, for `V`, the local element sizes) may differ.

pub mod array;
pub mod block;
pub mod header;
pub mod inline;
pub mod varray;

pub use header::{SectionDims, SectionHeader, SectionKind};

use crate::collective::scan_counts;

/// Computes each rank's byte offset and length within a partitioned
/// payload given the per-rank element counts and a fixed element size,
/// per spec.md §4.7 "Fixed array" partitioning rule:
/// `S_p = S * sum_{q<p} C_q`.
pub fn partition_byte_ranges(counts: &[u64], elem_size: u64) -> Vec<(u64, u64)> {
    let offsets = scan_counts(counts);
    counts
        .iter()
        .enumerate()
        .map(|(p, &c)| (offsets[p] * elem_size, c * elem_size))
        .collect()
}
