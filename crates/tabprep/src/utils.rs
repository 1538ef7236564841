//! Shared helpers used across profiling, reporting and the pipeline.

use crate::value::{Cell, CellKey};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;

// =============================================================================
// Sampling
// =============================================================================

/// Indices of a deterministic sample of `limit` positions out of `len`.
///
/// Returns every index when `len <= limit`. Sampled indices are sorted, so
/// the sample keeps the original order.
pub fn sample_indices(len: usize, limit: usize, seed: u64) -> Vec<usize> {
    if len <= limit {
        return (0..len).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices = rand::seq::index::sample(&mut rng, len, limit).into_vec();
    indices.sort_unstable();
    indices
}

/// Deterministic sample of a slice, in original order.
pub fn sample_values<T: Clone>(values: &[T], limit: usize, seed: u64) -> Vec<T> {
    sample_indices(values.len(), limit, seed)
        .into_iter()
        .map(|i| values[i].clone())
        .collect()
}

// =============================================================================
// Counting
// =============================================================================

/// Share of `part` in `total` as a percentage; `0` when `total` is zero.
#[inline]
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Score in `[0, 100]` for `good` out of `total`; `100` when `total` is zero.
#[inline]
pub fn score(good: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        good as f64 / total as f64 * 100.0
    }
}

/// Frequency of each non-missing value, keyed in first-appearance order.
///
/// Each entry keeps the first cell seen for its key.
pub fn value_counts<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> IndexMap<CellKey, (&'a Cell, usize)> {
    let mut counts: IndexMap<CellKey, (&Cell, usize)> = IndexMap::new();
    for cell in cells.into_iter().filter(|c| !c.is_missing()) {
        counts.entry(cell.key(false)).or_insert((cell, 0)).1 += 1;
    }
    counts
}

/// Most frequent values, frequency descending and ties by first appearance.
pub fn top_values<'a>(cells: impl IntoIterator<Item = &'a Cell>, k: usize) -> Vec<(&'a Cell, usize)> {
    let mut ranked: Vec<(&Cell, usize)> = value_counts(cells).into_values().collect();
    // Stable sort keeps first-appearance order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(k);
    ranked
}

// =============================================================================
// Tests
// =============================================================================
