//! Minimum-cost one-to-one assignment between two finite sets of positions.
//!
//! Builds an `M × N` Euclidean distance matrix and solves it with the
//! Kuhn-Munkres (Hungarian) algorithm. A solved pair is only accepted if its
//! distance is below `max_distance`; this is what stops a real object that
//! vanished from being "teleported" onto an unrelated detection far away.
//!
//! `pathfinding`'s implementation requires an ordered, integer-friendly
//! weight type and a square matrix, so distances are scaled and rounded to
//! `i64` and the matrix is padded with a sentinel cost that never survives
//! the `max_distance` cutoff.

use crate::geometry::euclidean;
use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;

const SCALE: f64 = 1024.0;
const SENTINEL: i64 = i64::MAX / 4;

/// Solve assignment between `rows` current positions and `cols` candidate
/// centroids. Returns accepted `(row, col)` pairs, sorted ascending by row
/// then col so that downstream tie-break (ascending track id, ascending
/// detection index) falls out of iteration order alone.
pub fn solve(
    row_positions: &[(i32, i32)],
    col_positions: &[(i32, i32)],
    max_distance: f64,
) -> Vec<(usize, usize)> {
    let rows = row_positions.len();
    let cols = col_positions.len();
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    let n = rows.max(cols);
    let mut data = vec![SENTINEL; n * n];
    for (i, rp) in row_positions.iter().enumerate() {
        for (j, cp) in col_positions.iter().enumerate() {
            data[i * n + j] = (euclidean(*rp, *cp) * SCALE).round() as i64;
        }
    }
    let matrix = Matrix::from_vec(n, n, data).expect("matrix is always square by construction");
    let (_, assignment) = kuhn_munkres_min(&matrix);

    let mut pairs = Vec::with_capacity(rows.min(cols));
    for (row, &col) in assignment.iter().enumerate() {
        if row >= rows || col >= cols {
            continue; // padding row/col, not a real pair
        }
        let dist = euclidean(row_positions[row], col_positions[col]);
        if dist < max_distance {
            pairs.push((row, col));
        }
    }
    pairs.sort_unstable();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_nearest_pair_within_cutoff() {
        let rows = [(0, 0), (100, 100)];
        let cols = [(2, 1), (98, 99)];
        let pairs = solve(&rows, &cols, 50.0);
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn rejects_pairs_past_max_distance() {
        let rows = [(0, 0)];
        let cols = [(500, 500)];
        let pairs = solve(&rows, &cols, 100.0);
        assert!(pairs.is_empty());
    }

    #[test]
    fn handles_rectangular_inputs() {
        let rows = [(0, 0)];
        let cols = [(1, 1), (900, 900)];
        let pairs = solve(&rows, &cols, 50.0);
        assert_eq!(pairs, vec![(0, 0)]);
    }

    #[test]
    fn empty_inputs_produce_no_pairs() {
        assert!(solve(&[], &[(1, 1)], 50.0).is_empty());
        assert!(solve(&[(1, 1)], &[], 50.0).is_empty());
    }
}
