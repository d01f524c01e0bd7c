//! Bijective zigzag scan between an S x S grid and a length-S^2 sequence.
//!
//! Both directions walk the identical alternating-diagonal path, so
//! scanning then un-scanning any grid reproduces it exactly.

use super::dct::CoefficientGrid;

/// Yields grid positions along the diagonal scan path.
fn scan_positions(size: usize) -> impl Iterator<Item = (usize, usize)> {
    let mut i = 0usize;
    let mut j = 0usize;
    let mut up = false;
    let mut emitted = 0usize;
    std::iter::from_fn(move || {
        if emitted == size * size {
            return None;
        }
        let pos = (i, j);
        emitted += 1;

        if up {
            if j == size - 1 {
                i += 1;
                up = false;
            } else if i == 0 {
                j += 1;
                up = false;
            } else {
                i -= 1;
                j += 1;
            }
        } else if i == size - 1 {
            j += 1;
            up = true;
        } else if j == 0 {
            i += 1;
            up = true;
        } else {
            i += 1;
            j -= 1;
        }

        Some(pos)
    })
}

/// Linearizes a grid into its diagonal-scan sequence.
pub fn zigzag_scan(grid: &CoefficientGrid) -> Vec<f64> {
    let size = grid.len();
    scan_positions(size).map(|(i, j)| grid[i][j]).collect()
}

/// Rebuilds a `size` x `size` grid from its diagonal-scan sequence.
/// Sequences shorter than `size^2` leave the remaining cells at zero.
pub fn zigzag_unscan(sequence: &[f64], size: usize) -> CoefficientGrid {
    let mut grid = vec![vec![0.0; size]; size];
    for ((i, j), &value) in scan_positions(size).zip(sequence.iter()) {
        grid[i][j] = value;
    }
    grid
}
