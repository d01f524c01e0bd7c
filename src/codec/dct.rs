//! Forward and inverse 2-D DCT over square macroblocks.
//!
//! Orthonormal DCT-II with the 2/S scale folded in:
//! `coeff(u,v) = (2/S) * a(u) * a(v) * sum pixel(x,y) * cos(pi(2x+1)u/2S) * cos(pi(2y+1)v/2S)`
//! where `a(0) = 1/sqrt(2)` and `a(k>0) = 1`, generalized over the block
//! size. Implemented separably (1-D rows then 1-D columns), which is
//! numerically equivalent to the direct double sum at O(S^3) instead of
//! O(S^4) per channel.

use std::f64::consts::PI;

use crate::raster::{Image, Pixel};

/// S x S floating-point coefficients for one channel.
pub type CoefficientGrid = Vec<Vec<f64>>;

const INV_SQRT_2: f64 = 0.7071067811865475;

fn alpha(u: usize) -> f64 {
    if u == 0 {
        INV_SQRT_2
    } else {
        1.0
    }
}

fn dct_1d(input: &[f64], output: &mut [f64]) {
    let n = input.len();
    let scale = (2.0 / n as f64).sqrt();
    for (u, out) in output.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (x, &f) in input.iter().enumerate() {
            sum += f * (PI * (2 * x + 1) as f64 * u as f64 / (2.0 * n as f64)).cos();
        }
        *out = scale * alpha(u) * sum;
    }
}

fn idct_1d(input: &[f64], output: &mut [f64]) {
    let n = input.len();
    let scale = (2.0 / n as f64).sqrt();
    for (x, out) in output.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (u, &coeff) in input.iter().enumerate() {
            sum += alpha(u) * coeff * (PI * (2 * x + 1) as f64 * u as f64 / (2.0 * n as f64)).cos();
        }
        *out = scale * sum;
    }
}

fn transform_2d(grid: &CoefficientGrid, kernel: fn(&[f64], &mut [f64])) -> CoefficientGrid {
    let n = grid.len();
    let mut rows_done = vec![vec![0.0; n]; n];
    for (row, out) in grid.iter().zip(rows_done.iter_mut()) {
        kernel(row, out);
    }

    let mut result = vec![vec![0.0; n]; n];
    let mut column = vec![0.0; n];
    let mut transformed = vec![0.0; n];
    for j in 0..n {
        for i in 0..n {
            column[i] = rows_done[i][j];
        }
        kernel(&column, &mut transformed);
        for i in 0..n {
            result[i][j] = transformed[i];
        }
    }
    result
}

/// Forward DCT of one coefficient grid.
pub fn forward_dct_channel(grid: &CoefficientGrid) -> CoefficientGrid {
    transform_2d(grid, dct_1d)
}

/// Inverse DCT of one coefficient grid.
pub fn inverse_dct_channel(grid: &CoefficientGrid) -> CoefficientGrid {
    transform_2d(grid, idct_1d)
}

fn channel_grid<F: Fn(Pixel) -> i32>(block: &Image, f: F) -> CoefficientGrid {
    (0..block.height())
        .map(|i| (0..block.width()).map(|j| f(block.pixel(i, j)) as f64).collect())
        .collect()
}

/// Forward DCT of all three channels of a square macroblock.
pub fn forward_dct(block: &Image) -> [CoefficientGrid; 3] {
    [
        forward_dct_channel(&channel_grid(block, |p| p.r)),
        forward_dct_channel(&channel_grid(block, |p| p.g)),
        forward_dct_channel(&channel_grid(block, |p| p.b)),
    ]
}

/// Inverse DCT of three per-channel grids back into a macroblock,
/// rounding each channel to the nearest integer.
pub fn inverse_dct(coeffs: &[CoefficientGrid; 3]) -> Image {
    let size = coeffs[0].len();
    let planes: Vec<CoefficientGrid> = coeffs.iter().map(inverse_dct_channel).collect();

    let mut block = Image::new(size, size, 3);
    for i in 0..size {
        for j in 0..size {
            block.set_pixel(
                i,
                j,
                Pixel::rgb(
                    planes[0][i][j].round() as i32,
                    planes[1][i][j].round() as i32,
                    planes[2][i][j].round() as i32,
                ),
            );
        }
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid(n: usize) -> CoefficientGrid {
        (0..n)
            .map(|i| (0..n).map(|j| ((i * 31 + j * 17) % 256) as f64).collect())
            .collect()
    }

    #[test]
    fn channel_round_trip_is_near_exact() {
        for n in [4, 5, 8, 16] {
            let grid = sample_grid(n);
            let back = inverse_dct_channel(&forward_dct_channel(&grid));
            for (row, brow) in grid.iter().zip(back.iter()) {
                for (&a, &b) in row.iter().zip(brow.iter()) {
                    assert!((a - b).abs() < 1e-8, "size {}: {} vs {}", n, a, b);
                }
            }
        }
    }

    #[test]
    fn dc_coefficient_of_flat_block() {
        // a constant block concentrates all energy in coeff (0,0)
        let n = 8;
        let grid = vec![vec![100.0; n]; n];
        let coeffs = forward_dct_channel(&grid);
        assert!((coeffs[0][0] - 100.0 * n as f64).abs() < 1e-8);
        for (u, row) in coeffs.iter().enumerate() {
            for (v, &c) in row.iter().enumerate() {
                if (u, v) != (0, 0) {
                    assert!(c.abs() < 1e-8);
                }
            }
        }
    }

    #[test]
    fn block_round_trip_within_rounding() {
        let mut block = Image::new(8, 8, 3);
        for i in 0..8 {
            for j in 0..8 {
                block.set_pixel(
                    i,
                    j,
                    crate::raster::Pixel::rgb(
                        ((i * 8 + j) * 3 % 256) as i32,
                        255 - i as i32 * 20,
                        j as i32 * 11 - 40,
                    ),
                );
            }
        }
        let back = inverse_dct(&forward_dct(&block));
        for i in 0..8 {
            for j in 0..8 {
                let a = block.pixel(i, j);
                let b = back.pixel(i, j);
                assert!((a.r - b.r).abs() <= 1);
                assert!((a.g - b.g).abs() <= 1);
                assert!((a.b - b.b).abs() <= 1);
            }
        }
    }
}
