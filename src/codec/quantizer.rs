//! Threshold quantization of zigzag-ordered coefficients.

/// Zeroes every coefficient with `value <= threshold`.
///
/// The comparison is signed, not magnitude-based: negative coefficients
/// at or below a positive threshold are zeroed while positive values
/// above it survive untouched. The threshold is an encoder-side tunable
/// and is never transmitted; decoding needs no knowledge of it.
pub fn quantize(coeffs: &[f64], threshold: f64) -> Vec<f64> {
    coeffs
        .iter()
        .map(|&v| if v <= threshold { 0.0 } else { v })
        .collect()
}
