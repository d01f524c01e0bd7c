//! Per-pixel RGB <-> YUV conversion.
//!
//! Rounding policy: every channel written back to integer storage is
//! rounded to nearest with `f64::round`. Alpha passes through untouched.

use crate::raster::{Image, Pixel};

pub fn rgb_to_yuv(p: Pixel) -> Pixel {
    let (r, g, b) = (p.r as f64, p.g as f64, p.b as f64);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let u = -0.14713 * r - 0.28886 * g + 0.436 * b;
    let v = 0.615 * r - 0.51499 * g - 0.10001 * b;
    Pixel {
        r: y.round() as i32,
        g: u.round() as i32,
        b: v.round() as i32,
        a: p.a,
    }
}

pub fn yuv_to_rgb(p: Pixel) -> Pixel {
    let (y, u, v) = (p.r as f64, p.g as f64, p.b as f64);
    let r = y + 1.13983 * v;
    let g = y - 0.39465 * u - 0.58060 * v;
    let b = y + 2.03211 * u;
    Pixel {
        r: r.round() as i32,
        g: g.round() as i32,
        b: b.round() as i32,
        a: p.a,
    }
}

/// Returns a YUV-domain copy of an RGB-domain image.
pub fn to_yuv(img: &Image) -> Image {
    img.map_pixels(rgb_to_yuv)
}

/// Returns an RGB-domain copy of a YUV-domain image.
pub fn to_rgb(img: &Image) -> Image {
    img.map_pixels(yuv_to_rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        let white = rgb_to_yuv(Pixel::rgb(255, 255, 255));
        assert_eq!(white.r, 255);
        assert_eq!(white.g, 0);
        assert_eq!(white.b, 0);

        let black = rgb_to_yuv(Pixel::rgb(0, 0, 0));
        assert_eq!((black.r, black.g, black.b), (0, 0, 0));
    }

    #[test]
    fn round_trip_stays_close() {
        for &(r, g, b) in &[(10, 200, 37), (255, 0, 128), (90, 90, 90), (0, 255, 255)] {
            let back = yuv_to_rgb(rgb_to_yuv(Pixel::rgb(r, g, b)));
            assert!((back.r - r).abs() <= 1, "r {} -> {}", r, back.r);
            assert!((back.g - g).abs() <= 1, "g {} -> {}", g, back.g);
            assert!((back.b - b).abs() <= 1, "b {} -> {}", b, back.b);
        }
    }

    #[test]
    fn alpha_is_preserved() {
        let p = rgb_to_yuv(Pixel::rgba(1, 2, 3, 42));
        assert_eq!(p.a, 42);
        assert_eq!(yuv_to_rgb(p).a, 42);
    }
}
