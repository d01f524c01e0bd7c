use crate::error::{CodecError, CodecResult};

/// A single pixel with up to four integer channels.
///
/// The same storage holds RGB or YUV values depending on the pipeline
/// stage; U and V may be negative, hence the signed channels. Callers
/// track which domain a pixel is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub a: i32,
}

impl Pixel {
    pub fn rgb(r: i32, g: i32, b: i32) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn rgba(r: i32, g: i32, b: i32, a: i32) -> Self {
        Self { r, g, b, a }
    }
}

/// Row-major pixel grid, exclusive owner of its storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    channels: usize,
    pixels: Vec<Pixel>,
}

impl Image {
    /// Creates a zeroed image of the given geometry.
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            pixels: vec![Pixel::default(); width * height],
        }
    }

    pub fn from_pixels(
        width: usize,
        height: usize,
        channels: usize,
        pixels: Vec<Pixel>,
    ) -> CodecResult<Self> {
        if pixels.len() != width * height {
            return Err(CodecError::Input(format!(
                "pixel buffer length {} does not match {}x{}",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn pixel(&self, row: usize, col: usize) -> Pixel {
        self.pixels[row * self.width + col]
    }

    pub fn set_pixel(&mut self, row: usize, col: usize, pixel: Pixel) {
        self.pixels[row * self.width + col] = pixel;
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Maps every pixel through `f`, keeping the geometry.
    pub fn map_pixels<F: Fn(Pixel) -> Pixel>(&self, f: F) -> Self {
        Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            pixels: self.pixels.iter().map(|&p| f(p)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_row_major() {
        let mut img = Image::new(4, 2, 3);
        img.set_pixel(1, 3, Pixel::rgb(9, 8, 7));
        assert_eq!(img.pixels()[7], Pixel::rgb(9, 8, 7));
        assert_eq!(img.pixel(1, 3).r, 9);
    }

    #[test]
    fn from_pixels_rejects_bad_length() {
        let res = Image::from_pixels(3, 3, 3, vec![Pixel::default(); 8]);
        assert!(matches!(res, Err(CodecError::Input(_))));
    }
}
