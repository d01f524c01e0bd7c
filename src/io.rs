//! Raster container I/O, bridging the `image` crate to the codec's
//! pixel store. PNG inputs keep their alpha channel (4 channels);
//! everything else loads as RGB (3 channels).

use std::path::Path;

use image::DynamicImage;

use crate::error::CodecResult;
use crate::raster::{Image, Pixel};

pub fn load_image<P: AsRef<Path>>(path: P) -> CodecResult<Image> {
    let dynamic = image::open(path)?;

    match dynamic {
        DynamicImage::ImageRgba8(rgba) => {
            let (width, height) = (rgba.width() as usize, rgba.height() as usize);
            let pixels = rgba
                .pixels()
                .map(|p| Pixel::rgba(p[0] as i32, p[1] as i32, p[2] as i32, p[3] as i32))
                .collect();
            Image::from_pixels(width, height, 4, pixels)
        }
        other => {
            let rgb = other.to_rgb8();
            let (width, height) = (rgb.width() as usize, rgb.height() as usize);
            let pixels = rgb
                .pixels()
                .map(|p| Pixel::rgb(p[0] as i32, p[1] as i32, p[2] as i32))
                .collect();
            Image::from_pixels(width, height, 3, pixels)
        }
    }
}

pub fn save_image<P: AsRef<Path>>(img: &Image, path: P) -> CodecResult<()> {
    let clamp = |v: i32| v.clamp(0, 255) as u8;

    if img.channels() == 4 {
        let buffer = image::RgbaImage::from_fn(img.width() as u32, img.height() as u32, |x, y| {
            let p = img.pixel(y as usize, x as usize);
            image::Rgba([clamp(p.r), clamp(p.g), clamp(p.b), clamp(p.a)])
        });
        buffer.save(path)?;
    } else {
        let buffer = image::RgbImage::from_fn(img.width() as u32, img.height() as u32, |x, y| {
            let p = img.pixel(y as usize, x as usize);
            image::Rgb([clamp(p.r), clamp(p.g), clamp(p.b)])
        });
        buffer.save(path)?;
    }

    Ok(())
}
