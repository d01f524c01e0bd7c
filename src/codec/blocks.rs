//! Macroblock splitter and reassembler.
//!
//! Block index convention, shared by both directions:
//! `index = col + row * (width / size)`, row-major.

use crate::error::{CodecError, CodecResult};
use crate::raster::Image;

fn check_geometry(width: usize, height: usize, size: usize) -> CodecResult<()> {
    if size == 0 || width % size != 0 || height % size != 0 {
        return Err(CodecError::Geometry {
            width,
            height,
            macroblock_size: size,
        });
    }
    Ok(())
}

/// Splits an image into (W/S)*(H/S) square macroblocks of side `size`.
pub fn split_into_macroblocks(img: &Image, size: usize) -> CodecResult<Vec<Image>> {
    check_geometry(img.width(), img.height(), size)?;

    let cols = img.width() / size;
    let rows = img.height() / size;
    let mut blocks = Vec::with_capacity(cols * rows);

    for block_row in 0..rows {
        for block_col in 0..cols {
            let mut block = Image::new(size, size, img.channels());
            for i in 0..size {
                for j in 0..size {
                    block.set_pixel(i, j, img.pixel(block_row * size + i, block_col * size + j));
                }
            }
            blocks.push(block);
        }
    }

    log::debug!(
        "split {}x{} image into {} macroblocks of size {}",
        img.width(),
        img.height(),
        blocks.len(),
        size
    );

    Ok(blocks)
}

/// Inverse of [`split_into_macroblocks`] for blocks given in index order.
pub fn assemble_macroblocks(
    blocks: &[Image],
    size: usize,
    width: usize,
    height: usize,
) -> CodecResult<Image> {
    check_geometry(width, height, size)?;

    let cols = width / size;
    let rows = height / size;
    if blocks.len() != cols * rows {
        return Err(CodecError::Input(format!(
            "expected {} macroblocks for {}x{} at size {}, got {}",
            cols * rows,
            width,
            height,
            size,
            blocks.len()
        )));
    }

    let channels = blocks.first().map_or(3, Image::channels);
    let mut img = Image::new(width, height, channels);
    for (index, block) in blocks.iter().enumerate() {
        let row0 = (index / cols) * size;
        let col0 = (index % cols) * size;
        for i in 0..size {
            for j in 0..size {
                img.set_pixel(row0 + i, col0 + j, block.pixel(i, j));
            }
        }
    }

    Ok(img)
}
