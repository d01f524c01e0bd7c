//! Frame-level coordination: parallel per-macroblock encoding, the
//! frame-wide dictionary build, framing, and the inverse path from a
//! reassembled frame back to pixels.

use rayon::prelude::*;

use crate::codec::blocks::{assemble_macroblocks, split_into_macroblocks};
use crate::codec::color;
use crate::codec::dct::{forward_dct, inverse_dct};
use crate::codec::huffman::EncodingDictionary;
use crate::codec::quantizer::quantize;
use crate::codec::rle::{run_length_expand, run_level_encode, RlePair};
use crate::codec::zigzag::{zigzag_scan, zigzag_unscan};
use crate::error::{CodecError, CodecResult};
use crate::format::assembler::FrameAssembly;
use crate::format::packet::{Bitstream, Packet};

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub macroblock_size: usize,
    pub threshold: f64,
    pub workers: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            macroblock_size: 16,
            threshold: 5.0,
            workers: 8,
        }
    }
}

impl EncoderConfig {
    pub fn with_macroblock_size(mut self, size: usize) -> Self {
        self.macroblock_size = size;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// Runs the full per-block pipeline: color transform, per-channel DCT,
/// zigzag, quantization, run-length coding. The three channel scans
/// are concatenated [Y, U, V] into one sequence before quantization.
pub fn encode_macroblock(block: &crate::raster::Image, threshold: f64) -> CodecResult<Vec<RlePair>> {
    if block.width() != block.height() || block.width() == 0 {
        return Err(CodecError::Worker(format!(
            "macroblock is not square: {}x{}",
            block.width(),
            block.height()
        )));
    }

    let yuv = color::to_yuv(block);
    let coeffs = forward_dct(&yuv);

    let mut sequence = Vec::with_capacity(3 * block.width() * block.height());
    for grid in &coeffs {
        sequence.extend(zigzag_scan(grid));
    }

    let quantized = quantize(&sequence, threshold);
    Ok(run_level_encode(&quantized))
}

/// Encodes every macroblock of a frame on a bounded worker pool and
/// returns the per-block pair lists in macroblock-index order.
///
/// The pool holds exactly `config.workers` threads and the task queue is
/// bounded by the macroblock count. Results are collected positionally,
/// so completion order never affects output order: one worker and N
/// workers yield identical results. The first worker failure aborts the
/// whole frame with no partial output.
pub fn encode_frame_pairs(
    img: &crate::raster::Image,
    config: &EncoderConfig,
) -> CodecResult<Vec<Vec<RlePair>>> {
    let blocks = split_into_macroblocks(img, config.macroblock_size)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()
        .map_err(|e| CodecError::Worker(e.to_string()))?;

    pool.install(|| {
        blocks
            .par_iter()
            .map(|block| encode_macroblock(block, config.threshold))
            .collect::<CodecResult<Vec<_>>>()
    })
}

/// Encodes one frame into its packetized bitstream: Header, Dictionary,
/// one Body per macroblock, Tail. The dictionary is built once from the
/// global pair population after all workers have finished.
pub fn encode_frame(
    img: &crate::raster::Image,
    frame_id: u16,
    config: &EncoderConfig,
) -> CodecResult<Bitstream> {
    let (width, height, size) = (
        dimension_u16(img.width(), "width")?,
        dimension_u16(img.height(), "height")?,
        dimension_u16(config.macroblock_size, "macroblock size")?,
    );

    let per_block = encode_frame_pairs(img, config)?;

    let population: Vec<RlePair> = per_block.iter().flatten().copied().collect();
    let dictionary = EncodingDictionary::build(&population);
    log::debug!(
        "frame {}: {} macroblocks, {} pairs, {} distinct symbols",
        frame_id,
        per_block.len(),
        population.len(),
        dictionary.len()
    );

    let mut packets = Vec::with_capacity(per_block.len() + 3);
    packets.push(Packet::Header {
        frame_id,
        width,
        height,
        macroblock_size: size,
    });
    packets.push(Packet::Dictionary {
        frame_id,
        entries: dictionary.iter().copied().collect(),
    });
    for (index, pairs) in per_block.into_iter().enumerate() {
        packets.push(Packet::Body {
            frame_id,
            macroblock_index: index as u16,
            pairs,
        });
    }
    packets.push(Packet::Tail { frame_id });

    Ok(Bitstream::new(packets))
}

fn dimension_u16(value: usize, what: &str) -> CodecResult<u16> {
    u16::try_from(value)
        .map_err(|_| CodecError::Input(format!("{} {} does not fit the wire format", what, value)))
}

/// Inverts the per-block pipeline for one slot's pair list.
fn decode_macroblock(pairs: &[RlePair], size: usize) -> crate::raster::Image {
    let mut sequence = run_length_expand(pairs);
    // missing or short slots decode as zero coefficients
    sequence.resize(3 * size * size, 0.0);

    let grids = [
        zigzag_unscan(&sequence[0..size * size], size),
        zigzag_unscan(&sequence[size * size..2 * size * size], size),
        zigzag_unscan(&sequence[2 * size * size..], size),
    ];
    color::to_rgb(&inverse_dct(&grids))
}

/// Reconstructs the image of a reassembled frame. Empty slots become
/// all-zero macroblocks; slot order drives placement, so the output is
/// deterministic regardless of packet arrival order.
pub fn decode_frame(assembly: &FrameAssembly) -> CodecResult<crate::raster::Image> {
    let size = assembly.macroblock_size as usize;
    if size == 0 {
        return Err(CodecError::Protocol("frame has zero macroblock size".into()));
    }

    let blocks: Vec<crate::raster::Image> = assembly
        .slots
        .par_iter()
        .map(|slot| decode_macroblock(slot.as_deref().unwrap_or(&[]), size))
        .collect();

    assemble_macroblocks(
        &blocks,
        size,
        (assembly.width / assembly.macroblock_size) as usize * size,
        (assembly.height / assembly.macroblock_size) as usize * size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Image, Pixel};

    fn test_image(width: usize, height: usize) -> Image {
        let mut img = Image::new(width, height, 3);
        for i in 0..height {
            for j in 0..width {
                img.set_pixel(
                    i,
                    j,
                    Pixel::rgb(
                        ((i * 13 + j * 7) % 256) as i32,
                        ((i * 5 + j * 29) % 256) as i32,
                        ((i * 17 + j * 3) % 256) as i32,
                    ),
                );
            }
        }
        img
    }

    #[test]
    fn worker_count_does_not_change_output() {
        let img = test_image(32, 32);
        let base = EncoderConfig::default().with_macroblock_size(16);
        let one = encode_frame_pairs(&img, &base.clone().with_workers(1)).unwrap();
        let eight = encode_frame_pairs(&img, &base.with_workers(8)).unwrap();
        assert_eq!(one, eight);
    }

    #[test]
    fn frame_packet_sequence_shape() {
        let img = test_image(32, 16);
        let stream = encode_frame(&img, 5, &EncoderConfig::default()).unwrap();
        let packets = stream.packets();
        assert_eq!(packets.len(), 2 + 2 + 1);
        assert!(matches!(packets[0], Packet::Header { frame_id: 5, .. }));
        assert!(matches!(packets[1], Packet::Dictionary { .. }));
        assert!(matches!(
            packets[2],
            Packet::Body {
                macroblock_index: 0,
                ..
            }
        ));
        assert!(matches!(packets.last(), Some(Packet::Tail { frame_id: 5 })));
    }

    #[test]
    fn lossless_threshold_round_trips_within_tolerance() {
        let img = test_image(16, 16);
        let config = EncoderConfig::default()
            .with_macroblock_size(8)
            .with_threshold(f64::NEG_INFINITY);
        let stream = encode_frame(&img, 1, &config).unwrap();

        let mut assembler = crate::format::assembler::FrameAssembler::new();
        for packet in stream.packets() {
            assembler.handle_packet(packet.clone()).unwrap();
        }
        let assembly = assembler.take_complete(1).unwrap();
        let decoded = decode_frame(&assembly).unwrap();

        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 16);
        for i in 0..16 {
            for j in 0..16 {
                let a = img.pixel(i, j);
                let b = decoded.pixel(i, j);
                assert!((a.r - b.r).abs() <= 3, "r at ({},{}) {} vs {}", i, j, a.r, b.r);
                assert!((a.g - b.g).abs() <= 3);
                assert!((a.b - b.b).abs() <= 3);
            }
        }
    }

    #[test]
    fn empty_slots_decode_to_black_blocks() {
        let mut assembler = crate::format::assembler::FrameAssembler::new();
        assembler
            .handle_packet(Packet::Header {
                frame_id: 1,
                width: 16,
                height: 8,
                macroblock_size: 8,
            })
            .unwrap();
        assembler.handle_packet(Packet::Tail { frame_id: 1 }).unwrap();
        let decoded = decode_frame(&assembler.take_complete(1).unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
        assert!(decoded.pixels().iter().all(|p| (p.r, p.g, p.b) == (0, 0, 0)));
    }

    #[test]
    fn non_square_macroblock_is_a_worker_error() {
        let block = Image::new(8, 4, 3);
        assert!(matches!(
            encode_macroblock(&block, 5.0),
            Err(CodecError::Worker(_))
        ));
    }
}
