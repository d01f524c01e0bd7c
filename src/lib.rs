pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;
pub mod io;
pub mod net;
pub mod raster;

pub use codec::{decode_frame, encode_frame, EncoderConfig, EncodingDictionary, RlePair};
pub use decoder::FrameDecoder;
pub use encoder::FrameEncoder;
pub use error::{CodecError, CodecResult};
pub use format::{AssemblyState, Bitstream, FrameAssembler, FrameAssembly, Packet, PacketType};
pub use io::{load_image, save_image};
pub use raster::{Image, Pixel};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: usize, height: usize) -> Image {
        let mut img = Image::new(width, height, 3);
        for i in 0..height {
            for j in 0..width {
                let on = (i / 4 + j / 4) % 2 == 0;
                img.set_pixel(
                    i,
                    j,
                    if on {
                        Pixel::rgb(220, 40, 40)
                    } else {
                        Pixel::rgb(20, 20, 180)
                    },
                );
            }
        }
        img
    }

    #[test]
    fn encode_decode_round_trip_over_bytes() {
        let img = checker(32, 32);
        let encoder = FrameEncoder::new()
            .macroblock_size(8)
            .threshold(f64::NEG_INFINITY);
        let bytes = encoder.encode_to_vec(&img, 3).unwrap();

        let decoded = FrameDecoder::new().decode(&bytes).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 32);
        for (a, b) in img.pixels().iter().zip(decoded.pixels().iter()) {
            assert!((a.r - b.r).abs() <= 3);
            assert!((a.g - b.g).abs() <= 3);
            assert!((a.b - b.b).abs() <= 3);
        }
    }

    #[test]
    fn lossy_threshold_still_decodes_full_geometry() {
        let img = checker(48, 32);
        let encoder = FrameEncoder::new().macroblock_size(16).threshold(5.0);
        let bytes = encoder.encode_to_vec(&img, 1).unwrap();
        let decoded = FrameDecoder::new().decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (48, 32));
    }

    #[test]
    fn geometry_mismatch_is_reported_not_fatal() {
        let img = checker(30, 30);
        let result = FrameEncoder::new().macroblock_size(16).encode(&img, 1);
        assert!(matches!(result, Err(CodecError::Geometry { .. })));
    }

    #[test]
    fn interleaved_frames_demultiplex_by_id() {
        let a = FrameEncoder::new()
            .macroblock_size(8)
            .encode(&checker(16, 16), 1)
            .unwrap();
        let b = FrameEncoder::new()
            .macroblock_size(8)
            .encode(&checker(16, 16), 2)
            .unwrap();

        let mut assembler = FrameAssembler::new();
        // interleave the two frames' packets
        let (pa, pb) = (a.packets(), b.packets());
        for i in 0..pa.len().max(pb.len()) {
            if let Some(p) = pa.get(i) {
                assembler.handle_packet(p.clone()).unwrap();
            }
            if let Some(p) = pb.get(i) {
                assembler.handle_packet(p.clone()).unwrap();
            }
        }

        for id in [1, 2] {
            let assembly = assembler.take_complete(id).unwrap();
            assert_eq!(assembly.frame_id, id);
            assert!(assembly.slots.iter().all(Option::is_some));
            let img = decode_frame(&assembly).unwrap();
            assert_eq!((img.width(), img.height()), (16, 16));
        }
    }
}
