pub mod blocks;
pub mod color;
pub mod dct;
pub mod engine;
pub mod huffman;
pub mod quantizer;
pub mod rle;
pub mod zigzag;

pub use blocks::{assemble_macroblocks, split_into_macroblocks};
pub use color::{rgb_to_yuv, to_rgb, to_yuv, yuv_to_rgb};
pub use dct::{forward_dct, inverse_dct, CoefficientGrid};
pub use engine::{decode_frame, encode_frame, encode_frame_pairs, EncoderConfig};
pub use huffman::{decode_pairs, encode_pairs, BitString, Code, EncodingDictionary, Symbol};
pub use quantizer::quantize;
pub use rle::{run_length_expand, run_level_encode, RlePair};
pub use zigzag::{zigzag_scan, zigzag_unscan};
