//! Run-length coding of quantized coefficient sequences.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{CodecError, CodecResult};

/// Bytes of one pair on the wire: run (u32 LE) + value (f64 LE).
pub const PAIR_RECORD_LEN: usize = 12;

/// One (zero-run, value) pair.
///
/// Within an encoded sequence every pair's value is non-zero, except
/// possibly a terminal `(run, 0)` marker standing for trailing zeros.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RlePair {
    pub run: u32,
    pub value: f64,
}

impl RlePair {
    pub fn new(run: u32, value: f64) -> Self {
        Self { run, value }
    }

    pub fn to_bytes(self) -> [u8; PAIR_RECORD_LEN] {
        let mut buf = [0u8; PAIR_RECORD_LEN];
        LittleEndian::write_u32(&mut buf[0..4], self.run);
        LittleEndian::write_f64(&mut buf[4..12], self.value);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> CodecResult<Self> {
        if buf.len() < PAIR_RECORD_LEN {
            return Err(CodecError::Protocol(format!(
                "RLE pair record truncated: {} bytes",
                buf.len()
            )));
        }
        Ok(Self {
            run: LittleEndian::read_u32(&buf[0..4]),
            value: LittleEndian::read_f64(&buf[4..12]),
        })
    }
}

/// Encodes a coefficient sequence into (zero-run, value) pairs.
///
/// Unresolved trailing zeros are flushed as one final `(run, 0)` pair,
/// distinguishable from ordinary pairs only by its position.
pub fn run_level_encode(coeffs: &[f64]) -> Vec<RlePair> {
    let mut pairs = Vec::new();
    let mut run = 0u32;
    for &value in coeffs {
        if value != 0.0 {
            pairs.push(RlePair::new(run, value));
            run = 0;
        } else {
            run += 1;
        }
    }
    if run != 0 {
        pairs.push(RlePair::new(run, 0.0));
    }
    pairs
}

/// Expands pairs back into the flat coefficient sequence: `run` zeros,
/// then the value. A zero value can only be the terminal trailing-zero
/// marker, whose zeros are fully carried by its run, so it contributes
/// no extra element and the round trip is exact.
pub fn run_length_expand(pairs: &[RlePair]) -> Vec<f64> {
    let mut coeffs = Vec::new();
    for pair in pairs {
        coeffs.extend(std::iter::repeat(0.0).take(pair.run as usize));
        if pair.value != 0.0 {
            coeffs.push(pair.value);
        }
    }
    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zeros_emit_marker_pair() {
        let pairs = run_level_encode(&[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(pairs, vec![RlePair::new(0, 1.0), RlePair::new(3, 0.0)]);
    }

    #[test]
    fn marker_expansion_needs_no_special_case() {
        let pairs = vec![RlePair::new(0, 1.0), RlePair::new(3, 0.0)];
        assert_eq!(run_length_expand(&pairs), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn round_trip() {
        for seq in [
            vec![0.0, 0.0, 5.0, -2.5, 0.0, 7.0],
            vec![1.0, 2.0, 3.0],
            vec![0.0, 0.0, 0.0, 4.0],
        ] {
            assert_eq!(run_length_expand(&run_level_encode(&seq)), seq);
        }
    }

    #[test]
    fn all_zero_sequence_round_trips() {
        let seq = vec![0.0; 7];
        let pairs = run_level_encode(&seq);
        assert_eq!(pairs, vec![RlePair::new(7, 0.0)]);
        assert_eq!(run_length_expand(&pairs), seq);
    }

    #[test]
    fn record_bytes_round_trip() {
        let pair = RlePair::new(17, -3.75);
        let back = RlePair::from_bytes(&pair.to_bytes()).unwrap();
        assert_eq!(back, pair);
        assert!(RlePair::from_bytes(&[0u8; 5]).is_err());
    }
}
