//! Wire packetization of one encoded frame.
//!
//! Every packet opens with a 3-byte prefix: FrameID (u16 LE) and a type
//! tag byte. Multi-byte integers are little-endian throughout.
//!
//! ```text
//! Header:     width u16 | height u16 | macroblock_size u16
//! Dictionary: packet_index u16 | payload_len u16 | entries
//!             entry = key_len u16, key bytes, code_len u16, code bytes
//! Body:       macroblock_index u16 | packet_index u16 | payload_len u16
//!             payload = 12-byte RLE pair records
//! Tail:       (no further fields)
//! ```
//!
//! Dictionary keys are 12-byte pair records; `code_len` counts bits and
//! the code bytes pack them MSB-first. The packet-index fields are
//! reserved for multi-packet fragmentation: written as zero, ignored on
//! read.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::codec::huffman::{Code, Symbol};
use crate::codec::rle::{RlePair, PAIR_RECORD_LEN};
use crate::error::{CodecError, CodecResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Header = 0,
    Dictionary = 1,
    Body = 2,
    Tail = 3,
}

impl PacketType {
    pub fn from_u8(v: u8) -> CodecResult<Self> {
        match v {
            0 => Ok(Self::Header),
            1 => Ok(Self::Dictionary),
            2 => Ok(Self::Body),
            3 => Ok(Self::Tail),
            _ => Err(CodecError::Protocol(format!("unknown packet tag {:#04x}", v))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Header {
        frame_id: u16,
        width: u16,
        height: u16,
        macroblock_size: u16,
    },
    Dictionary {
        frame_id: u16,
        entries: Vec<(Symbol, Code)>,
    },
    Body {
        frame_id: u16,
        macroblock_index: u16,
        pairs: Vec<RlePair>,
    },
    Tail {
        frame_id: u16,
    },
}

impl Packet {
    pub fn frame_id(&self) -> u16 {
        match *self {
            Packet::Header { frame_id, .. }
            | Packet::Dictionary { frame_id, .. }
            | Packet::Body { frame_id, .. }
            | Packet::Tail { frame_id } => frame_id,
        }
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Header { .. } => PacketType::Header,
            Packet::Dictionary { .. } => PacketType::Dictionary,
            Packet::Body { .. } => PacketType::Body,
            Packet::Tail { .. } => PacketType::Tail,
        }
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        buf.write_u16::<LittleEndian>(self.frame_id())?;
        buf.write_u8(self.packet_type() as u8)?;

        match self {
            Packet::Header {
                width,
                height,
                macroblock_size,
                ..
            } => {
                buf.write_u16::<LittleEndian>(*width)?;
                buf.write_u16::<LittleEndian>(*height)?;
                buf.write_u16::<LittleEndian>(*macroblock_size)?;
            }
            Packet::Dictionary { entries, .. } => {
                let payload = serialize_dictionary(entries)?;
                buf.write_u16::<LittleEndian>(0)?; // fragmentation index, reserved
                buf.write_u16::<LittleEndian>(payload_len(payload.len())?)?;
                buf.extend_from_slice(&payload);
            }
            Packet::Body {
                macroblock_index,
                pairs,
                ..
            } => {
                buf.write_u16::<LittleEndian>(*macroblock_index)?;
                buf.write_u16::<LittleEndian>(0)?; // fragmentation index, reserved
                buf.write_u16::<LittleEndian>(payload_len(pairs.len() * PAIR_RECORD_LEN)?)?;
                for pair in pairs {
                    buf.extend_from_slice(&pair.to_bytes());
                }
            }
            Packet::Tail { .. } => {}
        }

        Ok(buf)
    }

    /// Parses one complete packet from a byte slice.
    pub fn parse(bytes: &[u8]) -> CodecResult<Packet> {
        let mut cursor = std::io::Cursor::new(bytes);
        Self::read_from(&mut cursor)
    }

    /// Reads one packet off a byte stream. Packets are self-delimiting,
    /// so no outer framing is needed.
    ///
    /// End-of-stream at a packet boundary surfaces as `Io` with
    /// [`std::io::ErrorKind::UnexpectedEof`]; truncation inside a packet
    /// is a `Protocol` error.
    pub fn read_from<R: Read>(reader: &mut R) -> CodecResult<Packet> {
        let frame_id = reader.read_u16::<LittleEndian>().map_err(CodecError::Io)?;
        let tag = reader.read_u8().map_err(|e| truncated("packet tag", e))?;
        let packet_type = PacketType::from_u8(tag)?;

        match packet_type {
            PacketType::Header => {
                let width = reader
                    .read_u16::<LittleEndian>()
                    .map_err(|e| truncated("header width", e))?;
                let height = reader
                    .read_u16::<LittleEndian>()
                    .map_err(|e| truncated("header height", e))?;
                let macroblock_size = reader
                    .read_u16::<LittleEndian>()
                    .map_err(|e| truncated("header macroblock size", e))?;
                Ok(Packet::Header {
                    frame_id,
                    width,
                    height,
                    macroblock_size,
                })
            }
            PacketType::Dictionary => {
                let _packet_index = reader
                    .read_u16::<LittleEndian>()
                    .map_err(|e| truncated("dictionary index", e))?;
                let len = reader
                    .read_u16::<LittleEndian>()
                    .map_err(|e| truncated("dictionary length", e))? as usize;
                let mut payload = vec![0u8; len];
                reader
                    .read_exact(&mut payload)
                    .map_err(|e| truncated("dictionary payload", e))?;
                Ok(Packet::Dictionary {
                    frame_id,
                    entries: deserialize_dictionary(&payload)?,
                })
            }
            PacketType::Body => {
                let macroblock_index = reader
                    .read_u16::<LittleEndian>()
                    .map_err(|e| truncated("body macroblock index", e))?;
                let _packet_index = reader
                    .read_u16::<LittleEndian>()
                    .map_err(|e| truncated("body index", e))?;
                let len = reader
                    .read_u16::<LittleEndian>()
                    .map_err(|e| truncated("body length", e))? as usize;
                if len % PAIR_RECORD_LEN != 0 {
                    return Err(CodecError::Protocol(format!(
                        "body payload length {} is not a multiple of {}",
                        len, PAIR_RECORD_LEN
                    )));
                }
                let mut payload = vec![0u8; len];
                reader
                    .read_exact(&mut payload)
                    .map_err(|e| truncated("body payload", e))?;
                let pairs = payload
                    .chunks_exact(PAIR_RECORD_LEN)
                    .map(RlePair::from_bytes)
                    .collect::<CodecResult<Vec<_>>>()?;
                Ok(Packet::Body {
                    frame_id,
                    macroblock_index,
                    pairs,
                })
            }
            PacketType::Tail => Ok(Packet::Tail { frame_id }),
        }
    }
}

fn truncated(what: &str, err: std::io::Error) -> CodecError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        CodecError::Protocol(format!("truncated packet: {}", what))
    } else {
        CodecError::Io(err)
    }
}

fn payload_len(len: usize) -> CodecResult<u16> {
    u16::try_from(len)
        .map_err(|_| CodecError::Protocol(format!("payload of {} bytes exceeds packet limit", len)))
}

fn serialize_dictionary(entries: &[(Symbol, Code)]) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    for (symbol, code) in entries {
        let key = symbol.key_bytes();
        buf.write_u16::<LittleEndian>(key.len() as u16)?;
        buf.extend_from_slice(&key);
        buf.write_u16::<LittleEndian>(code.len as u16)?;
        buf.extend_from_slice(&pack_code_bits(code));
    }
    Ok(buf)
}

fn deserialize_dictionary(payload: &[u8]) -> CodecResult<Vec<(Symbol, Code)>> {
    let mut entries = Vec::new();
    let mut pos = 0usize;
    while pos < payload.len() {
        let (key, next) = read_field(payload, pos, "dictionary key")?;
        let symbol = Symbol::from_key_bytes(key)?;
        pos = next;

        if pos + 2 > payload.len() {
            return Err(CodecError::Protocol("truncated dictionary code length".into()));
        }
        let code_len = u16::from_le_bytes([payload[pos], payload[pos + 1]]);
        pos += 2;
        if code_len > 64 {
            return Err(CodecError::Protocol(format!(
                "dictionary code of {} bits is not representable",
                code_len
            )));
        }
        let code_bytes = (code_len as usize + 7) / 8;
        if pos + code_bytes > payload.len() {
            return Err(CodecError::Protocol("truncated dictionary code".into()));
        }
        let code = unpack_code_bits(&payload[pos..pos + code_bytes], code_len as u8);
        pos += code_bytes;

        entries.push((symbol, code));
    }
    Ok(entries)
}

fn read_field<'a>(payload: &'a [u8], pos: usize, what: &str) -> CodecResult<(&'a [u8], usize)> {
    if pos + 2 > payload.len() {
        return Err(CodecError::Protocol(format!("truncated {} length", what)));
    }
    let len = u16::from_le_bytes([payload[pos], payload[pos + 1]]) as usize;
    let start = pos + 2;
    if start + len > payload.len() {
        return Err(CodecError::Protocol(format!("truncated {}", what)));
    }
    Ok((&payload[start..start + len], start + len))
}

fn pack_code_bits(code: &Code) -> Vec<u8> {
    let mut bytes = vec![0u8; (code.len as usize + 7) / 8];
    for i in 0..code.len {
        if (code.bits >> (code.len - 1 - i)) & 1 == 1 {
            bytes[i as usize / 8] |= 1 << (7 - i % 8);
        }
    }
    bytes
}

fn unpack_code_bits(bytes: &[u8], len: u8) -> Code {
    let mut bits = 0u64;
    for i in 0..len {
        let bit = (bytes[i as usize / 8] >> (7 - i % 8)) & 1;
        bits = (bits << 1) | bit as u64;
    }
    Code { bits, len }
}

/// Ordered packets making up one encoded frame:
/// Header, Dictionary, Body per macroblock, Tail.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitstream {
    packets: Vec<Packet>,
}

impl Bitstream {
    pub fn new(packets: Vec<Packet>) -> Self {
        Self { packets }
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        for packet in &self.packets {
            buf.extend_from_slice(&packet.to_bytes()?);
        }
        Ok(buf)
    }

    /// Parses a contiguous byte buffer back into its packet sequence.
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let mut cursor = std::io::Cursor::new(bytes);
        let mut packets = Vec::new();
        while (cursor.position() as usize) < bytes.len() {
            packets.push(Packet::read_from(&mut cursor)?);
        }
        Ok(Self { packets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_byte_for_byte() {
        let packet = Packet::Header {
            frame_id: 0x0102,
            width: 640,
            height: 480,
            macroblock_size: 16,
        };
        let bytes = packet.to_bytes().unwrap();
        assert_eq!(bytes.len(), 9);
        assert_eq!(&bytes[0..2], &[0x02, 0x01]);
        assert_eq!(bytes[2], 0);
        assert_eq!(u16::from_le_bytes([bytes[3], bytes[4]]), 640);
        assert_eq!(u16::from_le_bytes([bytes[7], bytes[8]]), 16);
        assert_eq!(Packet::parse(&bytes).unwrap(), packet);
    }

    #[test]
    fn body_round_trip() {
        let packet = Packet::Body {
            frame_id: 7,
            macroblock_index: 42,
            pairs: vec![RlePair::new(0, 5.0), RlePair::new(3, -1.25)],
        };
        let bytes = packet.to_bytes().unwrap();
        assert_eq!(bytes.len(), 9 + 2 * PAIR_RECORD_LEN);
        assert_eq!(Packet::parse(&bytes).unwrap(), packet);
    }

    #[test]
    fn dictionary_round_trip_including_empty_code() {
        let entries = vec![
            (Symbol { run: 0, value_bits: 5.0f64.to_bits() }, Code { bits: 0b10, len: 2 }),
            (Symbol { run: 9, value_bits: 0u64 }, Code { bits: 0, len: 0 }),
            (Symbol { run: 3, value_bits: (-2.5f64).to_bits() }, Code { bits: 0b110101001, len: 9 }),
        ];
        let packet = Packet::Dictionary {
            frame_id: 1,
            entries: entries.clone(),
        };
        let parsed = Packet::parse(&packet.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn tail_is_three_bytes() {
        let bytes = Packet::Tail { frame_id: 3 }.to_bytes().unwrap();
        assert_eq!(bytes, vec![3, 0, 3]);
    }

    #[test]
    fn unknown_tag_is_a_protocol_error() {
        let result = Packet::parse(&[0, 0, 9]);
        assert!(matches!(result, Err(CodecError::Protocol(_))));
    }

    #[test]
    fn truncated_body_is_a_protocol_error() {
        let packet = Packet::Body {
            frame_id: 1,
            macroblock_index: 0,
            pairs: vec![RlePair::new(1, 1.0)],
        };
        let bytes = packet.to_bytes().unwrap();
        let result = Packet::parse(&bytes[..bytes.len() - 4]);
        assert!(matches!(result, Err(CodecError::Protocol(_))));
    }

    #[test]
    fn bitstream_concatenation_round_trips() {
        let stream = Bitstream::new(vec![
            Packet::Header {
                frame_id: 2,
                width: 32,
                height: 32,
                macroblock_size: 16,
            },
            Packet::Body {
                frame_id: 2,
                macroblock_index: 0,
                pairs: vec![RlePair::new(0, 1.0)],
            },
            Packet::Tail { frame_id: 2 },
        ]);
        let parsed = Bitstream::from_bytes(&stream.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, stream);
    }
}
