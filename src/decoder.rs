use std::io::Read;

use crate::codec::engine::decode_frame;
use crate::error::{CodecError, CodecResult};
use crate::format::assembler::FrameAssembler;
use crate::format::packet::Packet;
use crate::raster::Image;

/// High-level decoding surface: drives a [`FrameAssembler`] over a
/// packet byte stream and reconstructs the first completed frame.
pub struct FrameDecoder;

impl FrameDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, bytes: &[u8]) -> CodecResult<Image> {
        self.decode_stream(&mut std::io::Cursor::new(bytes))
    }

    pub fn decode_stream<R: Read>(&self, reader: &mut R) -> CodecResult<Image> {
        let mut assembler = FrameAssembler::new();

        loop {
            let packet = match Packet::read_from(reader) {
                Ok(packet) => packet,
                Err(CodecError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            };
            let frame_id = packet.frame_id();
            assembler.handle_packet(packet)?;
            if let Some(assembly) = assembler.take_complete(frame_id) {
                return decode_frame(&assembly);
            }
        }

        Err(CodecError::Protocol(
            "stream ended before any frame completed".into(),
        ))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
