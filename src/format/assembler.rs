//! Decoder-side reassembly of packetized frames.
//!
//! A [`FrameAssembler`] demultiplexes incoming packets by FrameID into
//! per-frame [`FrameAssembly`] values. One assembler instance must be
//! owned by a single task; it provides no interior locking.

use std::collections::HashMap;

use crate::codec::huffman::EncodingDictionary;
use crate::codec::rle::RlePair;
use crate::error::{CodecError, CodecResult};
use crate::format::packet::{Packet, PacketType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Idle,
    HeaderReceived,
    Complete,
}

/// Mutable per-frame reconstruction state. Created by the first Header
/// packet for a frame, mutated by Dictionary/Body packets, and marked
/// finished by a Tail packet. Completion does not verify that every
/// slot is filled: a short frame silently completes with missing
/// blocks, by design of this protocol, and empty slots decode as
/// all-zero macroblocks.
#[derive(Debug, Clone)]
pub struct FrameAssembly {
    pub frame_id: u16,
    pub width: u16,
    pub height: u16,
    pub macroblock_size: u16,
    pub slots: Vec<Option<Vec<RlePair>>>,
    pub symbols: Option<EncodingDictionary>,
    pub complete: bool,
}

impl FrameAssembly {
    fn new(frame_id: u16, width: u16, height: u16, macroblock_size: u16) -> Self {
        let slot_count =
            (width / macroblock_size) as usize * (height / macroblock_size) as usize;
        Self {
            frame_id,
            width,
            height,
            macroblock_size,
            slots: vec![None; slot_count],
            symbols: None,
            complete: false,
        }
    }

    pub fn state(&self) -> AssemblyState {
        if self.complete {
            AssemblyState::Complete
        } else {
            AssemblyState::HeaderReceived
        }
    }
}

/// Demultiplexes packets of concurrently in-flight frames.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    frames: HashMap<u16, FrameAssembly>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, frame_id: u16) -> AssemblyState {
        self.frames
            .get(&frame_id)
            .map_or(AssemblyState::Idle, FrameAssembly::state)
    }

    pub fn assembly(&self, frame_id: u16) -> Option<&FrameAssembly> {
        self.frames.get(&frame_id)
    }

    /// Removes and returns a frame's assembly once it is complete.
    pub fn take_complete(&mut self, frame_id: u16) -> Option<FrameAssembly> {
        if self.frames.get(&frame_id).is_some_and(|a| a.complete) {
            self.frames.remove(&frame_id)
        } else {
            None
        }
    }

    /// Feeds one raw packet. Malformed or unexpected packets are logged
    /// and dropped without tearing down the assembler, except a
    /// malformed Header for a frame with no existing assembly, which
    /// fails the frame.
    pub fn handle_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        match Packet::parse(bytes) {
            Ok(packet) => self.handle_packet(packet),
            Err(CodecError::Protocol(msg)) => {
                let looks_like_header =
                    bytes.len() >= 3 && bytes[2] == PacketType::Header as u8;
                let frame_known = bytes.len() >= 2
                    && self
                        .frames
                        .contains_key(&u16::from_le_bytes([bytes[0], bytes[1]]));
                if looks_like_header && !frame_known {
                    return Err(CodecError::Protocol(msg));
                }
                log::warn!("dropping packet: {}", msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Feeds one parsed packet, advancing the owning frame's assembly.
    pub fn handle_packet(&mut self, packet: Packet) -> CodecResult<()> {
        match packet {
            Packet::Header {
                frame_id,
                width,
                height,
                macroblock_size,
            } => {
                if macroblock_size == 0 {
                    if self.frames.contains_key(&frame_id) {
                        log::warn!("frame {}: dropping header with zero macroblock size", frame_id);
                        return Ok(());
                    }
                    return Err(CodecError::Protocol(format!(
                        "frame {}: header has zero macroblock size",
                        frame_id
                    )));
                }
                log::debug!(
                    "frame {}: header {}x{} at macroblock size {}",
                    frame_id,
                    width,
                    height,
                    macroblock_size
                );
                self.frames.insert(
                    frame_id,
                    FrameAssembly::new(frame_id, width, height, macroblock_size),
                );
            }
            Packet::Dictionary { frame_id, entries } => match self.frames.get_mut(&frame_id) {
                Some(assembly) => {
                    assembly.symbols = Some(EncodingDictionary::from_entries(entries));
                }
                None => log::warn!("frame {}: dictionary before header, dropped", frame_id),
            },
            Packet::Body {
                frame_id,
                macroblock_index,
                pairs,
            } => match self.frames.get_mut(&frame_id) {
                Some(assembly) => {
                    let index = macroblock_index as usize;
                    if index >= assembly.slots.len() {
                        log::warn!(
                            "frame {}: macroblock index {} out of range ({} slots), dropped",
                            frame_id,
                            index,
                            assembly.slots.len()
                        );
                    } else {
                        // re-delivery overwrites: idempotent and order-safe
                        assembly.slots[index] = Some(pairs);
                    }
                }
                None => log::warn!("frame {}: body before header, dropped", frame_id),
            },
            Packet::Tail { frame_id } => match self.frames.get_mut(&frame_id) {
                Some(assembly) => {
                    assembly.complete = true;
                    log::debug!(
                        "frame {}: complete, {}/{} slots filled",
                        frame_id,
                        assembly.slots.iter().filter(|s| s.is_some()).count(),
                        assembly.slots.len()
                    );
                }
                None => log::warn!("frame {}: tail before header, dropped", frame_id),
            },
        }
        Ok(())
    }
}
