pub mod assembler;
pub mod packet;

pub use assembler::{AssemblyState, FrameAssembler, FrameAssembly};
pub use packet::{Bitstream, Packet, PacketType};
