//! TCP transport for framed packets.
//!
//! The byte stream carries raw packet bytes back to back; packets are
//! self-delimiting, so the receiver parses them straight off the
//! stream. Transport failures are reported per call; retry and backoff
//! are caller policy.

use std::io::{BufReader, ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use crate::error::{CodecError, CodecResult};
use crate::format::assembler::{FrameAssembler, FrameAssembly};
use crate::format::packet::{Bitstream, Packet};

const WRITE_DEADLINE: Duration = Duration::from_secs(1);

fn transport(err: std::io::Error) -> CodecError {
    CodecError::Transport(err.to_string())
}

/// Client side: connects and pushes packets with a write deadline.
pub struct PacketSender {
    stream: TcpStream,
}

impl PacketSender {
    pub fn connect(host: &str, port: u16) -> CodecResult<Self> {
        let stream = TcpStream::connect((host, port)).map_err(transport)?;
        stream
            .set_write_timeout(Some(WRITE_DEADLINE))
            .map_err(transport)?;
        log::info!("connected to {}:{}", host, port);
        Ok(Self { stream })
    }

    pub fn send_packet(&mut self, packet: &Packet) -> CodecResult<()> {
        let bytes = packet.to_bytes()?;
        log::debug!(
            "sending {:?} packet, {} bytes",
            packet.packet_type(),
            bytes.len()
        );
        self.stream.write_all(&bytes).map_err(transport)
    }

    /// Sends a whole frame in packet order.
    pub fn send_bitstream(&mut self, stream: &Bitstream) -> CodecResult<()> {
        for packet in stream.packets() {
            self.send_packet(packet)?;
        }
        self.stream.flush().map_err(transport)
    }
}

/// Server side: accepts connections and reassembles frames. Each
/// connection gets its own assembler, owned by the handling loop, so
/// slot writes are never raced.
pub struct PacketReceiver {
    listener: TcpListener,
}

impl PacketReceiver {
    pub fn bind(host: &str, port: u16) -> CodecResult<Self> {
        let listener = TcpListener::bind((host, port)).map_err(transport)?;
        log::info!("listening on {}:{}", host, port);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> CodecResult<std::net::SocketAddr> {
        self.listener.local_addr().map_err(transport)
    }

    /// Accepts connections forever, invoking `on_frame` for every frame
    /// that completes. Returns only on listener failure.
    pub fn serve<F>(&self, mut on_frame: F) -> CodecResult<()>
    where
        F: FnMut(FrameAssembly) -> CodecResult<()>,
    {
        for conn in self.listener.incoming() {
            let stream = conn.map_err(transport)?;
            let peer = stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".into());
            log::info!("client connected: {}", peer);
            if let Err(e) = handle_connection(stream, &mut on_frame) {
                log::error!("connection {}: {}", peer, e);
            }
            log::info!("client disconnected: {}", peer);
        }
        Ok(())
    }
}

fn handle_connection<F>(stream: TcpStream, on_frame: &mut F) -> CodecResult<()>
where
    F: FnMut(FrameAssembly) -> CodecResult<()>,
{
    let mut reader = BufReader::new(stream);
    let mut assembler = FrameAssembler::new();

    loop {
        let packet = match Packet::read_from(&mut reader) {
            Ok(packet) => packet,
            Err(CodecError::Protocol(msg)) => {
                // the stream cannot be resynchronized past an unknown
                // or truncated packet, so the connection ends here
                log::warn!("dropping remainder of stream: {}", msg);
                return Ok(());
            }
            Err(CodecError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };

        let frame_id = packet.frame_id();
        assembler.handle_packet(packet)?;
        if let Some(assembly) = assembler.take_complete(frame_id) {
            on_frame(assembly)?;
        }
    }
}
