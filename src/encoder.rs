use crate::codec::engine::{encode_frame, EncoderConfig};
use crate::error::CodecResult;
use crate::format::packet::Bitstream;
use crate::raster::Image;

/// High-level encoding surface over [`EncoderConfig`] and the frame
/// coordinator.
pub struct FrameEncoder {
    config: EncoderConfig,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self {
            config: EncoderConfig::default(),
        }
    }

    pub fn with_config(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn macroblock_size(mut self, size: usize) -> Self {
        self.config.macroblock_size = size;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers.max(1);
        self
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn encode(&self, img: &Image, frame_id: u16) -> CodecResult<Bitstream> {
        encode_frame(img, frame_id, &self.config)
    }

    pub fn encode_to_vec(&self, img: &Image, frame_id: u16) -> CodecResult<Vec<u8>> {
        self.encode(img, frame_id)?.to_bytes()
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}
