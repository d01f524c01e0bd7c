use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Input error: {0}")]
    Input(String),

    #[error("image {width}x{height} is not divisible by macroblock size {macroblock_size}")]
    Geometry {
        width: usize,
        height: usize,
        macroblock_size: usize,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type CodecResult<T> = Result<T, CodecError>;
