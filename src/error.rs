use thiserror::Error;

/// Errors raised while building or running a value function.
#[derive(Debug, Error)]
pub enum VfuncError {
    #[error("shape mismatch: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        expected: &'static str,
        actual: Vec<usize>,
    },
    #[error("network does not carry recurrent state")]
    NotRecurrent,
    #[error("recurrent networks are not supported by the normalized value function")]
    RecurrentUnsupported,
    #[error("data-parallel execution was not configured for this value function")]
    DataParallelUnavailable,
    #[error("standard deviation must be finite and positive, got {0}")]
    InvalidStd(f32),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("tensor data could not be read: {0}")]
    TensorData(String),
    #[error("statistics encoding failed: {0}")]
    Encoding(#[from] StatsCodecError),
}

/// Failures of the statistics byte codec.
#[derive(Debug, Error)]
pub enum StatsCodecError {
    #[error("encode: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("decode: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}
