//! Error types for the bridge.

use thiserror::Error;

use crate::config::FourCharCode;

/// Errors reported by bridge operations.
///
/// Real-time contract violations (too many samples, event offsets past the
/// block) are not represented here: they assert in debug builds and are
/// clamped in release builds.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid sample rate: {0} (must be finite and greater than zero)")]
    InvalidSampleRate(f64),

    #[error("invalid maximum block size: {0} (must be greater than zero)")]
    InvalidBlockSize(usize),

    #[error("channel layout {inputs} in / {outputs} out exceeds the {max} channel limit")]
    ChannelLimit {
        inputs: usize,
        outputs: usize,
        max: usize,
    },

    #[error("parameter index {index} out of range (parameter count {count})")]
    ParameterIndexOutOfRange { index: usize, count: usize },

    #[error("parameter {index} received a non-finite value")]
    NonFiniteValue { index: usize },

    #[error("corrupt state: {0}")]
    CorruptState(String),

    #[error("unknown chunk id '{0}'")]
    UnknownChunk(FourCharCode),

    #[error("state encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Broad class of a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid sample rate, block size or channel layout. Fatal to the
    /// `prepare`/`configure` call only.
    Configuration,
    /// Bad parameter index or value. Non-fatal.
    Parameter,
    /// Malformed persisted state. The current state is left unchanged.
    State,
}

impl BridgeError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidSampleRate(_)
            | BridgeError::InvalidBlockSize(_)
            | BridgeError::ChannelLimit { .. } => ErrorKind::Configuration,
            BridgeError::ParameterIndexOutOfRange { .. } | BridgeError::NonFiniteValue { .. } => {
                ErrorKind::Parameter
            }
            BridgeError::CorruptState(_)
            | BridgeError::UnknownChunk(_)
            | BridgeError::Encoding(_) => ErrorKind::State,
        }
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
