//! Shared types and limits used across the bridge.

/// Maximum number of channels an [`AudioBuffer`](crate::AudioBuffer) can carry.
///
/// Channel pointers are held in fixed-size arrays so that building a buffer
/// on the audio thread never allocates.
pub const MAX_CHANNELS: usize = 32;

/// Sample rate assumed until the host reports one.
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Maximum block size assumed until the host reports one.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 1024;

/// Index of a parameter within a [`ParameterSet`](crate::ParameterSet).
pub type ParameterIndex = usize;

/// Host-normalized parameter value in `[0.0, 1.0]`.
///
/// Stored as `f64` so the fixed-point host encoding round-trips exactly.
pub type ParameterValue = f64;

/// Outcome of one real-time call, reported to the host adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The processor rendered the block.
    Processed,
    /// Bypass was engaged; `process_bypassed` ran instead.
    Bypassed,
    /// Processing is suspended; outputs were silenced.
    Suspended,
    /// The bridge was not ready. Inputs passed through, remaining outputs
    /// were silenced, and preparation was scheduled off the audio thread.
    Deferred,
}

impl ProcessStatus {
    /// Whether the processor itself ran for this block.
    pub fn is_processed(self) -> bool {
        matches!(self, ProcessStatus::Processed)
    }
}
