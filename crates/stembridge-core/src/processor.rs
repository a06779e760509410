//! The processing contract plugins implement.
//!
//! # Example
//!
//! ```ignore
//! struct Gain;
//!
//! impl AudioProcessor for Gain {
//!     fn process(&mut self, buffer: &mut AudioBuffer, _events: &MidiBuffer, context: &ProcessContext) {
//!         let gain = context.parameters.load(0).unwrap_or(1.0) as f32;
//!         for channel in buffer.channels_mut() {
//!             channel.iter_mut().for_each(|s| *s *= gain);
//!         }
//!     }
//! }
//! ```

use crate::buffer::AudioBuffer;
use crate::error::{BridgeError, BridgeResult};
use crate::midi::MidiBuffer;
use crate::transport::ProcessContext;
use crate::types::{DEFAULT_MAX_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, MAX_CHANNELS};

// =============================================================================
// ProcessSetup
// =============================================================================

/// Sample rate, block size and channel layout a processor is prepared for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSetup {
    pub sample_rate: f64,
    pub max_block_size: usize,
    pub num_inputs: usize,
    pub num_outputs: usize,
}

impl ProcessSetup {
    pub const fn new(sample_rate: f64, max_block_size: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            num_inputs: 2,
            num_outputs: 2,
        }
    }

    pub const fn with_channels(mut self, num_inputs: usize, num_outputs: usize) -> Self {
        self.num_inputs = num_inputs;
        self.num_outputs = num_outputs;
        self
    }

    /// Channels a buffer needs to carry for this layout.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_inputs.max(self.num_outputs)
    }

    /// Check the setup is usable.
    pub fn validate(&self) -> BridgeResult<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(BridgeError::InvalidSampleRate(self.sample_rate));
        }
        if self.max_block_size == 0 {
            return Err(BridgeError::InvalidBlockSize(self.max_block_size));
        }
        if self.num_inputs > MAX_CHANNELS || self.num_outputs > MAX_CHANNELS {
            return Err(BridgeError::ChannelLimit {
                inputs: self.num_inputs,
                outputs: self.num_outputs,
                max: MAX_CHANNELS,
            });
        }
        Ok(())
    }
}

impl Default for ProcessSetup {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_MAX_BLOCK_SIZE)
    }
}

// =============================================================================
// AudioProcessor
// =============================================================================

/// User processing hooked into an [`AudioBridge`](crate::AudioBridge).
///
/// `prepare` and `release` run off the audio thread and may allocate.
/// `process` and `process_bypassed` run on the audio thread and must not
/// block or allocate.
pub trait AudioProcessor: Send + 'static {
    /// Get ready to process with the given setup.
    fn prepare(&mut self, _setup: &ProcessSetup) {}

    /// Free resources acquired in `prepare`.
    fn release(&mut self) {}

    /// Process one block in place.
    fn process(&mut self, buffer: &mut AudioBuffer, events: &MidiBuffer, context: &ProcessContext);

    /// Process one block while the host's bypass is engaged.
    ///
    /// The default leaves the buffer untouched, so inputs pass through.
    fn process_bypassed(
        &mut self,
        _buffer: &mut AudioBuffer,
        _events: &MidiBuffer,
        _context: &ProcessContext,
    ) {
    }

    /// Latency introduced by the processor, queried after `prepare`.
    fn latency_samples(&self) -> u32 {
        0
    }

    /// Length of the processor's tail after input stops, in seconds.
    fn tail_seconds(&self) -> f64 {
        0.0
    }

    /// Whether silent input always yields silent output.
    fn silence_in_produces_silence_out(&self) -> bool {
        true
    }
}
