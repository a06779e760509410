//! Pre-allocated per-channel scratch buffers.
//!
//! Hosts that hand separate input and output pointers need somewhere to put
//! input channels that have no matching output. `ScratchBuffers` reserves one
//! block-sized buffer per channel during preparation so nothing is allocated
//! on the audio thread.

/// One `max_block_size` buffer per channel.
#[derive(Debug, Default)]
pub struct ScratchBuffers {
    channels: Vec<Vec<f32>>,
    max_block_size: usize,
}

impl ScratchBuffers {
    /// Empty scratch space (nothing reserved).
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `num_channels` zeroed buffers of `max_block_size` samples.
    pub fn allocate(num_channels: usize, max_block_size: usize) -> Self {
        Self {
            channels: (0..num_channels).map(|_| vec![0.0; max_block_size]).collect(),
            max_block_size,
        }
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// The first `num_samples` samples of a channel, or `None` if the
    /// channel or length exceeds what was reserved.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize, num_samples: usize) -> Option<&mut [f32]> {
        self.channels
            .get_mut(channel)
            .filter(|_| num_samples <= self.max_block_size)
            .map(|buffer| &mut buffer[..num_samples])
    }

    /// All channels, each limited to `num_samples` samples.
    pub fn channels_mut(&mut self, num_samples: usize) -> impl Iterator<Item = &mut [f32]> {
        let num_samples = num_samples.min(self.max_block_size);
        self.channels
            .iter_mut()
            .map(move |buffer| &mut buffer[..num_samples])
    }
}
