//! In-place audio buffer handed to processors.
//!
//! The host delivers one slice per channel. The first `num_input_channels`
//! slices carry input on entry, the first `num_output_channels` slices are
//! read back as output on return. The buffer holds
//! `max(num_input_channels, num_output_channels)` channels, all with the
//! same length, and is never resized during a call.

use crate::types::MAX_CHANNELS;

/// Per-channel sample slices for one processing call.
pub struct AudioBuffer<'a, 's> {
    channels: &'a mut [&'s mut [f32]],
    num_inputs: usize,
    num_outputs: usize,
    num_samples: usize,
}

impl<'a, 's> AudioBuffer<'a, 's> {
    /// Wrap host channel slices.
    ///
    /// Channels past [`MAX_CHANNELS`] are ignored. Channel counts are limited
    /// to the number of slices, and `num_samples` to the shortest slice, so
    /// a malformed call can never index out of bounds.
    pub fn new(
        channels: &'a mut [&'s mut [f32]],
        num_inputs: usize,
        num_outputs: usize,
        num_samples: usize,
    ) -> Self {
        let available = channels.len().min(MAX_CHANNELS);
        let channels = &mut channels[..available];
        let shortest = channels.iter().map(|c| c.len()).min().unwrap_or(0);

        Self {
            num_inputs: num_inputs.min(available),
            num_outputs: num_outputs.min(available),
            num_samples: num_samples.min(shortest),
            channels,
        }
    }

    /// Number of samples per channel in this call.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Number of channels in the buffer.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of channels carrying input.
    #[inline]
    pub fn num_input_channels(&self) -> usize {
        self.num_inputs
    }

    /// Number of channels read back as output.
    #[inline]
    pub fn num_output_channels(&self) -> usize {
        self.num_outputs
    }

    /// Get a channel's samples.
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel][..self.num_samples]
    }

    /// Get a mutable reference to a channel's samples.
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel][..self.num_samples]
    }

    /// Get a mutable channel, or `None` if it doesn't exist.
    #[inline]
    pub fn get_channel_mut(&mut self, channel: usize) -> Option<&mut [f32]> {
        let num_samples = self.num_samples;
        self.channels.get_mut(channel).map(|c| &mut c[..num_samples])
    }

    /// Borrow channels 0 and 1 at the same time.
    ///
    /// Returns `None` when the buffer has fewer than two channels.
    pub fn stereo_pair_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        let num_samples = self.num_samples;
        match &mut self.channels[..] {
            [left, right, ..] => Some((&mut left[..num_samples], &mut right[..num_samples])),
            _ => None,
        }
    }

    /// Iterate over all channels mutably.
    #[inline]
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> + use<'_, 'a, 's> {
        let num_samples = self.num_samples;
        self.channels.iter_mut().map(move |c| &mut c[..num_samples])
    }

    /// Zero one channel. Out-of-range indices are ignored.
    pub fn clear_channel(&mut self, channel: usize) {
        if let Some(samples) = self.get_channel_mut(channel) {
            samples.fill(0.0);
        }
    }

    /// Zero every output channel that received no input.
    pub fn clear_unused_outputs(&mut self) {
        for ch in self.num_inputs..self.num_outputs {
            self.clear_channel(ch);
        }
    }

    /// Zero all output channels.
    pub fn clear_outputs(&mut self) {
        for ch in 0..self.num_outputs {
            self.clear_channel(ch);
        }
    }

    /// Shorten the processed region of this call.
    pub(crate) fn limit_samples(&mut self, num_samples: usize) {
        self.num_samples = self.num_samples.min(num_samples);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_are_limited() {
        let mut a = [1.0f32; 8];
        let mut b = [2.0f32; 4];
        let mut channels: [&mut [f32]; 2] = [&mut a, &mut b];
        let buffer = AudioBuffer::new(&mut channels, 5, 2, 100);

        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.num_input_channels(), 2);
        assert_eq!(buffer.num_output_channels(), 2);
        // limited to the shortest channel
        assert_eq!(buffer.num_samples(), 4);
    }

    #[test]
    fn test_clear_unused_outputs() {
        let mut a = [0.5f32; 4];
        let mut b = [0.25f32; 4];
        let mut c = [f32::NAN; 4];
        let mut d = [7.0f32; 4];
        let mut channels: [&mut [f32]; 4] = [&mut a, &mut b, &mut c, &mut d];
        let mut buffer = AudioBuffer::new(&mut channels, 2, 4, 4);

        buffer.clear_unused_outputs();

        assert_eq!(buffer.channel(0), &[0.5; 4]);
        assert_eq!(buffer.channel(1), &[0.25; 4]);
        assert_eq!(buffer.channel(2), &[0.0; 4]);
        assert_eq!(buffer.channel(3), &[0.0; 4]);
    }

    #[test]
    fn test_input_only_channels_are_not_outputs() {
        let mut a = [1.0f32; 2];
        let mut b = [1.0f32; 2];
        let mut channels: [&mut [f32]; 2] = [&mut a, &mut b];
        let mut buffer = AudioBuffer::new(&mut channels, 2, 1, 2);

        buffer.clear_outputs();

        assert_eq!(buffer.channel(0), &[0.0; 2]);
        assert_eq!(buffer.channel(1), &[1.0; 2]);
    }

    #[test]
    fn test_stereo_pair() {
        let mut a = [1.0f32, 2.0];
        let mut b = [3.0f32, 4.0];
        let mut channels: [&mut [f32]; 2] = [&mut a, &mut b];
        let mut buffer = AudioBuffer::new(&mut channels, 2, 2, 2);

        let (left, right) = buffer.stereo_pair_mut().unwrap();
        left[0] = right[1];
        assert_eq!(buffer.channel(0), &[4.0, 2.0]);

        let mut mono = [0.0f32; 2];
        let mut channels: [&mut [f32]; 1] = [&mut mono];
        let mut buffer = AudioBuffer::new(&mut channels, 1, 1, 2);
        assert!(buffer.stereo_pair_mut().is_none());
    }

    #[test]
    fn test_limit_samples() {
        let mut a = [1.0f32; 8];
        let mut channels: [&mut [f32]; 1] = [&mut a];
        let mut buffer = AudioBuffer::new(&mut channels, 0, 1, 8);

        buffer.limit_samples(3);
        buffer.clear_outputs();
        drop(buffer);

        assert_eq!(a, [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_channels_mut_limits_length() {
        let mut a = [1.0f32; 4];
        let mut b = [2.0f32; 4];
        let mut channels: [&mut [f32]; 2] = [&mut a, &mut b];
        let mut buffer = AudioBuffer::new(&mut channels, 2, 2, 4);
        buffer.limit_samples(2);

        for channel in buffer.channels_mut() {
            assert_eq!(channel.len(), 2);
            channel.fill(0.0);
        }
        assert_eq!(buffer.channel(1), &[0.0, 0.0]);
        drop(buffer);

        assert_eq!(a, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(b, [0.0, 0.0, 2.0, 2.0]);
    }
}
