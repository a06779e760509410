//! Timed MIDI events for one processing block.
//!
//! Events carry the raw protocol bytes and a sample offset relative to the
//! start of the block. [`MidiBuffer`] reserves its storage up front and keeps
//! events ordered by offset, so filling it on the audio thread never
//! allocates.

// =============================================================================
// MidiEvent
// =============================================================================

/// Longest raw message stored inline. Longer messages are rejected.
pub const MAX_MESSAGE_BYTES: usize = 32;

/// Number of events a [`MidiBuffer`] reserves by default.
pub const DEFAULT_MIDI_CAPACITY: usize = 2048;

/// A raw MIDI message at a sample offset within the current block.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    sample_offset: u32,
    len: u8,
    bytes: [u8; MAX_MESSAGE_BYTES],
}

impl MidiEvent {
    /// Build an event from raw bytes.
    ///
    /// Returns `None` for empty messages or messages longer than
    /// [`MAX_MESSAGE_BYTES`].
    pub fn new(sample_offset: u32, data: &[u8]) -> Option<Self> {
        if data.is_empty() || data.len() > MAX_MESSAGE_BYTES {
            return None;
        }
        let mut bytes = [0u8; MAX_MESSAGE_BYTES];
        bytes[..data.len()].copy_from_slice(data);
        Some(Self {
            sample_offset,
            len: data.len() as u8,
            bytes,
        })
    }

    /// Sample offset relative to the start of the block.
    #[inline]
    pub fn sample_offset(&self) -> u32 {
        self.sample_offset
    }

    /// The raw message bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Status byte of the message.
    #[inline]
    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    /// Channel (0-15) for channel voice messages, `None` for system messages.
    pub fn channel(&self) -> Option<u8> {
        (self.status() < 0xF0).then_some(self.status() & 0x0F)
    }
}

impl std::fmt::Debug for MidiEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiEvent")
            .field("sample_offset", &self.sample_offset)
            .field("data", &self.data())
            .finish()
    }
}

// =============================================================================
// MidiBuffer
// =============================================================================

/// Fixed-capacity, offset-ordered queue of MIDI events.
pub struct MidiBuffer {
    events: Vec<MidiEvent>,
    capacity: usize,
    /// Set to true when a push fails due to buffer exhaustion
    overflowed: bool,
}

impl MidiBuffer {
    /// Create a buffer holding up to [`DEFAULT_MIDI_CAPACITY`] events.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MIDI_CAPACITY)
    }

    /// Create a buffer holding up to `capacity` events.
    ///
    /// All storage is reserved here; pushes never reallocate.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
            overflowed: false,
        }
    }

    /// Maximum number of events this buffer holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear all events from the buffer.
    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
        self.overflowed = false;
    }

    /// Returns the number of events in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns true if any push failed since the last clear.
    #[inline]
    pub fn has_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Insert an event, keeping events ordered by sample offset.
    ///
    /// Events with equal offsets keep their insertion order. Returns `false`
    /// and sets the overflow flag when the buffer is full.
    pub fn push(&mut self, event: MidiEvent) -> bool {
        if self.events.len() >= self.capacity {
            self.overflowed = true;
            return false;
        }
        let position = self
            .events
            .partition_point(|e| e.sample_offset <= event.sample_offset);
        self.events.insert(position, event);
        true
    }

    /// Build and insert an event from raw bytes.
    ///
    /// Returns `false` if the message is empty, too long, or the buffer is
    /// full.
    pub fn push_raw(&mut self, sample_offset: u32, data: &[u8]) -> bool {
        match MidiEvent::new(sample_offset, data) {
            Some(event) => self.push(event),
            None => false,
        }
    }

    /// Clamp every offset into `[0, num_samples)`.
    ///
    /// Clamping is monotonic, so the ordering is preserved.
    pub fn clamp_offsets(&mut self, num_samples: usize) {
        let last = num_samples.saturating_sub(1).min(u32::MAX as usize) as u32;
        for event in &mut self.events {
            event.sample_offset = event.sample_offset.min(last);
        }
    }

    /// Whether every event lies within `[0, num_samples)`.
    pub fn offsets_within(&self, num_samples: usize) -> bool {
        self.events
            .last()
            .map_or(true, |e| (e.sample_offset as usize) < num_samples)
    }

    /// Iterate over events in offset order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &MidiEvent> {
        self.events.iter()
    }

    /// Get the events as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[MidiEvent] {
        &self.events
    }
}

impl Default for MidiBuffer {
    fn default() -> Self {
        Self::new()
    }
}
