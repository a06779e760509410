//! Host timeline and per-block process context.
//!
//! Hosts report their timeline as raw counters ([`TimelineReading`]): a
//! sample location, a tick position and a timecode rate code. The bridge
//! converts that once per block into a [`Transport`], which processors read
//! through [`ProcessContext`].
//!
//! # Example: Tempo-Synced Effect
//!
//! ```ignore
//! fn process(&mut self, buffer: &mut AudioBuffer, _events: &MidiBuffer, context: &ProcessContext) {
//!     // one LFO cycle per bar
//!     let beats_per_bar = context.transport.time_sig_numerator as f64;
//!     let lfo_hz = context.transport.tempo / 60.0 / beats_per_bar;
//!     let samples_per_cycle = context.sample_rate / lfo_hz;
//!     // ...
//! }
//! ```

use crate::parameters::ParameterSet;

/// Ticks per quarter note in the host's tick position.
pub const TICKS_PER_QUARTER_NOTE: f64 = 960_000.0;

/// Tempo reported when the host provides none.
pub const DEFAULT_TEMPO: f64 = 120.0;

// =============================================================================
// FrameRate
// =============================================================================

/// SMPTE frame rate used for timecode display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRate {
    /// 23.976 fps (film pulled down to video)
    Fps23976,
    /// 24 fps (film)
    Fps24,
    /// 25 fps (PAL video)
    Fps25,
    /// 29.97 fps non-drop (NTSC video)
    Fps2997,
    /// 29.97 fps drop-frame (NTSC broadcast)
    Fps2997Drop,
    /// 30 fps
    Fps30,
    /// 30 fps drop-frame
    Fps30Drop,
}

impl FrameRate {
    /// Map the host's timecode rate code.
    ///
    /// Codes follow the host's enumeration order: 24, 25, 29.97 non-drop,
    /// 29.97 drop, 30 non-drop, 30 drop, 23.976. Anything else is unknown.
    pub fn from_host_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Fps24),
            1 => Some(Self::Fps25),
            2 => Some(Self::Fps2997),
            3 => Some(Self::Fps2997Drop),
            4 => Some(Self::Fps30),
            5 => Some(Self::Fps30Drop),
            6 => Some(Self::Fps23976),
            _ => None,
        }
    }

    /// Frames per second. Drop-frame rates return their actual rate.
    #[inline]
    pub fn fps(&self) -> f64 {
        match self {
            Self::Fps23976 => 23.976,
            Self::Fps24 => 24.0,
            Self::Fps25 => 25.0,
            Self::Fps2997 | Self::Fps2997Drop => 29.970_029_97,
            Self::Fps30 | Self::Fps30Drop => 30.0,
        }
    }

    /// Returns true if this is a drop-frame format.
    #[inline]
    pub fn is_drop_frame(&self) -> bool {
        matches!(self, Self::Fps2997Drop | Self::Fps30Drop)
    }
}

// =============================================================================
// TimelineReading
// =============================================================================

/// Raw timeline values as the host reports them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineReading {
    pub tempo: f64,
    pub meter_numerator: i32,
    pub meter_denominator: i32,
    pub is_playing: bool,
    /// Playback position in samples.
    pub sample_location: i64,
    /// Musical position in host ticks ([`TICKS_PER_QUARTER_NOTE`] per beat).
    pub tick_position: i64,
    /// Host timecode rate code, see [`FrameRate::from_host_code`].
    pub frame_rate_code: i32,
    /// Timecode offset of the session start, in frames.
    pub frame_offset: i64,
}

impl Default for TimelineReading {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            meter_numerator: 4,
            meter_denominator: 4,
            is_playing: false,
            sample_location: 0,
            tick_position: 0,
            frame_rate_code: -1,
            frame_offset: 0,
        }
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Host transport state for the current block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transport {
    /// Tempo in BPM.
    pub tempo: f64,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
    /// Position in samples from the start of the timeline.
    pub time_in_samples: i64,
    /// Position in seconds from the start of the timeline.
    pub time_in_seconds: f64,
    /// Position in quarter notes.
    pub ppq_position: f64,
    /// Position of the last bar start in quarter notes (0 when unknown).
    pub ppq_position_of_last_bar_start: f64,
    pub is_playing: bool,
    pub is_recording: bool,
    pub is_looping: bool,
    /// Timecode frame rate, `None` when the host reports none.
    pub frame_rate: Option<FrameRate>,
    /// Session start offset in seconds.
    pub edit_origin_seconds: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self::from_timeline(None, 0.0)
    }
}

impl Transport {
    /// Convert a host timeline reading.
    ///
    /// Without a reading the transport reports 120 BPM, 4/4, stopped at
    /// position zero. A non-positive sample rate leaves `time_in_seconds`
    /// at zero.
    pub fn from_timeline(reading: Option<&TimelineReading>, sample_rate: f64) -> Self {
        let default = TimelineReading::default();
        let reading = reading.unwrap_or(&default);

        let time_in_seconds = if sample_rate > 0.0 {
            reading.sample_location as f64 / sample_rate
        } else {
            0.0
        };

        let frame_rate = FrameRate::from_host_code(reading.frame_rate_code);
        let edit_origin_seconds = frame_rate
            .map(|rate| reading.frame_offset as f64 / rate.fps())
            .unwrap_or(0.0);

        // hosts report 0 before the session tempo map is read
        let tempo = if reading.tempo > 0.0 {
            reading.tempo
        } else {
            DEFAULT_TEMPO
        };
        let (time_sig_numerator, time_sig_denominator) =
            if reading.meter_numerator > 0 && reading.meter_denominator > 0 {
                (reading.meter_numerator, reading.meter_denominator)
            } else {
                (4, 4)
            };

        Self {
            tempo,
            time_sig_numerator,
            time_sig_denominator,
            time_in_samples: reading.sample_location,
            time_in_seconds,
            ppq_position: reading.tick_position as f64 / TICKS_PER_QUARTER_NOTE,
            ppq_position_of_last_bar_start: 0.0,
            is_playing: reading.is_playing,
            is_recording: false,
            is_looping: false,
            frame_rate,
            edit_origin_seconds,
        }
    }

    /// Samples per beat at the current tempo.
    #[inline]
    pub fn samples_per_beat(&self, sample_rate: f64) -> f64 {
        sample_rate * 60.0 / self.tempo
    }
}

// =============================================================================
// ProcessContext
// =============================================================================

/// Everything a processor can read about the current block besides audio
/// and MIDI.
#[derive(Clone, Copy)]
pub struct ProcessContext<'a> {
    pub sample_rate: f64,
    /// Samples in this block (after any clamping).
    pub num_samples: usize,
    pub transport: Transport,
    /// Current parameter values.
    pub parameters: &'a ParameterSet,
}

impl<'a> ProcessContext<'a> {
    pub fn new(
        sample_rate: f64,
        num_samples: usize,
        transport: Transport,
        parameters: &'a ParameterSet,
    ) -> Self {
        Self {
            sample_rate,
            num_samples,
            transport,
            parameters,
        }
    }

    /// Duration of this block in seconds.
    #[inline]
    pub fn block_duration(&self) -> f64 {
        self.num_samples as f64 / self.sample_rate
    }
}
