//! Core of the stembridge plugin bridge.
//!
//! This crate is format-agnostic. It defines the processing contract a
//! plugin implements ([`AudioProcessor`]), the bridge that drives it from a
//! host transport ([`AudioBridge`]), and the pieces the bridge is built from:
//! parameters, state persistence, transport snapshots, MIDI event buffers,
//! and the narrow host capability traits in [`host`].
//!
//! Host-specific glue (control numbering, chunk headers, stem formats) lives
//! in `stembridge-host`.

pub mod bridge;
pub mod buffer;
pub mod config;
pub mod error;
pub mod fixed_point;
pub mod host;
pub mod lifecycle;
pub mod midi;
pub mod parameter_format;
pub mod parameters;
pub mod processor;
pub mod scheduler;
pub mod scratch;
pub mod state;
pub mod transport;
pub mod types;

// Re-exports
pub use bridge::AudioBridge;
pub use buffer::AudioBuffer;
pub use config::{
    Category, ChannelConfiguration, FourCharCode, PluginConfig, SampleRateSupport,
};
pub use error::{BridgeError, BridgeResult, ErrorKind};
pub use host::{DetachedHost, HostServices, MidiTimelineSource, ParameterHost, StateStore};
pub use lifecycle::Phase;
pub use midi::{MidiBuffer, MidiEvent, DEFAULT_MIDI_CAPACITY, MAX_MESSAGE_BYTES};
pub use parameter_format::Formatter;
pub use parameters::{ParameterFlags, ParameterInfo, ParameterSet};
pub use processor::{AudioProcessor, ProcessSetup};
pub use scheduler::{DeferredTask, ManualScheduler, PrepareScheduler, WorkerScheduler};
pub use scratch::ScratchBuffers;
pub use state::PersistedState;
pub use transport::{FrameRate, ProcessContext, TimelineReading, Transport};
pub use types::{
    ParameterIndex, ParameterValue, ProcessStatus, DEFAULT_MAX_BLOCK_SIZE, DEFAULT_SAMPLE_RATE,
    MAX_CHANNELS,
};
