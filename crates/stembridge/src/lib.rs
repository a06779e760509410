//! # stembridge
//!
//! Real-time audio plugin bridge for control-surface style hosts.
//!
//! ## Architecture
//!
//! ```text
//! Your processor (implements AudioProcessor)
//!        ↓
//! AudioBridge<P> (lifecycle, parameters, state)
//!        ↓
//! HostAdapter<P> / RenderPort<P> (host callbacks)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stembridge::prelude::*;
//!
//! struct Invert;
//!
//! impl AudioProcessor for Invert {
//!     fn process(&mut self, buffer: &mut AudioBuffer, _events: &MidiBuffer, _context: &ProcessContext) {
//!         for channel in buffer.channels_mut() {
//!             channel.iter_mut().for_each(|s| *s = -*s);
//!         }
//!     }
//! }
//!
//! static CONFIG: PluginConfig = PluginConfig::new("Invert", fourcc!(b"Mfgr"), fourcc!(b"Invt"));
//!
//! let adapter = HostAdapter::new(&CONFIG, Invert, ParameterSet::empty(), HostServices::new());
//! ```

// Re-export sub-crates
pub use stembridge_core as core;

#[cfg(feature = "host")]
pub use stembridge_host as host;

pub use stembridge_core::fourcc;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use stembridge::prelude::*;
/// ```
pub mod prelude {
    pub use stembridge_core::{
        // Bridge and processing contract
        AudioBridge, AudioProcessor, ProcessSetup, ProcessStatus,
        // Buffers
        AudioBuffer, MidiBuffer, MidiEvent,
        // Parameters and state
        Formatter, ParameterFlags, ParameterIndex, ParameterInfo, ParameterSet, ParameterValue,
        PersistedState,
        // Transport
        FrameRate, ProcessContext, TimelineReading, Transport,
        // Host capabilities
        DetachedHost, HostServices, ManualScheduler, MidiTimelineSource, ParameterHost,
        PrepareScheduler, StateStore, WorkerScheduler,
        // Static configuration
        Category, ChannelConfiguration, FourCharCode, PluginConfig, SampleRateSupport,
        // Errors
        BridgeError, BridgeResult, ErrorKind,
        // Limits
        MAX_CHANNELS,
    };

    pub use stembridge_core::fixed_point;
    pub use stembridge_core::fourcc;

    #[cfg(feature = "host")]
    pub use stembridge_host::{
        ControlDescriptor, ControlSurface, ControlSurfaceHost, ControlTarget, EffectType,
        HostAdapter, MidiPacket, RenderPort, SharedRuntime, StemFormat, STATE_CHUNK_ID,
    };
}
