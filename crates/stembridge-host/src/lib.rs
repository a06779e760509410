//! Control-surface host adapter for stembridge.
//!
//! Maps the bridge onto hosts that address plugins through integer control
//! indices, fixed-point control values, chunked state and named stem
//! formats.
//!
//! ```text
//! host callbacks ──► HostAdapter ──► AudioBridge ──► AudioProcessor
//! audio callback ──► RenderPort ───┘
//! ```

pub mod adapter;
pub mod chunk;
pub mod controls;
pub mod runtime;
pub mod stem;

pub use adapter::{HostAdapter, MidiPacket, RenderPort};
pub use chunk::{ChunkStore, CHUNK_HEADER_BYTES, STATE_CHUNK_ID};
pub use controls::{
    control_index, ControlDescriptor, ControlKind, ControlSurface, ControlSurfaceHost,
    ControlTarget, FIRST_PARAMETER_CONTROL, MASTER_BYPASS_CONTROL,
};
pub use runtime::{RuntimeLease, SharedRuntime};
pub use stem::{effect_types, EffectType, StemFormat, EFFECT_TYPE_BASE};
