//! Capabilities the host provides to the bridge.
//!
//! Instead of one processor type inheriting from every host interface, the
//! bridge talks to a handful of narrow traits injected at construction:
//!
//! - [`ParameterHost`] receives plugin-originated parameter changes and
//!   automation gestures.
//! - [`MidiTimelineSource`] answers timeline queries once per block.
//! - [`PrepareScheduler`](crate::PrepareScheduler) runs deferred
//!   preparation off the audio thread.
//!
//! The bridge in turn implements [`StateStore`] for the host's persistence
//! mechanism.

use std::sync::Arc;

use crate::error::BridgeResult;
use crate::scheduler::{PrepareScheduler, WorkerScheduler};
use crate::transport::TimelineReading;
use crate::types::{ParameterIndex, ParameterValue};

/// Receives parameter changes that originate inside the plugin.
///
/// Host automation writes do not come back through this trait.
pub trait ParameterHost: Send + Sync {
    /// A parameter was changed by the plugin or its editor.
    fn parameter_changed(&self, index: ParameterIndex, value: ParameterValue);

    /// The user started an interactive change.
    fn begin_gesture(&self, index: ParameterIndex);

    /// The user finished an interactive change.
    fn end_gesture(&self, index: ParameterIndex);
}

/// Read-only access to the host's timeline.
///
/// Called at most once per block on the audio thread; implementations must
/// not block or allocate.
pub trait MidiTimelineSource: Send + Sync {
    /// Current timeline values, or `None` if the host cannot report them.
    fn read_timeline(&self) -> Option<TimelineReading>;
}

/// Opaque state persistence.
pub trait StateStore {
    /// Serialize the current state.
    fn snapshot(&self) -> BridgeResult<Vec<u8>>;

    /// Replace the current state. Leaves state untouched on failure.
    fn restore(&self, bytes: &[u8]) -> BridgeResult<()>;
}

/// [`ParameterHost`] that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedHost;

impl ParameterHost for DetachedHost {
    fn parameter_changed(&self, _index: ParameterIndex, _value: ParameterValue) {}
    fn begin_gesture(&self, _index: ParameterIndex) {}
    fn end_gesture(&self, _index: ParameterIndex) {}
}

impl MidiTimelineSource for DetachedHost {
    fn read_timeline(&self) -> Option<TimelineReading> {
        None
    }
}

/// The set of host capabilities handed to an
/// [`AudioBridge`](crate::AudioBridge).
#[derive(Clone)]
pub struct HostServices {
    pub parameters: Arc<dyn ParameterHost>,
    pub timeline: Arc<dyn MidiTimelineSource>,
    pub scheduler: Arc<dyn PrepareScheduler>,
}

impl HostServices {
    /// Detached host capabilities with a background preparation worker.
    pub fn new() -> Self {
        Self {
            parameters: Arc::new(DetachedHost),
            timeline: Arc::new(DetachedHost),
            scheduler: Arc::new(WorkerScheduler::new()),
        }
    }

    pub fn with_parameter_host(mut self, host: Arc<dyn ParameterHost>) -> Self {
        self.parameters = host;
        self
    }

    pub fn with_timeline(mut self, timeline: Arc<dyn MidiTimelineSource>) -> Self {
        self.timeline = timeline;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn PrepareScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }
}

impl Default for HostServices {
    fn default() -> Self {
        Self::new()
    }
}
