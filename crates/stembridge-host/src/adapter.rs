//! The host adapter.
//!
//! [`HostAdapter`] turns the host's callbacks into bridge operations. Each
//! callback is a plain method named after the host event it handles; the
//! host glue calls them instead of overriding a base class.
//!
//! The real-time callback lives on a separate [`RenderPort`] so the audio
//! thread owns its MIDI buffer outright.

use stembridge_core::config::PluginConfig;
use stembridge_core::fixed_point;
use stembridge_core::{
    AudioBridge, AudioProcessor, BridgeResult, FourCharCode, HostServices, MidiBuffer,
    ParameterSet, ProcessStatus,
};

use crate::chunk::ChunkStore;
use crate::controls::{ControlDescriptor, ControlTarget, MASTER_BYPASS_CONTROL};
use crate::runtime::{RuntimeLease, SharedRuntime};
use crate::stem::{effect_types, EffectType};

// =============================================================================
// HostAdapter
// =============================================================================

/// One plugin instance as seen by a control-surface host.
pub struct HostAdapter<P: AudioProcessor> {
    config: &'static PluginConfig,
    bridge: AudioBridge<P>,
    chunks: ChunkStore,
    render_port: Option<RenderPort<P>>,
    _lease: RuntimeLease<'static>,
}

impl<P: AudioProcessor> HostAdapter<P> {
    /// Create an instance registered with the process-wide runtime.
    pub fn new(
        config: &'static PluginConfig,
        processor: P,
        parameters: ParameterSet,
        services: HostServices,
    ) -> Self {
        Self::with_runtime(SharedRuntime::global(), config, processor, parameters, services)
    }

    /// Create an instance registered with a specific runtime.
    pub fn with_runtime(
        runtime: &'static SharedRuntime,
        config: &'static PluginConfig,
        processor: P,
        parameters: ParameterSet,
        services: HostServices,
    ) -> Self {
        let lease = runtime.acquire();
        let bridge = AudioBridge::new(processor, parameters, services);
        let render_port = RenderPort {
            bridge: bridge.clone(),
            events: MidiBuffer::new(),
            accepts_midi: config.accepts_midi,
        };
        log::debug!("created instance of '{}'", config.name);

        Self {
            config,
            bridge,
            chunks: ChunkStore::default(),
            render_port: Some(render_port),
            _lease: lease,
        }
    }

    pub fn config(&self) -> &'static PluginConfig {
        self.config
    }

    pub fn bridge(&self) -> &AudioBridge<P> {
        &self.bridge
    }

    /// Hand the real-time callback to the audio thread. Only the first call
    /// returns a port.
    pub fn take_render_port(&mut self) -> Option<RenderPort<P>> {
        self.render_port.take()
    }

    /// Effect types to register, one per preferred channel configuration.
    pub fn effect_types(&self) -> Vec<EffectType> {
        effect_types(self.config)
    }

    // =========================================================================
    // Host callbacks
    // =========================================================================

    /// Instance initialization: declares the channel layout and returns the
    /// controls to register.
    pub fn on_init(&self) -> BridgeResult<Vec<ControlDescriptor>> {
        let (inputs, outputs) = self.config.default_layout();
        self.bridge.set_channel_layout(inputs, outputs)?;

        let mut controls = ControlDescriptor::describe(self.bridge.parameters());
        if !self.config.can_bypass {
            controls.retain(|c| c.control_index != MASTER_BYPASS_CONTROL);
        }
        Ok(controls)
    }

    /// The host's transport characteristics changed. Preparation happens on
    /// the first block that follows.
    pub fn on_prepare(&self, sample_rate: f64, max_block_size: usize) -> BridgeResult<()> {
        if !self.config.sample_rates.supports(sample_rate) {
            log::warn!(
                "sample rate {sample_rate} Hz exceeds declared support of {} Hz",
                self.config.sample_rates.max_hz()
            );
        }
        self.bridge.configure(sample_rate, max_block_size)
    }

    /// A host control changed. Returns what the control index referred to;
    /// [`ControlTarget::Unknown`] controls are left to the host.
    pub fn on_control_changed(&self, control_index: usize, value: i32) -> BridgeResult<ControlTarget> {
        let target = ControlTarget::resolve(control_index, self.bridge.parameter_count());
        match target {
            ControlTarget::Bypass => self.bridge.set_bypassed(value > 0),
            ControlTarget::Parameter(index) => {
                self.bridge.set_parameter(index, fixed_point::decode(value))?;
            }
            ControlTarget::Unknown => {}
        }
        Ok(target)
    }

    pub fn on_chunk_size_requested(&self, id: FourCharCode) -> BridgeResult<Option<usize>> {
        self.chunks.size(id, &self.bridge)
    }

    pub fn on_chunk_requested(&self, id: FourCharCode) -> BridgeResult<Option<Vec<u8>>> {
        self.chunks.chunk(id, &self.bridge)
    }

    pub fn on_chunk_restored(&self, id: FourCharCode, chunk: &[u8]) -> BridgeResult<Option<()>> {
        self.chunks.restore(id, chunk, &self.bridge)
    }

    /// Display text for `value` on a control, or `None` for unknown
    /// controls.
    pub fn control_value_string(&self, control_index: usize, value: i32) -> Option<String> {
        match ControlTarget::resolve(control_index, self.bridge.parameter_count()) {
            ControlTarget::Bypass => Some(if value > 0 { "On" } else { "Off" }.to_string()),
            ControlTarget::Parameter(index) => self
                .bridge
                .parameters()
                .text_for(index, fixed_point::decode(value))
                .ok(),
            ControlTarget::Unknown => None,
        }
    }

    /// Parse text typed into a control.
    ///
    /// Parameter text goes through the parameter's formatter first; text
    /// the formatter rejects is read as a plain normalized number.
    pub fn string_to_control_value(&self, control_index: usize, text: &str) -> Option<i32> {
        match ControlTarget::resolve(control_index, self.bridge.parameter_count()) {
            ControlTarget::Bypass => match text.trim().to_ascii_lowercase().as_str() {
                "on" | "1" | "true" => Some(1),
                "off" | "0" | "false" => Some(0),
                _ => None,
            },
            ControlTarget::Parameter(index) => {
                let parsed = self.bridge.parameters().parse(index, text).ok().flatten();
                let normalized = parsed.or_else(|| text.trim().parse::<f64>().ok())?;
                Some(fixed_point::encode(normalized))
            }
            ControlTarget::Unknown => None,
        }
    }

    pub fn latency_samples(&self) -> u32 {
        self.bridge.latency_samples()
    }

    pub fn touch_all_parameters(&self) {
        self.bridge.touch_all_parameters();
    }
}

impl<P: AudioProcessor> Drop for HostAdapter<P> {
    fn drop(&mut self) {
        log::debug!("destroying instance of '{}'", self.config.name);
    }
}

// =============================================================================
// RenderPort
// =============================================================================

/// A timestamped MIDI message from the host.
#[derive(Debug, Clone, Copy)]
pub struct MidiPacket<'a> {
    /// Sample offset within the block. The host may report values outside it.
    pub timestamp: i64,
    pub data: &'a [u8],
}

/// The real-time callback of one instance.
pub struct RenderPort<P: AudioProcessor> {
    bridge: AudioBridge<P>,
    events: MidiBuffer,
    accepts_midi: bool,
}

impl<P: AudioProcessor> RenderPort<P> {
    /// Render one block. Real-time safe.
    ///
    /// Packet timestamps are clamped into the block. Packets are ignored when
    /// the plugin does not accept MIDI.
    pub fn on_process(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        num_samples: usize,
        packets: &[MidiPacket],
    ) -> ProcessStatus {
        self.events.clear();
        if self.accepts_midi {
            let last = num_samples.saturating_sub(1) as i64;
            for packet in packets {
                let offset = packet.timestamp.clamp(0, last) as u32;
                self.events.push_raw(offset, packet.data);
            }
        }
        self.bridge.render(inputs, outputs, &mut self.events, num_samples)
    }

    /// Events delivered with the last block.
    pub fn events(&self) -> &MidiBuffer {
        &self.events
    }
}
