//! The audio processing bridge.
//!
//! [`AudioBridge`] sits between a host transport and an [`AudioProcessor`].
//! It owns the parameter set, validates and applies processing setups,
//! serializes state, and runs the processor on the audio thread under a
//! lock-free contract:
//!
//! - `process`/`render` never block, allocate or log.
//! - Until preparation has completed, blocks are passed through: input
//!   channels are left as they are and every other output is silenced.
//!   The first such block schedules preparation off the audio thread.
//! - After every block, outputs that received no input are zeroed.
//!
//! # Example
//!
//! ```ignore
//! let bridge = AudioBridge::new(MyProcessor::default(), parameters, HostServices::new());
//! bridge.prepare(48000.0, 512)?;
//!
//! // audio thread
//! let status = bridge.process(&mut buffer, &mut events, num_samples);
//! ```

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::AudioBuffer;
use crate::error::BridgeResult;
use crate::host::{HostServices, StateStore};
use crate::lifecycle::{Phase, PhaseCell};
use crate::midi::MidiBuffer;
use crate::parameters::ParameterSet;
use crate::processor::{AudioProcessor, ProcessSetup};
use crate::scheduler::DeferredTask;
use crate::scratch::ScratchBuffers;
use crate::state::PersistedState;
use crate::transport::{ProcessContext, Transport};
use crate::types::{ParameterIndex, ParameterValue, ProcessStatus, MAX_CHANNELS};

// =============================================================================
// Engine
// =============================================================================

/// State only touched by whoever holds the render or exclusive phase.
struct Engine<P> {
    processor: P,
    /// Whether `processor.prepare` has run without a matching `release`
    active: bool,
    setup: ProcessSetup,
    scratch: ScratchBuffers,
}

// =============================================================================
// BridgeInner
// =============================================================================

struct BridgeInner<P: AudioProcessor> {
    phase: PhaseCell,
    engine: UnsafeCell<Engine<P>>,
    parameters: Arc<ParameterSet>,
    host: HostServices,

    /// Setup the next preparation will use.
    requested: Mutex<ProcessSetup>,
    /// Setup the engine is currently prepared with.
    prepared: Mutex<Option<ProcessSetup>>,
    /// Serializes prepare, configure, release and processor access.
    setup_lock: Mutex<()>,
    /// Serializes snapshot and restore.
    state_lock: Mutex<()>,

    deferred_pending: AtomicBool,
    bypassed: AtomicBool,
    suspended: AtomicBool,
    latency: AtomicU32,
    /// `f64` bits
    tail_seconds: AtomicU64,
    silence_in_silence_out: AtomicBool,
}

// SAFETY: every field except `engine` is `Sync` on its own. `engine` is only
// dereferenced by the thread holding `Phase::Rendering` (the audio thread,
// through `RenderGuard`) or `Phase::Preparing` (a setup thread, through
// `ExclusiveGuard`). The phase transitions are compare-and-swaps with
// acquire/release ordering, so at most one thread holds either phase and
// its writes are visible to the next holder.
unsafe impl<P: AudioProcessor> Sync for BridgeInner<P> {}

impl<P: AudioProcessor> BridgeInner<P> {
    /// Derive a setup from the requested one and prepare the engine for it,
    /// replacing any previous preparation.
    ///
    /// The requested setup is read and written under `setup_lock`, so a
    /// concurrent `configure` is either seen here or lands afterwards.
    fn prepare_setup(&self, derive: impl FnOnce(ProcessSetup) -> ProcessSetup) -> BridgeResult<()> {
        let _setup = self.setup_lock.lock();
        let setup = derive(*self.requested.lock());
        setup.validate()?;
        *self.requested.lock() = setup;

        if *self.prepared.lock() == Some(setup) && self.phase.load() != Phase::Unprepared {
            return Ok(());
        }

        let mut access = self.phase.exclusive();
        // SAFETY: `access` holds `Phase::Preparing`, so no other thread is
        // using the engine until it is dropped.
        let engine = unsafe { &mut *self.engine.get() };

        if engine.active {
            engine.processor.release();
            engine.active = false;
        }

        engine.processor.prepare(&setup);
        engine.active = true;
        engine.setup = setup;
        engine.scratch = ScratchBuffers::allocate(setup.num_channels(), setup.max_block_size);

        self.latency
            .store(engine.processor.latency_samples(), Ordering::Relaxed);
        self.tail_seconds
            .store(engine.processor.tail_seconds().to_bits(), Ordering::Relaxed);
        self.silence_in_silence_out.store(
            engine.processor.silence_in_produces_silence_out(),
            Ordering::Relaxed,
        );

        *self.prepared.lock() = Some(setup);
        self.deferred_pending.store(false, Ordering::Release);
        access.set_ready(true);

        log::debug!(
            "prepared: {} Hz, max block {}, {} in / {} out",
            setup.sample_rate,
            setup.max_block_size,
            setup.num_inputs,
            setup.num_outputs
        );
        Ok(())
    }

    /// Derive and record a new requested setup, withdrawing readiness if it
    /// differs from the prepared one. The next block schedules preparation.
    fn request_setup(&self, derive: impl FnOnce(ProcessSetup) -> ProcessSetup) -> BridgeResult<()> {
        let _setup = self.setup_lock.lock();
        let setup = derive(*self.requested.lock());
        setup.validate()?;
        *self.requested.lock() = setup;

        let prepared = *self.prepared.lock();
        if prepared == Some(setup) || prepared.is_none() {
            return Ok(());
        }

        self.unprepare();
        log::debug!("setup changed; preparation deferred until the next block");
        Ok(())
    }

    /// Release the engine. Caller holds `setup_lock`.
    fn unprepare(&self) {
        let _access = self.phase.exclusive();
        // SAFETY: `_access` holds `Phase::Preparing`.
        let engine = unsafe { &mut *self.engine.get() };
        if engine.active {
            engine.processor.release();
            engine.active = false;
        }
        engine.scratch = ScratchBuffers::new();
        *self.prepared.lock() = None;
    }

    /// Raise the deferred-preparation flag once and ring the scheduler.
    #[inline]
    fn request_deferred_prepare(&self) {
        if !self.deferred_pending.swap(true, Ordering::AcqRel) {
            self.host.scheduler.trigger();
        }
    }

    /// Run one block with the engine held.
    fn render_block(
        &self,
        processor: &mut P,
        setup: &ProcessSetup,
        buffer: &mut AudioBuffer,
        events: &mut MidiBuffer,
        num_samples: usize,
    ) -> ProcessStatus {
        debug_assert!(
            num_samples <= setup.max_block_size,
            "block of {} samples exceeds prepared maximum {}",
            num_samples,
            setup.max_block_size
        );
        let num_samples = num_samples.min(setup.max_block_size);
        buffer.limit_samples(num_samples);
        let num_samples = buffer.num_samples();

        debug_assert!(
            events.offsets_within(num_samples),
            "MIDI event offset outside block of {} samples",
            num_samples
        );
        events.clamp_offsets(num_samples);

        let reading = self.host.timeline.read_timeline();
        let transport = Transport::from_timeline(reading.as_ref(), setup.sample_rate);
        let context = ProcessContext::new(
            setup.sample_rate,
            num_samples,
            transport,
            &self.parameters,
        );

        let status = if self.suspended.load(Ordering::Relaxed) {
            buffer.clear_outputs();
            ProcessStatus::Suspended
        } else if self.bypassed.load(Ordering::Relaxed) {
            processor.process_bypassed(buffer, events, &context);
            ProcessStatus::Bypassed
        } else {
            processor.process(buffer, events, &context);
            ProcessStatus::Processed
        };

        buffer.clear_unused_outputs();
        status
    }
}

impl<P: AudioProcessor> DeferredTask for BridgeInner<P> {
    fn run_deferred(&self) {
        if !self.deferred_pending.swap(false, Ordering::AcqRel) {
            return;
        }
        if self.phase.load() != Phase::Unprepared {
            return;
        }

        log::debug!("running deferred preparation");
        if let Err(e) = self.prepare_setup(|requested| requested) {
            log::error!("deferred preparation failed: {e}");
        }
    }
}

impl<P: AudioProcessor> Drop for BridgeInner<P> {
    fn drop(&mut self) {
        let engine = self.engine.get_mut();
        if engine.active {
            engine.processor.release();
            engine.active = false;
        }
    }
}

// =============================================================================
// AudioBridge
// =============================================================================

/// Mediates between a host transport and an [`AudioProcessor`].
///
/// Cloning yields another handle to the same bridge.
pub struct AudioBridge<P: AudioProcessor> {
    inner: Arc<BridgeInner<P>>,
}

impl<P: AudioProcessor> Clone for AudioBridge<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: AudioProcessor> AudioBridge<P> {
    /// Create an unprepared bridge.
    ///
    /// The requested setup starts at the defaults (44.1 kHz, 1024 samples,
    /// stereo) until `prepare`, `configure` or `set_channel_layout` say
    /// otherwise.
    pub fn new(processor: P, parameters: impl Into<Arc<ParameterSet>>, host: HostServices) -> Self {
        let silence = processor.silence_in_produces_silence_out();
        let inner = Arc::new(BridgeInner {
            phase: PhaseCell::new(),
            engine: UnsafeCell::new(Engine {
                processor,
                active: false,
                setup: ProcessSetup::default(),
                scratch: ScratchBuffers::new(),
            }),
            parameters: parameters.into(),
            host,
            requested: Mutex::new(ProcessSetup::default()),
            prepared: Mutex::new(None),
            setup_lock: Mutex::new(()),
            state_lock: Mutex::new(()),
            deferred_pending: AtomicBool::new(false),
            bypassed: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            latency: AtomicU32::new(0),
            tail_seconds: AtomicU64::new(0f64.to_bits()),
            silence_in_silence_out: AtomicBool::new(silence),
        });

        let task: Arc<dyn DeferredTask> = inner.clone();
        inner.host.scheduler.attach(Arc::downgrade(&task));

        Self { inner }
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Prepare synchronously for `sample_rate` and `max_block_size`, keeping
    /// the current channel layout.
    ///
    /// Preparing again with an unchanged setup does nothing. A changed setup
    /// releases the processor and prepares it again.
    pub fn prepare(&self, sample_rate: f64, max_block_size: usize) -> BridgeResult<()> {
        self.inner.prepare_setup(|requested| ProcessSetup {
            sample_rate,
            max_block_size,
            ..requested
        })
    }

    /// Prepare synchronously for a complete setup.
    pub fn prepare_with(&self, setup: ProcessSetup) -> BridgeResult<()> {
        self.inner.prepare_setup(|_| setup)
    }

    /// Record new transport characteristics without preparing.
    ///
    /// If the bridge was prepared with different values it stops processing;
    /// the next block passes audio through and schedules preparation.
    pub fn configure(&self, sample_rate: f64, max_block_size: usize) -> BridgeResult<()> {
        self.inner.request_setup(|requested| ProcessSetup {
            sample_rate,
            max_block_size,
            ..requested
        })
    }

    /// Declare the main channel layout, deferring preparation like
    /// [`configure`](Self::configure).
    pub fn set_channel_layout(&self, num_inputs: usize, num_outputs: usize) -> BridgeResult<()> {
        self.inner
            .request_setup(|requested| requested.with_channels(num_inputs, num_outputs))
    }

    /// Release the processor. Blocks pass through until prepared again.
    pub fn release(&self) {
        let _setup = self.inner.setup_lock.lock();
        self.inner.unprepare();
        self.inner.deferred_pending.store(false, Ordering::Release);
        log::debug!("released");
    }

    /// Whether blocks currently reach the processor.
    pub fn is_prepared(&self) -> bool {
        matches!(self.inner.phase.load(), Phase::Ready | Phase::Rendering)
    }

    /// Setup the engine is prepared with.
    pub fn prepared_setup(&self) -> Option<ProcessSetup> {
        *self.inner.prepared.lock()
    }

    /// Setup the next preparation will use.
    pub fn requested_setup(&self) -> ProcessSetup {
        *self.inner.requested.lock()
    }

    /// Whether a deferred preparation has been requested and not yet run.
    pub fn is_preparation_pending(&self) -> bool {
        self.inner.deferred_pending.load(Ordering::Acquire)
    }

    /// Processor latency reported at the last preparation.
    pub fn latency_samples(&self) -> u32 {
        self.inner.latency.load(Ordering::Relaxed)
    }

    /// Processor tail reported at the last preparation.
    pub fn tail_seconds(&self) -> f64 {
        f64::from_bits(self.inner.tail_seconds.load(Ordering::Relaxed))
    }

    /// Whether silent input yields silent output, as reported at the last
    /// preparation.
    pub fn silence_in_produces_silence_out(&self) -> bool {
        self.inner.silence_in_silence_out.load(Ordering::Relaxed)
    }

    /// Run `f` with exclusive access to the processor, off the audio thread.
    ///
    /// Waits for any block in flight. Blocks arriving meanwhile pass
    /// through.
    pub fn with_processor<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        let _setup = self.inner.setup_lock.lock();
        let mut access = self.inner.phase.exclusive();
        // SAFETY: `access` holds `Phase::Preparing`.
        let engine = unsafe { &mut *self.inner.engine.get() };
        let result = f(&mut engine.processor);
        let ready = access.was_ready();
        access.set_ready(ready);
        result
    }

    // =========================================================================
    // Processing
    // =========================================================================

    /// Process one block in place. Real-time safe.
    ///
    /// `num_samples` must not exceed the prepared maximum block size and
    /// event offsets must lie within the block; violations assert in debug
    /// builds and are clamped in release builds.
    pub fn process(
        &self,
        buffer: &mut AudioBuffer,
        events: &mut MidiBuffer,
        num_samples: usize,
    ) -> ProcessStatus {
        let inner = &*self.inner;
        let Some(_render) = inner.phase.try_render() else {
            inner.request_deferred_prepare();
            buffer.limit_samples(num_samples);
            buffer.clear_unused_outputs();
            return ProcessStatus::Deferred;
        };

        // SAFETY: `_render` holds `Phase::Rendering` until the end of this
        // function.
        let engine = unsafe { &mut *inner.engine.get() };
        let setup = engine.setup;
        inner.render_block(&mut engine.processor, &setup, buffer, events, num_samples)
    }

    /// Process one block given separate input and output channels.
    /// Real-time safe.
    ///
    /// Inputs are copied into outputs first. Inputs without a matching
    /// output are staged in scratch buffers reserved at preparation. When
    /// the bridge is not prepared, outputs with a matching input receive a
    /// copy of it and all others are silenced.
    pub fn render(
        &self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        events: &mut MidiBuffer,
        num_samples: usize,
    ) -> ProcessStatus {
        let inner = &*self.inner;
        let inputs = &inputs[..inputs.len().min(MAX_CHANNELS)];
        let num_outputs = outputs.len().min(MAX_CHANNELS);
        let outputs = &mut outputs[..num_outputs];
        let num_samples = inputs
            .iter()
            .map(|c| c.len())
            .chain(outputs.iter().map(|c| c.len()))
            .fold(num_samples, usize::min);

        let Some(_render) = inner.phase.try_render() else {
            inner.request_deferred_prepare();
            bypass_copy(inputs, outputs, num_samples);
            return ProcessStatus::Deferred;
        };

        // SAFETY: `_render` holds `Phase::Rendering` until the end of this
        // function.
        let engine = unsafe { &mut *inner.engine.get() };
        let Engine {
            processor,
            setup,
            scratch,
            ..
        } = engine;

        debug_assert!(
            num_samples <= setup.max_block_size,
            "block of {} samples exceeds prepared maximum {}",
            num_samples,
            setup.max_block_size
        );
        let num_samples = num_samples.min(setup.max_block_size);

        for (output, input) in outputs.iter_mut().zip(inputs.iter()) {
            output[..num_samples].copy_from_slice(&input[..num_samples]);
        }

        let mut channels: [&mut [f32]; MAX_CHANNELS] = std::array::from_fn(|_| Default::default());
        let mut count = 0;
        for output in outputs.iter_mut() {
            channels[count] = &mut output[..num_samples];
            count += 1;
        }

        let surplus = inputs.iter().skip(num_outputs);
        for (input, staging) in surplus.zip(scratch.channels_mut(num_samples)) {
            staging.copy_from_slice(&input[..num_samples]);
            channels[count] = staging;
            count += 1;
        }

        let num_inputs = inputs.len().min(count);
        let mut buffer = AudioBuffer::new(&mut channels[..count], num_inputs, num_outputs, num_samples);
        inner.render_block(processor, setup, &mut buffer, events, num_samples)
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// The shared parameter set.
    pub fn parameters(&self) -> &Arc<ParameterSet> {
        &self.inner.parameters
    }

    /// Number of parameters.
    pub fn parameter_count(&self) -> usize {
        self.inner.parameters.len()
    }

    /// Current normalized value of a parameter.
    pub fn parameter(&self, index: ParameterIndex) -> BridgeResult<ParameterValue> {
        self.inner.parameters.get(index)
    }

    /// Set a parameter from host automation. Returns the stored (clamped)
    /// value. The host is not notified.
    pub fn set_parameter(&self, index: ParameterIndex, value: ParameterValue) -> BridgeResult<ParameterValue> {
        self.inner.parameters.set(index, value)
    }

    /// Set a parameter from the plugin side and tell the host about it.
    pub fn set_parameter_notifying_host(
        &self,
        index: ParameterIndex,
        value: ParameterValue,
    ) -> BridgeResult<ParameterValue> {
        let stored = self.inner.parameters.set(index, value)?;
        self.inner.host.parameters.parameter_changed(index, stored);
        Ok(stored)
    }

    /// Tell the host an interactive change is starting.
    pub fn begin_parameter_gesture(&self, index: ParameterIndex) -> BridgeResult<()> {
        self.inner.parameters.info(index)?;
        self.inner.host.parameters.begin_gesture(index);
        Ok(())
    }

    /// Tell the host an interactive change has finished.
    pub fn end_parameter_gesture(&self, index: ParameterIndex) -> BridgeResult<()> {
        self.inner.parameters.info(index)?;
        self.inner.host.parameters.end_gesture(index);
        Ok(())
    }

    /// Report every parameter's current value to the host inside a gesture,
    /// so the host refreshes its controls.
    pub fn touch_all_parameters(&self) {
        let host = &self.inner.host.parameters;
        for (index, _, value) in self.inner.parameters.iter() {
            host.begin_gesture(index);
            host.parameter_changed(index, value);
            host.end_gesture(index);
        }
    }

    /// Display name of a parameter.
    pub fn parameter_name(&self, index: ParameterIndex) -> BridgeResult<&'static str> {
        self.inner.parameters.info(index).map(|info| info.name)
    }

    /// Display text of a parameter's current value.
    pub fn parameter_text(&self, index: ParameterIndex) -> BridgeResult<String> {
        self.inner.parameters.text(index)
    }

    // =========================================================================
    // Bypass and suspension
    // =========================================================================

    /// Engage or release the host's bypass.
    pub fn set_bypassed(&self, bypassed: bool) {
        self.inner.bypassed.store(bypassed, Ordering::Relaxed);
    }

    /// Whether the host's bypass is engaged.
    pub fn is_bypassed(&self) -> bool {
        self.inner.bypassed.load(Ordering::Relaxed)
    }

    /// Silence all outputs without releasing the processor.
    pub fn set_suspended(&self, suspended: bool) {
        self.inner.suspended.store(suspended, Ordering::Relaxed);
    }

    /// Whether outputs are being silenced.
    pub fn is_suspended(&self) -> bool {
        self.inner.suspended.load(Ordering::Relaxed)
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Serialize the current parameter values.
    pub fn snapshot(&self) -> BridgeResult<Vec<u8>> {
        let _state = self.inner.state_lock.lock();
        let parameters = &self.inner.parameters;
        PersistedState::capture(parameters).encode(parameters)
    }

    /// Restore parameter values from a snapshot.
    ///
    /// The blob is fully validated before any value changes; on error the
    /// parameters are left exactly as they were.
    pub fn restore(&self, bytes: &[u8]) -> BridgeResult<()> {
        let _state = self.inner.state_lock.lock();
        let parameters = &self.inner.parameters;
        let state = PersistedState::decode(bytes, parameters).inspect_err(|e| {
            log::warn!("rejected state of {} bytes: {e}", bytes.len());
        })?;
        state.apply(parameters);
        log::debug!(
            "restored {} parameters ({} unknown skipped)",
            state.len(),
            state.skipped()
        );
        Ok(())
    }
}

impl<P: AudioProcessor> StateStore for AudioBridge<P> {
    fn snapshot(&self) -> BridgeResult<Vec<u8>> {
        AudioBridge::snapshot(self)
    }

    fn restore(&self, bytes: &[u8]) -> BridgeResult<()> {
        AudioBridge::restore(self, bytes)
    }
}

/// Pass-through for blocks that arrive before preparation.
fn bypass_copy(inputs: &[&[f32]], outputs: &mut [&mut [f32]], num_samples: usize) {
    for (index, output) in outputs.iter_mut().enumerate() {
        let output = &mut output[..num_samples];
        match inputs.get(index) {
            Some(input) => output.copy_from_slice(&input[..num_samples]),
            None => output.fill(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BridgeError, ErrorKind};
    use crate::host::ParameterHost;
    use crate::parameters::ParameterInfo;
    use crate::scheduler::ManualScheduler;

    /// Adds 1 to every sample and records lifecycle calls.
    #[derive(Default)]
    struct Offset {
        prepared: Vec<ProcessSetup>,
        releases: usize,
        last_context: Option<(f64, usize, f64)>,
    }

    impl AudioProcessor for Offset {
        fn prepare(&mut self, setup: &ProcessSetup) {
            self.prepared.push(*setup);
        }

        fn release(&mut self) {
            self.releases += 1;
        }

        fn process(&mut self, buffer: &mut AudioBuffer, _events: &MidiBuffer, context: &ProcessContext) {
            self.last_context = Some((
                context.sample_rate,
                context.num_samples,
                context.parameters.load(0).unwrap_or(-1.0),
            ));
            for channel in buffer.channels_mut() {
                channel.iter_mut().for_each(|s| *s += 1.0);
            }
        }

        fn latency_samples(&self) -> u32 {
            64
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ParameterHost for Recorder {
        fn parameter_changed(&self, index: ParameterIndex, value: ParameterValue) {
            self.0.lock().push(format!("changed {index} {value}"));
        }
        fn begin_gesture(&self, index: ParameterIndex) {
            self.0.lock().push(format!("begin {index}"));
        }
        fn end_gesture(&self, index: ParameterIndex) {
            self.0.lock().push(format!("end {index}"));
        }
    }

    fn parameters() -> ParameterSet {
        ParameterSet::new([
            ParameterInfo::new("depth", "Depth").with_default(0.5),
            ParameterInfo::new("mix", "Mix").with_default(1.0),
        ])
    }

    fn bridge() -> (AudioBridge<Offset>, Arc<ManualScheduler>, Arc<Recorder>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let recorder = Arc::new(Recorder::default());
        let host = HostServices::new()
            .with_scheduler(scheduler.clone())
            .with_parameter_host(recorder.clone());
        (AudioBridge::new(Offset::default(), parameters(), host), scheduler, recorder)
    }

    fn run(bridge: &AudioBridge<Offset>, channels: &mut [Vec<f32>], inputs: usize, outputs: usize) -> ProcessStatus {
        let num_samples = channels[0].len();
        let mut slices: Vec<&mut [f32]> = channels.iter_mut().map(|c| c.as_mut_slice()).collect();
        let mut buffer = AudioBuffer::new(&mut slices, inputs, outputs, num_samples);
        let mut events = MidiBuffer::with_capacity(16);
        bridge.process(&mut buffer, &mut events, num_samples)
    }

    #[test]
    fn test_prepare_validation() {
        let (bridge, _, _) = bridge();
        for (sr, block) in [(0.0, 512), (-1.0, 512), (f64::NAN, 512), (48000.0, 0)] {
            let err = bridge.prepare(sr, block).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
        assert!(!bridge.is_prepared());
        assert!(bridge.prepared_setup().is_none());

        bridge.prepare(48000.0, 256).unwrap();
        assert!(bridge.is_prepared());
        assert_eq!(bridge.latency_samples(), 64);

        // a failed reconfiguration leaves the prepared setup alone
        assert!(bridge.prepare(48000.0, 0).is_err());
        assert_eq!(bridge.prepared_setup().map(|s| s.max_block_size), Some(256));
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let (bridge, _, _) = bridge();
        bridge.prepare(48000.0, 256).unwrap();
        bridge.prepare(48000.0, 256).unwrap();
        bridge.with_processor(|p| {
            assert_eq!(p.prepared.len(), 1);
            assert_eq!(p.releases, 0);
        });

        bridge.prepare(96000.0, 256).unwrap();
        bridge.with_processor(|p| {
            assert_eq!(p.prepared.len(), 2);
            assert_eq!(p.releases, 1);
            assert_eq!(p.prepared[1].sample_rate, 96000.0);
        });
        assert!(bridge.is_prepared());
    }

    #[test]
    fn test_process_zeroes_outputs_without_input() {
        let (bridge, _, _) = bridge();
        bridge.set_channel_layout(1, 3).unwrap();
        bridge.prepare(44100.0, 8).unwrap();

        let mut channels = vec![vec![0.5f32; 8], vec![f32::NAN; 8], vec![9.0; 8]];
        let status = run(&bridge, &mut channels, 1, 3);

        assert_eq!(status, ProcessStatus::Processed);
        assert_eq!(channels[0], vec![1.5; 8]);
        assert_eq!(channels[1], vec![0.0; 8]);
        assert_eq!(channels[2], vec![0.0; 8]);
    }

    #[test]
    fn test_unprepared_block_passes_through_and_defers() {
        let (bridge, scheduler, _) = bridge();
        let mut channels = vec![vec![0.25f32; 4], vec![0.75; 4], vec![f32::NAN; 4]];

        let status = run(&bridge, &mut channels, 2, 3);

        assert_eq!(status, ProcessStatus::Deferred);
        assert_eq!(channels[0], vec![0.25; 4]);
        assert_eq!(channels[1], vec![0.75; 4]);
        assert_eq!(channels[2], vec![0.0; 4]);
        assert!(bridge.is_preparation_pending());
        assert!(scheduler.is_pending());

        // preparation completes off the audio thread
        assert!(scheduler.pump());
        assert!(bridge.is_prepared());
        assert!(!bridge.is_preparation_pending());

        let mut channels = vec![vec![0.25f32; 4], vec![0.75; 4], vec![f32::NAN; 4]];
        let status = run(&bridge, &mut channels, 2, 3);
        assert_eq!(status, ProcessStatus::Processed);
        assert_eq!(channels[0], vec![1.25; 4]);
        assert_eq!(channels[1], vec![1.75; 4]);
        assert_eq!(channels[2], vec![0.0; 4]);
    }

    #[test]
    fn test_unprepared_blocks_never_reach_processor() {
        let (bridge, scheduler, _) = bridge();

        for _ in 0..3 {
            let mut channels = vec![vec![0.5f32; 4], vec![0.5; 4]];
            assert_eq!(run(&bridge, &mut channels, 2, 2), ProcessStatus::Deferred);
            assert_eq!(channels[0], vec![0.5; 4]);
            assert!(!bridge.is_prepared());
        }
        assert!(scheduler.is_pending());

        bridge.with_processor(|processor| {
            assert!(processor.prepared.is_empty());
            assert!(processor.last_context.is_none());
        });
        assert!(!bridge.is_prepared());
    }

    #[test]
    fn test_deferred_preparation_uses_latest_request() {
        let (bridge, scheduler, _) = bridge();
        let mut channels = vec![vec![0.0f32; 4], vec![0.0; 4]];
        assert_eq!(run(&bridge, &mut channels, 2, 2), ProcessStatus::Deferred);

        // arrives after the block asked for preparation, before it runs
        bridge.configure(48000.0, 128).unwrap();
        assert!(scheduler.pump());

        let prepared = bridge.prepared_setup().unwrap();
        assert_eq!(prepared.sample_rate, 48000.0);
        assert_eq!(prepared.max_block_size, 128);
        assert_eq!(bridge.requested_setup(), prepared);
    }

    #[test]
    fn test_configure_defers_preparation() {
        let (bridge, scheduler, _) = bridge();
        bridge.prepare(44100.0, 64).unwrap();

        // same values: nothing changes
        bridge.configure(44100.0, 64).unwrap();
        assert!(bridge.is_prepared());

        bridge.configure(48000.0, 128).unwrap();
        assert!(!bridge.is_prepared());
        assert_eq!(bridge.requested_setup().sample_rate, 48000.0);

        let mut channels = vec![vec![0.0f32; 16], vec![0.0; 16]];
        assert_eq!(run(&bridge, &mut channels, 2, 2), ProcessStatus::Deferred);
        assert!(scheduler.pump());

        let setup = bridge.prepared_setup().unwrap();
        assert_eq!(setup.sample_rate, 48000.0);
        assert_eq!(setup.max_block_size, 128);
        assert_eq!(run(&bridge, &mut channels, 2, 2), ProcessStatus::Processed);
    }

    #[test]
    fn test_configure_rejects_bad_values() {
        let (bridge, _, _) = bridge();
        assert!(matches!(
            bridge.configure(44100.0, 0),
            Err(BridgeError::InvalidBlockSize(0))
        ));
        assert!(matches!(
            bridge.set_channel_layout(2, MAX_CHANNELS + 1),
            Err(BridgeError::ChannelLimit { .. })
        ));
    }

    #[test]
    fn test_context_reaches_processor() {
        let (bridge, _, _) = bridge();
        bridge.prepare(32000.0, 16).unwrap();
        bridge.set_parameter(0, 0.125).unwrap();

        let mut channels = vec![vec![0.0f32; 10], vec![0.0; 10]];
        run(&bridge, &mut channels, 2, 2);

        let context = bridge.with_processor(|p| p.last_context);
        assert_eq!(context, Some((32000.0, 10, 0.125)));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "exceeds prepared maximum")]
    fn test_oversized_block_asserts_in_debug() {
        let (bridge, _, _) = bridge();
        bridge.prepare(44100.0, 4).unwrap();
        let mut channels = vec![vec![0.0f32; 8], vec![0.0; 8]];
        run(&bridge, &mut channels, 2, 2);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_oversized_block_is_clamped_in_release() {
        let (bridge, _, _) = bridge();
        bridge.prepare(44100.0, 4).unwrap();

        let mut left = [0.0f32; 8];
        let mut right = [0.0f32; 8];
        let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
        let mut buffer = AudioBuffer::new(&mut channels, 2, 2, 8);
        let mut events = MidiBuffer::with_capacity(4);
        events.push_raw(2, &[0x90, 60, 100]);
        events.push_raw(7, &[0x80, 60, 0]);

        let status = bridge.process(&mut buffer, &mut events, 8);
        drop(buffer);

        assert_eq!(status, ProcessStatus::Processed);
        assert_eq!(left, [1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(right, [1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        let offsets: Vec<u32> = events.iter().map(|e| e.sample_offset()).collect();
        assert_eq!(offsets, [2, 3]);
    }

    #[test]
    fn test_bypass_and_suspend() {
        let (bridge, _, _) = bridge();
        bridge.prepare(44100.0, 4).unwrap();

        bridge.set_bypassed(true);
        let mut channels = vec![vec![0.5f32; 4], vec![0.5; 4]];
        assert_eq!(run(&bridge, &mut channels, 2, 2), ProcessStatus::Bypassed);
        assert_eq!(channels[0], vec![0.5; 4]);

        bridge.set_bypassed(false);
        bridge.set_suspended(true);
        assert_eq!(run(&bridge, &mut channels, 2, 2), ProcessStatus::Suspended);
        assert_eq!(channels[0], vec![0.0; 4]);
        assert_eq!(channels[1], vec![0.0; 4]);
    }

    #[test]
    fn test_render_with_separate_buffers() {
        let (bridge, _, _) = bridge();
        bridge.set_channel_layout(3, 1).unwrap();
        bridge.prepare(44100.0, 8).unwrap();

        let a = [1.0f32; 8];
        let b = [2.0f32; 8];
        let c = [3.0f32; 8];
        let inputs: [&[f32]; 3] = [&a, &b, &c];
        let mut out = [0.0f32; 8];
        let mut outputs: [&mut [f32]; 1] = [&mut out];
        let mut events = MidiBuffer::with_capacity(4);

        let status = bridge.render(&inputs, &mut outputs, &mut events, 8);

        assert_eq!(status, ProcessStatus::Processed);
        assert_eq!(out, [2.0; 8]);
        // inputs are never written
        assert_eq!(b, [2.0; 8]);
    }

    #[test]
    fn test_render_unprepared_copies_and_silences() {
        let (bridge, _, _) = bridge();
        let a = [0.3f32; 4];
        let inputs: [&[f32]; 1] = [&a];
        let mut left = [f32::NAN; 4];
        let mut right = [f32::NAN; 4];
        let mut outputs: [&mut [f32]; 2] = [&mut left, &mut right];
        let mut events = MidiBuffer::with_capacity(4);

        let status = bridge.render(&inputs, &mut outputs, &mut events, 4);

        assert_eq!(status, ProcessStatus::Deferred);
        assert_eq!(left, [0.3; 4]);
        assert_eq!(right, [0.0; 4]);
    }

    #[test]
    fn test_parameter_round_trip_and_errors() {
        let (bridge, _, recorder) = bridge();
        assert_eq!(bridge.parameter_count(), 2);
        assert_eq!(bridge.parameter(1).unwrap(), 1.0);

        assert_eq!(bridge.set_parameter(0, 7.5).unwrap(), 1.0);
        assert_eq!(bridge.set_parameter(0, -3.0).unwrap(), 0.0);
        assert_eq!(bridge.set_parameter(0, 0.3).unwrap(), 0.3);
        assert_eq!(bridge.parameter(0).unwrap(), 0.3);

        assert!(matches!(
            bridge.parameter(2),
            Err(BridgeError::ParameterIndexOutOfRange { index: 2, count: 2 })
        ));
        assert!(bridge.set_parameter(5, 0.5).is_err());
        assert!(bridge.begin_parameter_gesture(2).is_err());

        // automation does not echo back to the host
        assert!(recorder.0.lock().is_empty());
        assert_eq!(bridge.parameter_name(1).unwrap(), "Mix");
        assert_eq!(bridge.parameter_text(0).unwrap(), "0.30");
    }

    #[test]
    fn test_host_notifications() {
        let (bridge, _, recorder) = bridge();
        bridge.begin_parameter_gesture(1).unwrap();
        bridge.set_parameter_notifying_host(1, 0.25).unwrap();
        bridge.end_parameter_gesture(1).unwrap();
        assert_eq!(
            *recorder.0.lock(),
            vec!["begin 1", "changed 1 0.25", "end 1"]
        );

        recorder.0.lock().clear();
        bridge.touch_all_parameters();
        assert_eq!(
            *recorder.0.lock(),
            vec![
                "begin 0",
                "changed 0 0.5",
                "end 0",
                "begin 1",
                "changed 1 0.25",
                "end 1"
            ]
        );
    }

    #[test]
    fn test_state_round_trip() {
        let (bridge, _, _) = bridge();
        bridge.set_parameter(0, 0.111).unwrap();
        bridge.set_parameter(1, 0.999).unwrap();
        let snapshot = bridge.snapshot().unwrap();

        bridge.set_parameter(0, 0.0).unwrap();
        bridge.set_parameter(1, 0.0).unwrap();
        bridge.restore(&snapshot).unwrap();

        assert_eq!(bridge.parameter(0).unwrap(), 0.111);
        assert_eq!(bridge.parameter(1).unwrap(), 0.999);
    }

    #[test]
    fn test_malformed_state_leaves_parameters_untouched() {
        let (bridge, _, _) = bridge();
        bridge.set_parameter(0, 0.42).unwrap();
        let snapshot = bridge.snapshot().unwrap();
        bridge.set_parameter(0, 0.7).unwrap();

        for bad in [&snapshot[..snapshot.len() - 1], &snapshot[..3], b"garbage bytes!".as_slice(), &snapshot[..0]] {
            let err = bridge.restore(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::State);
            assert_eq!(bridge.parameter(0).unwrap(), 0.7);
            assert_eq!(bridge.parameter(1).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_release() {
        let (bridge, _, _) = bridge();
        bridge.prepare(44100.0, 16).unwrap();
        bridge.release();
        assert!(!bridge.is_prepared());
        assert!(bridge.prepared_setup().is_none());
        bridge.with_processor(|p| assert_eq!(p.releases, 1));

        bridge.prepare(44100.0, 16).unwrap();
        assert!(bridge.is_prepared());
    }
}
