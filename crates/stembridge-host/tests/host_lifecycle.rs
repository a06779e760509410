//! Full host lifecycle against the adapter: initialization, deferred
//! preparation, control automation, chunk persistence and timeline delivery.
//!
//! Run with:
//! ```bash
//! cargo test -p stembridge-host --test host_lifecycle
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use parking_lot::Mutex;
use stembridge_core::config::{ChannelConfiguration, PluginConfig};
use stembridge_core::{
    fixed_point, AudioBuffer, AudioProcessor, BridgeError, FourCharCode, FrameRate, HostServices,
    ManualScheduler, MidiBuffer, MidiTimelineSource, ParameterInfo, ParameterSet, ProcessContext,
    ProcessStatus, TimelineReading, Transport,
};
use stembridge_host::{
    ControlSurface, ControlSurfaceHost, ControlTarget, HostAdapter, SharedRuntime, STATE_CHUNK_ID,
};

const TEST_SAMPLE_RATE: f64 = 48000.0;
const TEST_BLOCK_SIZE: usize = 64;

static RUNTIME: SharedRuntime = SharedRuntime::new();
const STEREO_ONLY: &[ChannelConfiguration] = &[ChannelConfiguration::new(2, 2)];
static CONFIG: PluginConfig = PluginConfig::new(
    "Lifecycle",
    FourCharCode::new(b"Stmb"),
    FourCharCode::new(b"Lfcy"),
)
.with_description("Lifecycle test")
.with_channel_configurations(STEREO_ONLY);

// =============================================================================
// Fixtures
// =============================================================================

/// Scales every channel by parameter 0 and remembers the last transport.
struct Gain {
    transport: Arc<Mutex<Option<Transport>>>,
}

impl AudioProcessor for Gain {
    fn process(&mut self, buffer: &mut AudioBuffer, _events: &MidiBuffer, context: &ProcessContext) {
        let gain = context.parameters.load(0).unwrap_or(1.0) as f32;
        for channel in buffer.channels_mut() {
            channel.iter_mut().for_each(|s| *s *= gain);
        }
        if let Some(mut slot) = self.transport.try_lock() {
            *slot = Some(context.transport);
        }
    }

    fn latency_samples(&self) -> u32 {
        32
    }
}

fn parameters() -> ParameterSet {
    ParameterSet::new([
        ParameterInfo::new("gain", "Gain").with_default(0.5),
        ParameterInfo::new("tone", "Tone").with_default(0.25),
    ])
}

fn instance(services: HostServices) -> (HostAdapter<Gain>, Arc<Mutex<Option<Transport>>>) {
    let transport = Arc::new(Mutex::new(None));
    let processor = Gain {
        transport: transport.clone(),
    };
    (
        HostAdapter::with_runtime(&RUNTIME, &CONFIG, processor, parameters(), services),
        transport,
    )
}

#[derive(Default)]
struct RecordingSurface(Mutex<Vec<(&'static str, usize, i32)>>);

impl ControlSurface for RecordingSurface {
    fn set_control_value(&self, control_index: usize, value: i32) {
        self.0.lock().push(("set", control_index, value));
    }
    fn touch_control(&self, control_index: usize) {
        self.0.lock().push(("touch", control_index, 0));
    }
    fn release_control(&self, control_index: usize) {
        self.0.lock().push(("release", control_index, 0));
    }
}

struct FixedTimeline(TimelineReading);

impl MidiTimelineSource for FixedTimeline {
    fn read_timeline(&self) -> Option<TimelineReading> {
        Some(self.0)
    }
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        if Instant::now() > deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
    true
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_deferred_preparation_with_worker() {
    let (mut adapter, _) = instance(HostServices::new());
    let controls = adapter.on_init().unwrap();
    assert_eq!(controls.len(), 3);
    adapter.on_prepare(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE).unwrap();
    let mut port = adapter.take_render_port().unwrap();

    let left = [1.0f32; TEST_BLOCK_SIZE];
    let right = [0.5f32; TEST_BLOCK_SIZE];
    let inputs: [&[f32]; 2] = [&left, &right];
    let mut out_l = [0.0f32; TEST_BLOCK_SIZE];
    let mut out_r = [0.0f32; TEST_BLOCK_SIZE];

    // first block passes through while preparation runs elsewhere
    let status = port.on_process(&inputs, &mut [&mut out_l[..], &mut out_r[..]], TEST_BLOCK_SIZE, &[]);
    assert_eq!(status, ProcessStatus::Deferred);
    assert_eq!(out_l, left);
    assert_eq!(out_r, right);

    assert!(wait_until(|| adapter.bridge().is_prepared()));
    assert_eq!(adapter.latency_samples(), 32);

    let status = port.on_process(&inputs, &mut [&mut out_l[..], &mut out_r[..]], TEST_BLOCK_SIZE, &[]);
    assert_eq!(status, ProcessStatus::Processed);
    assert_eq!(out_l, [0.5; TEST_BLOCK_SIZE]);
    assert_eq!(out_r, [0.25; TEST_BLOCK_SIZE]);
}

#[test]
fn test_reconfiguration_defers_again() {
    let scheduler = Arc::new(ManualScheduler::new());
    let (mut adapter, _) = instance(HostServices::new().with_scheduler(scheduler.clone()));
    adapter.on_init().unwrap();
    adapter.on_prepare(44100.0, TEST_BLOCK_SIZE).unwrap();
    let mut port = adapter.take_render_port().unwrap();

    let input = [1.0f32; 16];
    let inputs: [&[f32]; 2] = [&input, &input];
    let mut a = [0.0f32; 16];
    let mut b = [0.0f32; 16];

    assert_eq!(port.on_process(&inputs, &mut [&mut a[..], &mut b[..]], 16, &[]), ProcessStatus::Deferred);
    assert!(scheduler.pump());
    assert_eq!(port.on_process(&inputs, &mut [&mut a[..], &mut b[..]], 16, &[]), ProcessStatus::Processed);

    adapter.on_prepare(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE).unwrap();
    assert_eq!(port.on_process(&inputs, &mut [&mut a[..], &mut b[..]], 16, &[]), ProcessStatus::Deferred);
    assert_eq!(a, [1.0; 16]);
    assert!(scheduler.pump());
    assert_eq!(
        adapter.bridge().prepared_setup().map(|s| s.sample_rate),
        Some(TEST_SAMPLE_RATE)
    );
}

#[test]
fn test_control_automation_and_notifications() {
    let surface = Arc::new(RecordingSurface::default());
    let services = HostServices::new()
        .with_scheduler(Arc::new(ManualScheduler::new()))
        .with_parameter_host(Arc::new(ControlSurfaceHost::new(surface.clone())));
    let (adapter, _) = instance(services);
    adapter.on_init().unwrap();

    // host automation does not echo back
    let target = adapter
        .on_control_changed(3, fixed_point::encode(0.75))
        .unwrap();
    assert_eq!(target, ControlTarget::Parameter(1));
    assert_relative_eq!(adapter.bridge().parameter(1).unwrap(), 0.75, epsilon = 1e-9);
    assert!(surface.0.lock().is_empty());

    // editor changes do
    let bridge = adapter.bridge();
    bridge.begin_parameter_gesture(0).unwrap();
    bridge.set_parameter_notifying_host(0, 1.0).unwrap();
    bridge.end_parameter_gesture(0).unwrap();
    assert_eq!(
        *surface.0.lock(),
        vec![("touch", 2, 0), ("set", 2, i32::MAX), ("release", 2, 0)]
    );
}

#[test]
fn test_chunk_round_trip_between_instances() {
    let services = || HostServices::new().with_scheduler(Arc::new(ManualScheduler::new()));
    let (source, _) = instance(services());
    let (target, _) = instance(services());

    source.on_control_changed(2, fixed_point::encode(0.125)).unwrap();
    source.on_control_changed(3, fixed_point::encode(0.875)).unwrap();

    let size = source.on_chunk_size_requested(STATE_CHUNK_ID).unwrap().unwrap();
    let chunk = source.on_chunk_requested(STATE_CHUNK_ID).unwrap().unwrap();
    assert_eq!(chunk.len(), size);

    assert_eq!(target.on_chunk_restored(STATE_CHUNK_ID, &chunk).unwrap(), Some(()));
    for index in 0..2 {
        assert_relative_eq!(
            target.bridge().parameter(index).unwrap(),
            source.bridge().parameter(index).unwrap(),
            epsilon = 1e-9
        );
    }

    let foreign = FourCharCode::new(b"misc");
    assert_eq!(source.on_chunk_size_requested(foreign).unwrap(), None);
}

#[test]
fn test_malformed_chunk_leaves_parameters() {
    let (adapter, _) = instance(HostServices::new().with_scheduler(Arc::new(ManualScheduler::new())));
    adapter.on_control_changed(2, fixed_point::encode(0.3)).unwrap();
    let mut chunk = adapter.on_chunk_requested(STATE_CHUNK_ID).unwrap().unwrap();

    adapter.on_control_changed(2, fixed_point::encode(0.9)).unwrap();
    let before = adapter.bridge().parameter(0).unwrap();

    // corrupt the state magic, keeping the header intact
    chunk[8] ^= 0xFF;
    let err = adapter.on_chunk_restored(STATE_CHUNK_ID, &chunk).unwrap_err();
    assert!(matches!(err, BridgeError::CorruptState(_)));
    assert_eq!(adapter.bridge().parameter(0).unwrap(), before);
    assert_eq!(adapter.bridge().parameter(1).unwrap(), 0.25);
}

#[test]
fn test_parameter_writes_race_snapshots() {
    let (adapter, _) = instance(HostServices::new().with_scheduler(Arc::new(ManualScheduler::new())));
    let bridge = adapter.bridge().clone();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let bridge = bridge.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut value = 0.0;
            while !done.load(Ordering::Relaxed) {
                value = (value + 0.013) % 1.0;
                bridge.set_parameter(0, value).unwrap();
                bridge.set_parameter(1, 1.0 - value).unwrap();
            }
        })
    };

    let (mirror, _) = instance(HostServices::new().with_scheduler(Arc::new(ManualScheduler::new())));
    for _ in 0..500 {
        let snapshot = bridge.snapshot().unwrap();
        mirror.bridge().restore(&snapshot).unwrap();
        for index in 0..2 {
            let value = mirror.bridge().parameter(index).unwrap();
            assert!((0.0..=1.0).contains(&value));
        }
    }

    done.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}

#[test]
fn test_timeline_reaches_processor() {
    let scheduler = Arc::new(ManualScheduler::new());
    let timeline = FixedTimeline(TimelineReading {
        tempo: 90.0,
        meter_numerator: 6,
        meter_denominator: 8,
        is_playing: true,
        sample_location: 96000,
        tick_position: 1_920_000,
        frame_rate_code: 1,
        frame_offset: 50,
    });
    let services = HostServices::new()
        .with_scheduler(scheduler.clone())
        .with_timeline(Arc::new(timeline));
    let (adapter, transport) = instance(services);
    adapter.bridge().prepare(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE).unwrap();

    let mut left = [0.0f32; 8];
    let mut right = [0.0f32; 8];
    let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
    let mut buffer = AudioBuffer::new(&mut channels, 2, 2, 8);
    let mut events = MidiBuffer::with_capacity(8);
    assert_eq!(adapter.bridge().process(&mut buffer, &mut events, 8), ProcessStatus::Processed);

    let seen = transport.lock().expect("processor saw a transport");
    assert_eq!(seen.tempo, 90.0);
    assert_eq!((seen.time_sig_numerator, seen.time_sig_denominator), (6, 8));
    assert!(seen.is_playing);
    assert_relative_eq!(seen.time_in_seconds, 2.0);
    assert_relative_eq!(seen.ppq_position, 2.0);
    assert_eq!(seen.frame_rate, Some(FrameRate::Fps25));
    assert_relative_eq!(seen.edit_origin_seconds, 2.0);
}

#[test]
fn test_runtime_counts_instances() {
    static LOCAL: SharedRuntime = SharedRuntime::new();
    let services = || HostServices::new().with_scheduler(Arc::new(ManualScheduler::new()));
    let make = || {
        HostAdapter::with_runtime(
            &LOCAL,
            &CONFIG,
            Gain {
                transport: Arc::default(),
            },
            parameters(),
            services(),
        )
    };

    let first = make();
    let second = make();
    assert_eq!(LOCAL.instance_count(), 2);
    drop(first);
    assert_eq!(LOCAL.instance_count(), 1);
    drop(second);
    assert_eq!(LOCAL.instance_count(), 0);
}
