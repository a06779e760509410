//! Side Extract - stereo side channel extraction on stembridge.
//!
//! Replaces both channels of a stereo signal with its side component,
//! `left - right`. Anything other than exactly two inputs passes through
//! untouched.

use stembridge::prelude::*;

// =============================================================================
// Plugin Configuration
// =============================================================================

const CHANNEL_CONFIGURATIONS: &[ChannelConfiguration] = &[ChannelConfiguration::new(2, 2)];

/// Static plugin configuration.
pub static CONFIG: PluginConfig = PluginConfig::new(
    "Side Extract",
    fourcc!(b"Stmb"),
    fourcc!(b"SdEx"),
)
.with_description("Stereo side channel")
.with_manufacturer("stembridge")
.with_version(0, 2, 3)
.with_category(Category::SoundField)
.with_channel_configurations(CHANNEL_CONFIGURATIONS)
.with_sample_rates(SampleRateSupport::Up192k);

// =============================================================================
// Processor
// =============================================================================

/// Writes `left - right` to both channels.
#[derive(Debug, Default)]
pub struct SideExtract;

impl AudioProcessor for SideExtract {
    fn prepare(&mut self, setup: &ProcessSetup) {
        log::debug!(
            "side extract prepared for {} in / {} out at {} Hz",
            setup.num_inputs,
            setup.num_outputs,
            setup.sample_rate
        );
    }

    fn process(&mut self, buffer: &mut AudioBuffer, _events: &MidiBuffer, _context: &ProcessContext) {
        if buffer.num_input_channels() != 2 {
            return;
        }
        if let Some((left, right)) = buffer.stereo_pair_mut() {
            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                let side = *l - *r;
                *l = side;
                *r = side;
            }
        }
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Parameters exposed to the host. The side transform has none.
pub fn parameters() -> ParameterSet {
    ParameterSet::empty()
}

/// Create a host-facing instance.
pub fn create(services: HostServices) -> HostAdapter<SideExtract> {
    HostAdapter::new(&CONFIG, SideExtract, parameters(), services)
}
