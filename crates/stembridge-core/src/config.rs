//! Plugin configuration.
//!
//! Static metadata a plugin declares to its host: identity codes, preferred
//! channel configurations, sample-rate ceiling and MIDI capabilities. Built
//! with `const fn` so it can live in a `static`.
//!
//! # Example
//!
//! ```ignore
//! use stembridge_core::{config::*, fourcc};
//!
//! pub static CONFIG: PluginConfig = PluginConfig::new("Side Extract", fourcc!(b"Stmb"), fourcc!(b"Sdex"))
//!     .with_manufacturer("Stembridge")
//!     .with_channel_configurations(&[ChannelConfiguration::new(2, 2)])
//!     .with_version(1, 0, 0);
//! ```

// =========================================================================
// FourCharCode
// =========================================================================

/// Four-character code used for manufacturer, product, effect type and
/// chunk identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCharCode(pub [u8; 4]);

impl FourCharCode {
    /// Wrap four bytes. Debug builds reject anything but printable ASCII.
    pub const fn new(bytes: &[u8; 4]) -> Self {
        debug_assert!(Self::is_printable(bytes), "four-character codes are printable ASCII");
        Self(*bytes)
    }

    /// Whether every byte is printable ASCII, space included.
    pub const fn is_printable(bytes: &[u8; 4]) -> bool {
        let mut i = 0;
        while i < bytes.len() {
            if !matches!(bytes[i], b' '..=b'~') {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Rebuild a code from its big-endian 32-bit value.
    pub const fn from_u32(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    /// The code as a 32-bit value (big-endian).
    pub const fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// The code as text, or `"????"` if it is not valid UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// The raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Display for FourCharCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a [`FourCharCode`] at compile time, rejecting anything that is
/// not exactly four printable ASCII bytes.
///
/// ```ignore
/// const MANUFACTURER: FourCharCode = fourcc!(b"Stmb");
/// ```
#[macro_export]
macro_rules! fourcc {
    ($s:literal) => {{
        const CODE: $crate::config::FourCharCode = {
            let bytes: &[u8; 4] = $s;
            assert!(
                $crate::config::FourCharCode::is_printable(bytes),
                "four-character codes are printable ASCII"
            );
            $crate::config::FourCharCode(*bytes)
        };
        CODE
    }};
}

// =========================================================================
// Category
// =========================================================================

/// Host-facing plugin category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    Effect,
    Dynamics,
    Eq,
    Reverb,
    Delay,
    Modulation,
    Harmonic,
    SoundField,
    Instrument,
    NoiseReduction,
}

// =========================================================================
// ChannelConfiguration
// =========================================================================

/// One preferred `(inputs, outputs)` channel configuration.
///
/// A zero on either side means "same as the other side", so `(0, 2)`
/// describes a stereo effect and `(0, 0)` a layout-agnostic one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfiguration {
    pub inputs: u16,
    pub outputs: u16,
}

impl ChannelConfiguration {
    pub const fn new(inputs: u16, outputs: u16) -> Self {
        Self { inputs, outputs }
    }

    /// Input and output counts with zero sides mirrored.
    pub const fn resolved(&self) -> (usize, usize) {
        let inputs = if self.inputs == 0 {
            self.outputs
        } else {
            self.inputs
        };
        let outputs = if self.outputs == 0 {
            self.inputs
        } else {
            self.outputs
        };
        (inputs as usize, outputs as usize)
    }
}

/// Stereo in, stereo out.
pub const STEREO: ChannelConfiguration = ChannelConfiguration::new(2, 2);

// =========================================================================
// SampleRateSupport
// =========================================================================

/// Highest sample rate the plugin supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleRateSupport {
    Up48k,
    Up96k,
    #[default]
    Up192k,
}

impl SampleRateSupport {
    /// Upper bound in Hz, with a little slack for non-integer host rates.
    pub const fn max_hz(&self) -> f64 {
        match self {
            SampleRateSupport::Up48k => 48_000.0,
            SampleRateSupport::Up96k => 96_000.0,
            SampleRateSupport::Up192k => 192_000.0,
        }
    }

    /// Whether `sample_rate` is within the supported range.
    pub fn supports(&self, sample_rate: f64) -> bool {
        sample_rate.is_finite() && sample_rate > 0.0 && sample_rate <= self.max_hz() + 1.0
    }
}

// =========================================================================
// PluginConfig
// =========================================================================

/// Static plugin configuration.
#[derive(Debug, Clone, Copy)]
pub struct PluginConfig {
    /// Plugin name shown in the host's plugin list.
    pub name: &'static str,
    /// Short description appended to the name on hosts that support it.
    pub description: &'static str,
    /// Manufacturer name.
    pub manufacturer: &'static str,
    /// Manufacturer identifier code.
    pub manufacturer_code: FourCharCode,
    /// Product identifier code.
    pub product_code: FourCharCode,
    /// Packed version (`major << 16 | minor << 8 | patch`).
    pub version_code: u32,
    pub category: Category,
    /// Preferred channel configurations, most preferred first.
    pub channel_configurations: &'static [ChannelConfiguration],
    pub sample_rates: SampleRateSupport,
    pub accepts_midi: bool,
    pub produces_midi: bool,
    /// Whether the host's master bypass control is offered.
    pub can_bypass: bool,
    /// Whether the host may instantiate one mono copy per channel.
    pub multi_mono: bool,
    /// Whether the editor wants keyboard focus when opened.
    pub wants_keyboard_focus: bool,
}

impl PluginConfig {
    /// Create a configuration with required identity fields.
    pub const fn new(
        name: &'static str,
        manufacturer_code: FourCharCode,
        product_code: FourCharCode,
    ) -> Self {
        Self {
            name,
            description: "",
            manufacturer: "",
            manufacturer_code,
            product_code,
            version_code: 0x0001_0000,
            category: Category::Effect,
            channel_configurations: &[STEREO],
            sample_rates: SampleRateSupport::Up192k,
            accepts_midi: false,
            produces_midi: false,
            can_bypass: true,
            multi_mono: false,
            wants_keyboard_focus: false,
        }
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_manufacturer(mut self, manufacturer: &'static str) -> Self {
        self.manufacturer = manufacturer;
        self
    }

    /// Set the version from its components.
    pub const fn with_version(mut self, major: u8, minor: u8, patch: u8) -> Self {
        self.version_code = ((major as u32) << 16) | ((minor as u32) << 8) | patch as u32;
        self
    }

    pub const fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the preferred channel configurations. Must not be empty.
    pub const fn with_channel_configurations(
        mut self,
        configurations: &'static [ChannelConfiguration],
    ) -> Self {
        assert!(
            !configurations.is_empty(),
            "at least one channel configuration is required"
        );
        self.channel_configurations = configurations;
        self
    }

    pub const fn with_sample_rates(mut self, sample_rates: SampleRateSupport) -> Self {
        self.sample_rates = sample_rates;
        self
    }

    pub const fn with_midi_input(mut self) -> Self {
        self.accepts_midi = true;
        self
    }

    pub const fn with_midi_output(mut self) -> Self {
        self.produces_midi = true;
        self
    }

    pub const fn without_bypass(mut self) -> Self {
        self.can_bypass = false;
        self
    }

    pub const fn with_multi_mono(mut self) -> Self {
        self.multi_mono = true;
        self
    }

    pub const fn with_keyboard_focus(mut self) -> Self {
        self.wants_keyboard_focus = true;
        self
    }

    /// The first (most preferred) channel configuration, resolved.
    pub fn default_layout(&self) -> (usize, usize) {
        self.channel_configurations
            .first()
            .map(ChannelConfiguration::resolved)
            .unwrap_or((2, 2))
    }

    /// Name as presented to hosts that accept a description line.
    pub fn host_name(&self) -> String {
        if self.description.is_empty() {
            self.name.to_string()
        } else {
            format!("{}\n{}", self.name, self.description)
        }
    }

    /// Version as `major.minor.patch`.
    pub fn version_string(&self) -> String {
        format!(
            "{}.{}.{}",
            (self.version_code >> 16) & 0xFF,
            (self.version_code >> 8) & 0xFF,
            self.version_code & 0xFF
        )
    }
}
