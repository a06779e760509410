//! Stem formats and effect types.
//!
//! The host describes channel layouts by name rather than by count, and
//! expects one effect type per supported layout.

use stembridge_core::config::{ChannelConfiguration, PluginConfig};
use stembridge_core::FourCharCode;

/// Host channel layout for a channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemFormat {
    Generic,
    Mono,
    Stereo,
    Lcr,
    Quad,
    Surround50,
    Surround51,
    Surround61,
    Surround71,
}

impl StemFormat {
    /// Stem format for `num_channels`.
    ///
    /// Counts the host has no name for fall back to [`StemFormat::Generic`].
    pub fn for_channels(num_channels: usize) -> Self {
        match num_channels {
            0 => Self::Generic,
            1 => Self::Mono,
            2 => Self::Stereo,
            3 => Self::Lcr,
            4 => Self::Quad,
            5 => Self::Surround50,
            6 => Self::Surround51,
            7 => Self::Surround61,
            8 => Self::Surround71,
            n => {
                log::warn!("no stem format for {n} channels, using generic");
                Self::Generic
            }
        }
    }

    /// Channel count, or `None` for [`StemFormat::Generic`].
    pub fn num_channels(&self) -> Option<usize> {
        match self {
            Self::Generic => None,
            Self::Mono => Some(1),
            Self::Stereo => Some(2),
            Self::Lcr => Some(3),
            Self::Quad => Some(4),
            Self::Surround50 => Some(5),
            Self::Surround51 => Some(6),
            Self::Surround61 => Some(7),
            Self::Surround71 => Some(8),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Mono => "Mono",
            Self::Stereo => "Stereo",
            Self::Lcr => "LCR",
            Self::Quad => "Quad",
            Self::Surround50 => "5.0",
            Self::Surround51 => "5.1",
            Self::Surround61 => "6.1",
            Self::Surround71 => "7.1",
        }
    }
}

/// First effect type id; configuration `i` gets `EFFECT_TYPE_BASE + i`.
pub const EFFECT_TYPE_BASE: FourCharCode = FourCharCode::new(b"sbaa");

/// One registered variant of the plugin, tied to a channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectType {
    pub type_id: FourCharCode,
    pub product_code: FourCharCode,
    pub input: StemFormat,
    pub output: StemFormat,
    pub can_bypass: bool,
    pub supports_variable_quanta: bool,
    pub multi_mono: bool,
}

impl EffectType {
    fn new(config: &PluginConfig, index: usize, channels: ChannelConfiguration) -> Self {
        let (inputs, outputs) = channels.resolved();
        Self {
            type_id: FourCharCode::from_u32(
                EFFECT_TYPE_BASE.as_u32().wrapping_add(index as u32),
            ),
            product_code: config.product_code,
            input: StemFormat::for_channels(inputs),
            output: StemFormat::for_channels(outputs),
            can_bypass: config.can_bypass,
            supports_variable_quanta: true,
            multi_mono: config.multi_mono,
        }
    }
}

/// Effect types for every preferred channel configuration, in order.
pub fn effect_types(config: &PluginConfig) -> Vec<EffectType> {
    config
        .channel_configurations
        .iter()
        .enumerate()
        .map(|(index, &channels)| EffectType::new(config, index, channels))
        .collect()
}
