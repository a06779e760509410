//! Parameter metadata and lock-free parameter storage.
//!
//! A [`ParameterSet`] maps stable indices to normalized values in
//! `[0.0, 1.0]`. Each value lives in its own `AtomicU64` holding the bits
//! of an `f64`, so the audio thread reads a consistent value without
//! locking while UI and automation threads write concurrently.
//!
//! # Example
//!
//! ```ignore
//! let parameters = ParameterSet::new([
//!     ParameterInfo::new("width", "Width")
//!         .with_formatter(Formatter::Percent { precision: 0 })
//!         .with_default(1.0),
//!     ParameterInfo::new("gain", "Output Gain")
//!         .with_range(0.0, 2.0)
//!         .with_formatter(Formatter::Decibel { precision: 1 }),
//! ]);
//!
//! parameters.set(0, 0.25)?;
//! assert_eq!(parameters.text(0)?, "25");
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{BridgeError, BridgeResult};
use crate::parameter_format::Formatter;
use crate::types::{ParameterIndex, ParameterValue};

// =============================================================================
// ParameterFlags
// =============================================================================

/// Flags controlling how hosts treat a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterFlags {
    /// Parameter can be automated by the host.
    pub can_automate: bool,
    /// Parameter is display only.
    pub is_readonly: bool,
}

impl ParameterFlags {
    pub const DEFAULT: Self = Self {
        can_automate: true,
        is_readonly: false,
    };
}

impl Default for ParameterFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// =============================================================================
// ParameterInfo
// =============================================================================

/// Description of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterInfo {
    /// Stable identifier used in persisted state. Must be unique per set.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Abbreviated name for narrow host displays. Empty means "use `name`".
    pub short_name: &'static str,
    /// Unit override. Empty means "use the formatter's unit".
    pub units: &'static str,
    /// Plain value at normalized 0.
    pub min: f64,
    /// Plain value at normalized 1.
    pub max: f64,
    /// Normalized default value.
    pub default_normalized: ParameterValue,
    /// Number of discrete steps (0 = continuous).
    pub step_count: u32,
    pub formatter: Formatter,
    pub flags: ParameterFlags,
}

impl ParameterInfo {
    /// A continuous `0.0..=1.0` parameter defaulting to 0.
    pub const fn new(id: &'static str, name: &'static str) -> Self {
        Self {
            id,
            name,
            short_name: "",
            units: "",
            min: 0.0,
            max: 1.0,
            default_normalized: 0.0,
            step_count: 0,
            formatter: Formatter::Float { precision: 2 },
            flags: ParameterFlags::DEFAULT,
        }
    }

    pub const fn with_short_name(mut self, short_name: &'static str) -> Self {
        self.short_name = short_name;
        self
    }

    pub const fn with_units(mut self, units: &'static str) -> Self {
        self.units = units;
        self
    }

    /// Set the plain range mapped onto `[0, 1]`.
    pub const fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Set the default as a normalized value.
    pub const fn with_default(mut self, normalized: ParameterValue) -> Self {
        self.default_normalized = normalized;
        self
    }

    pub const fn with_steps(mut self, step_count: u32) -> Self {
        self.step_count = step_count;
        self
    }

    pub const fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub const fn with_flags(mut self, flags: ParameterFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Map a normalized value to the plain range, snapping to steps.
    pub fn to_plain(&self, normalized: ParameterValue) -> f64 {
        let normalized = normalized.clamp(0.0, 1.0);
        let normalized = if self.step_count > 0 {
            let steps = self.step_count as f64;
            (normalized * steps).round() / steps
        } else {
            normalized
        };
        self.min + normalized * (self.max - self.min)
    }

    /// Map a plain value back to `[0, 1]`.
    pub fn to_normalized(&self, plain: f64) -> ParameterValue {
        let span = self.max - self.min;
        if span == 0.0 {
            return 0.0;
        }
        ((plain - self.min) / span).clamp(0.0, 1.0)
    }

    /// Name shown on narrow displays.
    pub fn display_short_name(&self) -> &'static str {
        if self.short_name.is_empty() {
            self.name
        } else {
            self.short_name
        }
    }

    /// Unit string shown next to the value.
    pub fn display_units(&self) -> &'static str {
        if self.units.is_empty() {
            self.formatter.unit()
        } else {
            self.units
        }
    }
}

// =============================================================================
// ParameterSet
// =============================================================================

struct ParameterSlot {
    info: ParameterInfo,
    /// `f64` bits of the normalized value
    value: AtomicU64,
}

/// Indexed parameter storage shared between the audio thread and the rest
/// of the plugin.
pub struct ParameterSet {
    slots: Box<[ParameterSlot]>,
}

impl ParameterSet {
    /// Create a set with every parameter at its (clamped) default.
    pub fn new(infos: impl IntoIterator<Item = ParameterInfo>) -> Self {
        let slots: Box<[ParameterSlot]> = infos
            .into_iter()
            .map(|info| {
                let default = sanitize(info.default_normalized).unwrap_or(0.0);
                ParameterSlot {
                    info,
                    value: AtomicU64::new(default.to_bits()),
                }
            })
            .collect();

        for (i, slot) in slots.iter().enumerate() {
            if slots[..i].iter().any(|other| other.info.id == slot.info.id) {
                log::warn!(
                    "duplicate parameter id '{}' at index {}; persisted state will only restore the first",
                    slot.info.id,
                    i
                );
            }
        }

        Self { slots }
    }

    /// A set without parameters.
    pub fn empty() -> Self {
        Self::new(std::iter::empty::<ParameterInfo>())
    }

    /// Number of parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, index: ParameterIndex) -> BridgeResult<&ParameterSlot> {
        self.slots
            .get(index)
            .ok_or(BridgeError::ParameterIndexOutOfRange {
                index,
                count: self.slots.len(),
            })
    }

    /// Metadata for a parameter.
    pub fn info(&self, index: ParameterIndex) -> BridgeResult<&ParameterInfo> {
        self.slot(index).map(|slot| &slot.info)
    }

    /// Current normalized value.
    pub fn get(&self, index: ParameterIndex) -> BridgeResult<ParameterValue> {
        self.slot(index).map(|slot| load(&slot.value))
    }

    /// Current normalized value, or `None` for an unknown index.
    ///
    /// Lock-free; meant for the audio thread.
    #[inline]
    pub fn load(&self, index: ParameterIndex) -> Option<ParameterValue> {
        self.slots.get(index).map(|slot| load(&slot.value))
    }

    /// Store a value, clamped to `[0, 1]`, and return what was stored.
    ///
    /// Infinities clamp to the nearest end; NaN is rejected.
    pub fn set(&self, index: ParameterIndex, value: ParameterValue) -> BridgeResult<ParameterValue> {
        let slot = self.slot(index)?;
        let value = sanitize(value).ok_or(BridgeError::NonFiniteValue { index })?;
        slot.value.store(value.to_bits(), Ordering::Relaxed);
        Ok(value)
    }

    /// Current value mapped to the parameter's plain range.
    pub fn plain(&self, index: ParameterIndex) -> BridgeResult<f64> {
        let slot = self.slot(index)?;
        Ok(slot.info.to_plain(load(&slot.value)))
    }

    /// Display text of the current value.
    pub fn text(&self, index: ParameterIndex) -> BridgeResult<String> {
        let value = self.get(index)?;
        self.text_for(index, value)
    }

    /// Display text for an arbitrary normalized value.
    pub fn text_for(&self, index: ParameterIndex, normalized: ParameterValue) -> BridgeResult<String> {
        let info = self.info(index)?;
        Ok(info.formatter.text(info.to_plain(normalized)))
    }

    /// Parse display text into a normalized value.
    ///
    /// Returns `Ok(None)` when the text does not parse.
    pub fn parse(&self, index: ParameterIndex, text: &str) -> BridgeResult<Option<ParameterValue>> {
        let info = self.info(index)?;
        Ok(info
            .formatter
            .parse(text)
            .map(|plain| info.to_normalized(plain)))
    }

    /// Index of the parameter with the given id.
    pub fn index_of(&self, id: &str) -> Option<ParameterIndex> {
        self.slots.iter().position(|slot| slot.info.id == id)
    }

    /// Iterate over `(index, info, normalized value)`.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterIndex, &ParameterInfo, ParameterValue)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (index, &slot.info, load(&slot.value)))
    }

    /// Put every parameter back to its default.
    pub fn reset_to_defaults(&self) {
        for slot in self.slots.iter() {
            let default = sanitize(slot.info.default_normalized).unwrap_or(0.0);
            slot.value.store(default.to_bits(), Ordering::Relaxed);
        }
    }

    /// Store an already validated value.
    pub(crate) fn store_validated(&self, index: ParameterIndex, value: ParameterValue) {
        debug_assert!((0.0..=1.0).contains(&value));
        if let Some(slot) = self.slots.get(index) {
            slot.value.store(value.to_bits(), Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for ParameterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(_, info, value)| (info.id, value)))
            .finish()
    }
}

#[inline]
fn load(value: &AtomicU64) -> ParameterValue {
    f64::from_bits(value.load(Ordering::Relaxed))
}

/// Clamp to `[0, 1]`, rejecting NaN.
#[inline]
fn sanitize(value: ParameterValue) -> Option<ParameterValue> {
    (!value.is_nan()).then(|| value.clamp(0.0, 1.0))
}
