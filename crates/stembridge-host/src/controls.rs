//! Host control numbering and plugin-originated control notifications.
//!
//! The host addresses automatable controls by a 1-based control index.
//! Index 1 is the master bypass; parameter `i` is control `i + 2`. Control
//! values travel as 32-bit fixed-point integers (see
//! [`fixed_point`](stembridge_core::fixed_point)).

use std::sync::Arc;

use stembridge_core::fixed_point;
use stembridge_core::host::ParameterHost;
use stembridge_core::{ParameterIndex, ParameterSet, ParameterValue};

/// Control index of the master bypass.
pub const MASTER_BYPASS_CONTROL: usize = 1;

/// Control index of parameter 0.
pub const FIRST_PARAMETER_CONTROL: usize = 2;

/// Step count reported for continuous controls.
pub const CONTINUOUS_STEPS: u32 = u32::MAX;

/// Control id of the master bypass.
pub const BYPASS_CONTROL_ID: &[u8; 4] = b"bypa";

/// Host control index for a parameter.
#[inline]
pub const fn control_index(parameter: ParameterIndex) -> usize {
    parameter + FIRST_PARAMETER_CONTROL
}

/// What a host control index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTarget {
    Bypass,
    Parameter(ParameterIndex),
    Unknown,
}

impl ControlTarget {
    /// Resolve a control index against a parameter count.
    pub fn resolve(control_index: usize, parameter_count: usize) -> Self {
        match control_index {
            MASTER_BYPASS_CONTROL => Self::Bypass,
            i if i >= FIRST_PARAMETER_CONTROL && i - FIRST_PARAMETER_CONTROL < parameter_count => {
                Self::Parameter(i - FIRST_PARAMETER_CONTROL)
            }
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    OnOff,
    Continuous,
}

/// Everything the host asks about one control at initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlDescriptor {
    pub control_index: usize,
    pub id: u32,
    /// Name variants, longest first, separated by `\n`.
    pub name: String,
    pub kind: ControlKind,
    pub default_value: i32,
    pub num_steps: u32,
    pub automatable: bool,
}

impl ControlDescriptor {
    /// The master bypass control, off by default.
    pub fn master_bypass() -> Self {
        Self {
            control_index: MASTER_BYPASS_CONTROL,
            id: u32::from_be_bytes(*BYPASS_CONTROL_ID),
            name: "Master Bypass\nMastrByp\nMByp\nByp".to_string(),
            kind: ControlKind::OnOff,
            default_value: 0,
            num_steps: 2,
            automatable: true,
        }
    }

    /// Descriptors for the bypass control followed by every parameter.
    pub fn describe(parameters: &ParameterSet) -> Vec<Self> {
        let mut controls = Vec::with_capacity(parameters.len() + 1);
        controls.push(Self::master_bypass());
        controls.extend(parameters.iter().map(|(index, info, _)| {
            if info.name.is_empty() {
                log::warn!("parameter {index} ('{}') has no name", info.id);
            }
            let name = match info.display_short_name() {
                short if short != info.name => format!("{}\n{}", info.name, short),
                _ => info.name.to_string(),
            };
            Self {
                control_index: control_index(index),
                id: index as u32 + 1,
                name,
                kind: ControlKind::Continuous,
                default_value: fixed_point::encode(0.0),
                num_steps: CONTINUOUS_STEPS,
                automatable: info.flags.can_automate,
            }
        }));
        controls
    }
}

// =============================================================================
// ControlSurface
// =============================================================================

/// The host side of plugin-originated control changes.
pub trait ControlSurface: Send + Sync {
    fn set_control_value(&self, control_index: usize, value: i32);
    fn touch_control(&self, control_index: usize);
    fn release_control(&self, control_index: usize);
}

/// Adapts a [`ControlSurface`] into the bridge's [`ParameterHost`].
pub struct ControlSurfaceHost<S: ?Sized> {
    surface: Arc<S>,
}

impl<S: ControlSurface + ?Sized> ControlSurfaceHost<S> {
    pub fn new(surface: Arc<S>) -> Self {
        Self { surface }
    }
}

impl<S: ControlSurface + ?Sized> ParameterHost for ControlSurfaceHost<S> {
    fn parameter_changed(&self, index: ParameterIndex, value: ParameterValue) {
        self.surface
            .set_control_value(control_index(index), fixed_point::encode(value));
    }

    fn begin_gesture(&self, index: ParameterIndex) {
        self.surface.touch_control(control_index(index));
    }

    fn end_gesture(&self, index: ParameterIndex) {
        self.surface.release_control(control_index(index));
    }
}
