//! # Layout Mapper
//!
//! Table-driven [`EventMapper`]: each binding routes one reading channel to
//! one control.
//!
//! ## Default Layout
//!
//! | Channel | Input | Control |
//! |---------|-------|---------|
//! | 0 | Tilt left/right | ABS_X |
//! | 1 | Tilt forward/back | ABS_Y |
//! | 2 | Aux 1 | ABS_RX |
//! | 3 | Aux 2 | ABS_RY |
//! | 4 | Aux 3 | BTN_SOUTH |
//! | 5 | Aux 4 | BTN_EAST |
//!
//! ## Binding Semantics
//!
//! - **Axis**: value clamped to -1.0..1.0, optionally inverted.
//! - **Button**: pressed (1.0) when the value is above `threshold`.
//! - **Hat**: -1 below `-threshold`, 1 above `threshold`, 0 otherwise.
//!
//! ## Usage
//!
//! ```
//! use yoke_bridge::controller::layout::LayoutMapper;
//! use yoke_bridge::controller::mapper::EventMapper;
//!
//! let mapper = LayoutMapper::default();
//! let events = mapper.map(&[0.0, 0.0, 0.0, 0.0, 1.0, -1.0])?;
//! assert_eq!(events.len(), 6);
//! assert_eq!(events[4].value, 1.0); // BTN_SOUTH pressed
//! assert_eq!(events[5].value, 0.0); // BTN_EAST released
//! # Ok::<(), yoke_bridge::error::MappingError>(())
//! ```

use serde::Deserialize;

use super::controls::{ControlCode, ControlKind};
use super::mapper::{DeviceEvent, EventMapper};
use crate::error::MappingError;

/// Default threshold for hat bindings.
pub const DEFAULT_HAT_THRESHOLD: f32 = 0.5;

/// Routes one reading channel to one control.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Binding {
    /// Index into the reading vector.
    pub channel: usize,

    /// Control the channel drives.
    pub control: ControlCode,

    /// Flip the sign before mapping.
    #[serde(default)]
    pub invert: bool,

    /// Press threshold for buttons and hats. Defaults to 0.0 for buttons
    /// and 0.5 for hats.
    #[serde(default)]
    pub threshold: Option<f32>,
}

impl Binding {
    /// Creates a binding with default threshold and no inversion.
    #[must_use]
    pub fn new(channel: usize, control: ControlCode) -> Self {
        Self {
            channel,
            control,
            invert: false,
            threshold: None,
        }
    }

    /// Returns the effective threshold for this binding's control kind.
    #[must_use]
    pub fn effective_threshold(&self) -> f32 {
        match (self.threshold, self.control.kind()) {
            (Some(threshold), _) => threshold,
            (None, ControlKind::Hat) => DEFAULT_HAT_THRESHOLD,
            (None, _) => 0.0,
        }
    }

    /// Maps a single reading to the event value for this binding.
    #[must_use]
    pub fn apply(&self, reading: f32) -> f32 {
        let value = if self.invert { -reading } else { reading };
        let threshold = self.effective_threshold();

        match self.control.kind() {
            ControlKind::Axis => value.clamp(-1.0, 1.0),
            ControlKind::Button => {
                if value > threshold {
                    1.0
                } else {
                    0.0
                }
            }
            ControlKind::Hat => {
                if value > threshold {
                    1.0
                } else if value < -threshold {
                    -1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Bindings used when the configuration does not override them.
#[must_use]
pub fn default_bindings() -> Vec<Binding> {
    vec![
        Binding::new(0, ControlCode::AbsX),
        Binding::new(1, ControlCode::AbsY),
        Binding::new(2, ControlCode::AbsRx),
        Binding::new(3, ControlCode::AbsRy),
        Binding::new(4, ControlCode::BtnSouth),
        Binding::new(5, ControlCode::BtnEast),
    ]
}

/// Table-driven mapper built from a list of [`Binding`]s.
#[derive(Debug, Clone)]
pub struct LayoutMapper {
    bindings: Vec<Binding>,
}

impl Default for LayoutMapper {
    fn default() -> Self {
        Self::new(default_bindings())
    }
}

impl LayoutMapper {
    /// Creates a mapper from explicit bindings. Events are emitted in binding order.
    #[must_use]
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    /// Returns the configured bindings.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

impl EventMapper for LayoutMapper {
    fn map(&self, readings: &[f32]) -> Result<Vec<DeviceEvent>, MappingError> {
        self.bindings
            .iter()
            .map(|binding| {
                let reading = *readings.get(binding.channel).ok_or(MappingError::MissingChannel {
                    channel: binding.channel,
                    available: readings.len(),
                })?;

                if !reading.is_finite() {
                    return Err(MappingError::NonFinite {
                        channel: binding.channel,
                    });
                }

                Ok(DeviceEvent::new(binding.control, binding.apply(reading)))
            })
            .collect()
    }
}
