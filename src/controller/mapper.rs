//! # Event Mapper
//!
//! Converts a vector of normalized readings into device events.
//!
//! The session engine does not know what any channel means; the mapper is
//! the only application-specific piece. It is called once per accepted
//! packet and every event it returns is emitted in order, followed by one
//! frame commit.
//!
//! ## Usage
//!
//! ```
//! use yoke_bridge::controller::controls::ControlCode;
//! use yoke_bridge::controller::mapper::{DeviceEvent, EventMapper};
//! use yoke_bridge::error::MappingError;
//!
//! /// Tilt drives the left stick Y axis.
//! struct TiltOnly;
//!
//! impl EventMapper for TiltOnly {
//!     fn map(&self, readings: &[f32]) -> Result<Vec<DeviceEvent>, MappingError> {
//!         Ok(vec![DeviceEvent::new(ControlCode::AbsY, readings[1])])
//!     }
//! }
//!
//! let events = TiltOnly.map(&[0.0, 0.5, 0.0, 0.0, 0.0, 0.0])?;
//! assert_eq!(events, vec![DeviceEvent::new(ControlCode::AbsY, 0.5)]);
//! # Ok::<(), MappingError>(())
//! ```

use super::controls::ControlCode;
use crate::error::MappingError;

/// A single (control-code, value) emission.
///
/// Axis values are in -1.0..1.0, hats in -1/0/1 and buttons 0/1. Rescaling to
/// the device's native range happens in the output backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceEvent {
    /// Target control.
    pub code: ControlCode,
    /// Normalized value.
    pub value: f32,
}

impl DeviceEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(code: ControlCode, value: f32) -> Self {
        Self { code, value }
    }
}

/// Maps calibrated readings to device events.
///
/// Implementations should be pure functions of `readings`; `&self` keeps
/// replay deterministic.
#[cfg_attr(test, mockall::automock)]
pub trait EventMapper: Send {
    /// Produce the events for one packet.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingError`] when the readings cannot be mapped. The
    /// session drops the packet and keeps polling.
    fn map(&self, readings: &[f32]) -> Result<Vec<DeviceEvent>, MappingError>;
}
