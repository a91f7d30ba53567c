//! # Channel Calibration
//!
//! Fixed offset/scale transforms applied to the first six telemetry channels.
//!
//! | Channel | Source | Formula |
//! |---------|--------|---------|
//! | 0 | Accelerometer X | `(v / 9.81 - 0.0) * 1.5` |
//! | 1 | Accelerometer Y | `(v / 9.81 - 0.52) * 3.0` |
//! | 2-5 | Auxiliary, 0..1 | `v * 2 - 1` |
//! | 6+ | Extra | unchanged |
//!
//! The constants are tuning values for the phone client's accelerometer and
//! must stay bit-for-bit as they are for wire compatibility.
//!
//! Arithmetic is done in `f64`; the decoder narrows to `f32` only after
//! calibration, so the offset subtraction on channel 1 does not amplify
//! single-precision rounding of the raw reading.

/// Standard gravity used to turn m/s² readings into g.
pub const GRAVITY: f64 = 9.81;

/// Number of channels that receive a calibration transform.
pub const CALIBRATED_CHANNELS: usize = 6;

/// Calibration applied to a single channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelCalibration {
    /// Accelerometer axis: `(v / GRAVITY - offset) * scale`.
    Tilt {
        /// Resting offset in g.
        offset: f64,
        /// Gain applied after the offset.
        scale: f64,
    },
    /// Unit interval rescaled to -1..1: `v * 2 - 1`.
    UnitToSigned,
}

/// Calibration for channels 0..6, in wire order.
pub const CHANNEL_CALIBRATION: [ChannelCalibration; CALIBRATED_CHANNELS] = [
    ChannelCalibration::Tilt { offset: 0.0, scale: 1.5 },
    ChannelCalibration::Tilt { offset: 0.52, scale: 3.0 },
    ChannelCalibration::UnitToSigned,
    ChannelCalibration::UnitToSigned,
    ChannelCalibration::UnitToSigned,
    ChannelCalibration::UnitToSigned,
];

impl ChannelCalibration {
    /// Applies the transform to a raw reading.
    ///
    /// # Examples
    ///
    /// ```
    /// use yoke_bridge::telemetry::calibration::ChannelCalibration;
    ///
    /// let tilt = ChannelCalibration::Tilt { offset: 0.0, scale: 1.5 };
    /// assert!((tilt.apply(9.81) - 1.5).abs() < 1e-6);
    ///
    /// assert_eq!(ChannelCalibration::UnitToSigned.apply(1.0), 1.0);
    /// assert_eq!(ChannelCalibration::UnitToSigned.apply(0.0), -1.0);
    /// ```
    #[inline]
    #[must_use]
    pub fn apply(&self, raw: f64) -> f64 {
        match *self {
            ChannelCalibration::Tilt { offset, scale } => (raw / GRAVITY - offset) * scale,
            ChannelCalibration::UnitToSigned => raw * 2.0 - 1.0,
        }
    }
}

/// Calibrates a reading by channel index; channels past the table pass through.
#[inline]
#[must_use]
pub fn calibrate(channel: usize, raw: f64) -> f64 {
    match CHANNEL_CALIBRATION.get(channel) {
        Some(calibration) => calibration.apply(raw),
        None => raw,
    }
}
