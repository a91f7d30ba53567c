//! # Device Vocabulary
//!
//! The set of controls a device declared at construction, together with the
//! native value range of each analog control.

use crate::controller::controls::{ControlCode, ControlKind};
use crate::error::{BridgeError, Result};

/// Native integer range of an analog control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    /// Value reported for -1.0.
    pub min: i32,
    /// Value reported for 1.0.
    pub max: i32,
}

impl AxisRange {
    /// Creates a range. `min` must be below `max`.
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Number of native steps in the range.
    #[must_use]
    pub fn span(&self) -> i64 {
        i64::from(self.max) - i64::from(self.min)
    }

    /// Size of one native step in normalized units.
    #[must_use]
    pub fn quantum(&self) -> f32 {
        2.0 / self.span() as f32
    }

    /// Rescales a normalized value (-1.0..1.0) to the native range.
    ///
    /// Out-of-range input is clamped; the result is rounded to the nearest step.
    ///
    /// # Examples
    ///
    /// ```
    /// use yoke_bridge::output::AxisRange;
    ///
    /// let range = AxisRange::new(0, 255);
    /// assert_eq!(range.to_native(-1.0), 0);
    /// assert_eq!(range.to_native(1.0), 255);
    /// assert_eq!(range.to_native(0.0), 128);
    /// ```
    #[must_use]
    pub fn to_native(&self, value: f32) -> i32 {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) };
        let unit = (f64::from(clamped) + 1.0) / 2.0;
        let native = self.min as f64 + (unit * self.span() as f64).round();
        native.clamp(f64::from(self.min), f64::from(self.max)) as i32
    }

    /// Maps a native value back to -1.0..1.0.
    #[must_use]
    pub fn from_native(&self, native: i32) -> f32 {
        let offset = i64::from(native) - i64::from(self.min);
        (offset as f64 / self.span() as f64 * 2.0 - 1.0) as f32
    }
}

/// One declared control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSpec {
    /// Control code.
    pub code: ControlCode,
    /// Native range for axes and hats, `None` for buttons.
    pub range: Option<AxisRange>,
}

/// Controls declared by a device, with native ranges assigned by the backend.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    controls: Vec<ControlSpec>,
}

impl Vocabulary {
    /// Builds a vocabulary, giving every axis `axis_range` and every hat `hat_range`.
    ///
    /// Duplicate codes are declared once.
    #[must_use]
    pub fn new(codes: &[ControlCode], axis_range: AxisRange, hat_range: AxisRange) -> Self {
        let mut controls: Vec<ControlSpec> = Vec::with_capacity(codes.len());
        for &code in codes {
            if controls.iter().any(|spec| spec.code == code) {
                continue;
            }
            let range = match code.kind() {
                ControlKind::Axis => Some(axis_range),
                ControlKind::Hat => Some(hat_range),
                ControlKind::Button => None,
            };
            controls.push(ControlSpec { code, range });
        }
        Self { controls }
    }

    /// Overrides the native range of a declared analog control.
    ///
    /// Undeclared codes and buttons are left alone.
    pub fn set_range(&mut self, code: ControlCode, range: AxisRange) {
        if let Some(spec) = self
            .controls
            .iter_mut()
            .find(|spec| spec.code == code && spec.range.is_some())
        {
            spec.range = Some(range);
        }
    }

    /// Declared controls, in declaration order.
    #[must_use]
    pub fn controls(&self) -> &[ControlSpec] {
        &self.controls
    }

    /// Whether `code` was declared.
    #[must_use]
    pub fn contains(&self, code: ControlCode) -> bool {
        self.get(code).is_some()
    }

    /// Looks up a declared control.
    #[must_use]
    pub fn get(&self, code: ControlCode) -> Option<&ControlSpec> {
        self.controls.iter().find(|spec| spec.code == code)
    }

    /// Resolves an emission to its native value.
    ///
    /// Analog controls are rescaled into their range. Buttons become 1 when
    /// `value >= 0.5`, else 0.
    ///
    /// # Errors
    ///
    /// Returns `UnregisteredControl` if `code` was not declared.
    pub fn resolve(&self, code: ControlCode, value: f32) -> Result<i32> {
        let spec = self.get(code).ok_or(BridgeError::UnregisteredControl(code))?;
        Ok(match spec.range {
            Some(range) => range.to_native(value),
            None => i32::from(value >= 0.5),
        })
    }
}
