//! # ViGEm Output Device
//!
//! Virtual Xbox 360 pad on Windows through the ViGEmBus driver.
//!
//! The XInput report is narrower than the Linux vocabulary:
//!
//! | Control | XInput field | Range |
//! |---------|--------------|-------|
//! | ABS_X / ABS_Y | Left thumb | -32768..32767 |
//! | ABS_RX / ABS_RY | Right thumb | -32768..32767 |
//! | ABS_Z / ABS_RZ | Left / right trigger | 0..255 |
//! | BTN_SOUTH, BTN_EAST, BTN_WEST, BTN_NORTH | A, B, X, Y | 0/1 |
//! | BTN_TL, BTN_TR | LB, RB | 0/1 |
//! | BTN_SELECT, BTN_START | Back, Start | 0/1 |
//!
//! Declared controls without an XInput slot (hats, D-Pad buttons, stick
//! clicks, ...) are accepted and ignored.

use tracing::{info, trace};
use vigem_client::{Client, TargetId, XButtons, XGamepad, Xbox360Wired};

use super::vocabulary::{AxisRange, Vocabulary};
use super::{DeviceSpec, OutputDevice};
use crate::controller::controls::ControlCode;
use crate::error::{BridgeError, Result};

/// Thumb stick range
pub const THUMB_RANGE: AxisRange = AxisRange::new(i16::MIN as i32, i16::MAX as i32);

/// Trigger range
pub const TRIGGER_RANGE: AxisRange = AxisRange::new(0, u8::MAX as i32);

/// Hats have no XInput slot; the range only matters for validation
const HAT_RANGE: AxisRange = AxisRange::new(-1, 1);

/// Virtual Xbox 360 pad.
pub struct VigemDevice {
    target: Option<Xbox360Wired<Client>>,
    vocabulary: Vocabulary,
    report: XGamepad,
    committed: XGamepad,
    name: String,
}

impl VigemDevice {
    /// Connect to ViGEmBus and plug in a virtual pad
    ///
    /// # Errors
    ///
    /// Returns `Device` if the driver is not installed or refuses the target.
    pub fn open(spec: &DeviceSpec) -> Result<Self> {
        let client = Client::connect()
            .map_err(|e| BridgeError::Device(format!("Failed to connect to ViGEmBus: {}", e)))?;

        let mut target = Xbox360Wired::new(client, TargetId::XBOX360_WIRED);
        target
            .plugin()
            .map_err(|e| BridgeError::Device(format!("Failed to plug in virtual pad: {}", e)))?;
        target
            .wait_ready()
            .map_err(|e| BridgeError::Device(format!("Virtual pad not ready: {}", e)))?;

        let mut vocabulary = Vocabulary::new(&spec.controls, THUMB_RANGE, HAT_RANGE);
        vocabulary.set_range(ControlCode::AbsZ, TRIGGER_RANGE);
        vocabulary.set_range(ControlCode::AbsRz, TRIGGER_RANGE);

        info!("Plugged in virtual Xbox 360 pad \"{}\"", spec.name);

        Ok(Self {
            target: Some(target),
            vocabulary,
            report: XGamepad::default(),
            committed: XGamepad::default(),
            name: spec.name.clone(),
        })
    }
}

impl OutputDevice for VigemDevice {
    fn emit(&mut self, code: ControlCode, value: f32) -> Result<()> {
        if self.target.is_none() {
            return Err(BridgeError::DeviceClosed);
        }
        let native = self.vocabulary.resolve(code, value)?;

        if let Some(bit) = button_bit(code) {
            if native != 0 {
                self.report.buttons.raw |= bit;
            } else {
                self.report.buttons.raw &= !bit;
            }
            return Ok(());
        }

        match code {
            ControlCode::AbsX => self.report.thumb_lx = native as i16,
            ControlCode::AbsY => self.report.thumb_ly = native as i16,
            ControlCode::AbsRx => self.report.thumb_rx = native as i16,
            ControlCode::AbsRy => self.report.thumb_ry = native as i16,
            ControlCode::AbsZ => self.report.left_trigger = native as u8,
            ControlCode::AbsRz => self.report.right_trigger = native as u8,
            other => trace!("{} has no XInput counterpart, ignored", other),
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let target = self.target.as_mut().ok_or(BridgeError::DeviceClosed)?;
        match target.update(&self.report) {
            Ok(()) => {
                self.committed = self.report.clone();
                Ok(())
            }
            Err(e) => {
                self.report = self.committed.clone();
                Err(BridgeError::Device(format!("Failed to update virtual pad: {}", e)))
            }
        }
    }

    fn discard(&mut self) {
        self.report = self.committed.clone();
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut target) = self.target.take() {
            info!("Unplugging virtual pad \"{}\"", self.name);
            target
                .unplug()
                .map_err(|e| BridgeError::Device(format!("Failed to unplug virtual pad: {}", e)))?;
        }
        Ok(())
    }
}

/// XInput button mask for the 8 supported buttons
fn button_bit(code: ControlCode) -> Option<u16> {
    match code {
        ControlCode::BtnSouth => Some(XButtons::A),
        ControlCode::BtnEast => Some(XButtons::B),
        ControlCode::BtnWest => Some(XButtons::X),
        ControlCode::BtnNorth => Some(XButtons::Y),
        ControlCode::BtnTl => Some(XButtons::LB),
        ControlCode::BtnTr => Some(XButtons::RB),
        ControlCode::BtnSelect => Some(XButtons::BACK),
        ControlCode::BtnStart => Some(XButtons::START),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eight_buttons_supported() {
        let supported = [
            ControlCode::BtnSouth,
            ControlCode::BtnEast,
            ControlCode::BtnWest,
            ControlCode::BtnNorth,
            ControlCode::BtnTl,
            ControlCode::BtnTr,
            ControlCode::BtnSelect,
            ControlCode::BtnStart,
        ];
        for code in supported {
            assert!(button_bit(code).is_some(), "{}", code);
        }
        assert!(button_bit(ControlCode::BtnMode).is_none());
        assert!(button_bit(ControlCode::BtnDpadUp).is_none());
    }

    #[test]
    fn test_thumb_range_covers_i16() {
        assert_eq!(THUMB_RANGE.to_native(-1.0), i16::MIN as i32);
        assert_eq!(THUMB_RANGE.to_native(1.0), i16::MAX as i32);
        assert_eq!(TRIGGER_RANGE.to_native(1.0), 255);
    }
}
