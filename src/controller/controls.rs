//! # Control Codes
//!
//! The fixed vocabulary of controls a virtual pad can declare.
//!
//! Names follow the Linux input event code names so config files read the
//! same as `evtest` output.
//!
//! ## Axes
//!
//! | Code | Typical use |
//! |------|-------------|
//! | ABS_X / ABS_Y | Left stick |
//! | ABS_RX / ABS_RY | Right stick |
//! | ABS_Z / ABS_RZ | Analog triggers |
//! | ABS_HAT0X / ABS_HAT0Y | D-Pad as hat switch |
//!
//! ## Buttons
//!
//! Face buttons (`BTN_SOUTH`, `BTN_EAST`, `BTN_NORTH`, `BTN_WEST`), shoulders,
//! system buttons, stick clicks and the four D-Pad buttons.

use std::fmt;

use serde::Deserialize;

/// What kind of input a control code represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Digital on/off.
    Button,
    /// Continuous axis, -1.0..1.0 before rescaling.
    Axis,
    /// Three-position hat switch (-1, 0, 1).
    Hat,
}

/// Enumerated controller button, axis or hat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ControlCode {
    #[serde(rename = "ABS_X")]
    AbsX,
    #[serde(rename = "ABS_Y")]
    AbsY,
    #[serde(rename = "ABS_Z")]
    AbsZ,
    #[serde(rename = "ABS_RX")]
    AbsRx,
    #[serde(rename = "ABS_RY")]
    AbsRy,
    #[serde(rename = "ABS_RZ")]
    AbsRz,
    #[serde(rename = "ABS_HAT0X")]
    Hat0X,
    #[serde(rename = "ABS_HAT0Y")]
    Hat0Y,
    #[serde(rename = "BTN_SOUTH")]
    BtnSouth,
    #[serde(rename = "BTN_EAST")]
    BtnEast,
    #[serde(rename = "BTN_NORTH")]
    BtnNorth,
    #[serde(rename = "BTN_WEST")]
    BtnWest,
    #[serde(rename = "BTN_TL")]
    BtnTl,
    #[serde(rename = "BTN_TR")]
    BtnTr,
    #[serde(rename = "BTN_TL2")]
    BtnTl2,
    #[serde(rename = "BTN_TR2")]
    BtnTr2,
    #[serde(rename = "BTN_SELECT")]
    BtnSelect,
    #[serde(rename = "BTN_START")]
    BtnStart,
    #[serde(rename = "BTN_MODE")]
    BtnMode,
    #[serde(rename = "BTN_THUMBL")]
    BtnThumbL,
    #[serde(rename = "BTN_THUMBR")]
    BtnThumbR,
    #[serde(rename = "BTN_DPAD_UP")]
    BtnDpadUp,
    #[serde(rename = "BTN_DPAD_DOWN")]
    BtnDpadDown,
    #[serde(rename = "BTN_DPAD_LEFT")]
    BtnDpadLeft,
    #[serde(rename = "BTN_DPAD_RIGHT")]
    BtnDpadRight,
}

/// Vocabulary declared by default: two sticks, a hat and the usual gamepad buttons.
pub const GAMEPAD_CONTROLS: &[ControlCode] = &[
    ControlCode::AbsX,
    ControlCode::AbsY,
    ControlCode::AbsRx,
    ControlCode::AbsRy,
    ControlCode::Hat0X,
    ControlCode::Hat0Y,
    ControlCode::BtnSouth,
    ControlCode::BtnEast,
    ControlCode::BtnDpadDown,
    ControlCode::BtnDpadRight,
    ControlCode::BtnDpadUp,
    ControlCode::BtnDpadLeft,
    ControlCode::BtnTr,
    ControlCode::BtnTl,
    ControlCode::BtnStart,
    ControlCode::BtnSelect,
    ControlCode::BtnMode,
];

impl ControlCode {
    /// Kind of input this code represents.
    #[must_use]
    pub fn kind(self) -> ControlKind {
        match self {
            ControlCode::AbsX
            | ControlCode::AbsY
            | ControlCode::AbsZ
            | ControlCode::AbsRx
            | ControlCode::AbsRy
            | ControlCode::AbsRz => ControlKind::Axis,
            ControlCode::Hat0X | ControlCode::Hat0Y => ControlKind::Hat,
            _ => ControlKind::Button,
        }
    }

    /// Input event code name, e.g. `"ABS_X"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ControlCode::AbsX => "ABS_X",
            ControlCode::AbsY => "ABS_Y",
            ControlCode::AbsZ => "ABS_Z",
            ControlCode::AbsRx => "ABS_RX",
            ControlCode::AbsRy => "ABS_RY",
            ControlCode::AbsRz => "ABS_RZ",
            ControlCode::Hat0X => "ABS_HAT0X",
            ControlCode::Hat0Y => "ABS_HAT0Y",
            ControlCode::BtnSouth => "BTN_SOUTH",
            ControlCode::BtnEast => "BTN_EAST",
            ControlCode::BtnNorth => "BTN_NORTH",
            ControlCode::BtnWest => "BTN_WEST",
            ControlCode::BtnTl => "BTN_TL",
            ControlCode::BtnTr => "BTN_TR",
            ControlCode::BtnTl2 => "BTN_TL2",
            ControlCode::BtnTr2 => "BTN_TR2",
            ControlCode::BtnSelect => "BTN_SELECT",
            ControlCode::BtnStart => "BTN_START",
            ControlCode::BtnMode => "BTN_MODE",
            ControlCode::BtnThumbL => "BTN_THUMBL",
            ControlCode::BtnThumbR => "BTN_THUMBR",
            ControlCode::BtnDpadUp => "BTN_DPAD_UP",
            ControlCode::BtnDpadDown => "BTN_DPAD_DOWN",
            ControlCode::BtnDpadLeft => "BTN_DPAD_LEFT",
            ControlCode::BtnDpadRight => "BTN_DPAD_RIGHT",
        }
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
