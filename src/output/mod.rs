//! # Output Module
//!
//! Virtual controller devices.
//!
//! Every backend implements [`OutputDevice`]: emissions are buffered by
//! `emit` and delivered to the OS as one frame by `commit`. The vocabulary is
//! fixed when the device is built; emitting an undeclared control is an
//! error, while a declared control that the backend has no native slot for
//! is silently ignored. A frame that fails partway is dropped with
//! `discard`, so none of it reaches the next commit.
//!
//! ## Backends
//!
//! | Backend | Platform | Vocabulary |
//! |---------|----------|------------|
//! | `uinput` | Linux | Every [`ControlCode`] |
//! | `vigem` | Windows | 8 buttons, 2 sticks, 2 triggers |
//! | `dry-run` | Any | Every [`ControlCode`], frames are only logged |

pub mod dry_run;
pub mod vocabulary;

#[cfg(target_os = "linux")]
pub mod uinput;

#[cfg(windows)]
pub mod vigem;

use serde::Deserialize;

use crate::controller::controls::ControlCode;
use crate::error::{BridgeError, Result};

pub use vocabulary::{AxisRange, ControlSpec, Vocabulary};

/// Linux `BUS_VIRTUAL` bus type
pub const BUS_VIRTUAL: u16 = 0x06;

/// Capability interface of a virtual controller.
#[cfg_attr(test, mockall::automock)]
pub trait OutputDevice: Send {
    /// Buffer one emission.
    ///
    /// # Errors
    ///
    /// - `UnregisteredControl` if `code` was not declared at construction
    /// - `DeviceClosed` after [`close`](OutputDevice::close)
    fn emit(&mut self, code: ControlCode, value: f32) -> Result<()>;

    /// Deliver all buffered emissions as one input frame.
    ///
    /// # Errors
    ///
    /// - `DeviceClosed` after [`close`](OutputDevice::close)
    /// - `Device` / `Io` if the OS rejects the frame
    ///
    /// The buffer is empty afterwards whether or not delivery succeeded.
    fn commit(&mut self) -> Result<()>;

    /// Drop everything buffered since the last commit.
    ///
    /// The device state returns to what the last successful commit sent.
    fn discard(&mut self);

    /// Release the OS device. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// Which backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Linux uinput virtual device
    Uinput,
    /// Windows ViGEmBus virtual Xbox 360 pad
    Vigem,
    /// No OS device; frames are logged
    DryRun,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(windows) {
            BackendKind::Vigem
        } else {
            BackendKind::Uinput
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "uinput" => Ok(BackendKind::Uinput),
            "vigem" => Ok(BackendKind::Vigem),
            "dry-run" => Ok(BackendKind::DryRun),
            other => Err(format!(
                "unknown backend '{}' (expected uinput, vigem or dry-run)",
                other
            )),
        }
    }
}

/// Construction parameters shared by all backends.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    /// Name the OS shows for the device.
    pub name: String,
    /// Controls to declare, in order.
    pub controls: Vec<ControlCode>,
    /// Bus type reported to the OS.
    pub bus: u16,
}

impl DeviceSpec {
    /// Creates a spec on the virtual bus.
    #[must_use]
    pub fn new(name: impl Into<String>, controls: Vec<ControlCode>) -> Self {
        Self {
            name: name.into(),
            controls,
            bus: BUS_VIRTUAL,
        }
    }
}

/// Open the configured backend.
///
/// # Errors
///
/// - `NameConflict` if another input device already has `spec.name` (uinput)
/// - `Device` if the backend is not available on this platform or the OS
///   refuses to create the device
pub fn open_output_device(kind: BackendKind, spec: &DeviceSpec) -> Result<Box<dyn OutputDevice>> {
    match kind {
        BackendKind::DryRun => Ok(Box::new(dry_run::DryRunDevice::new(spec))),

        #[cfg(target_os = "linux")]
        BackendKind::Uinput => Ok(Box::new(uinput::UinputDevice::open(spec)?)),

        #[cfg(windows)]
        BackendKind::Vigem => Ok(Box::new(vigem::VigemDevice::open(spec)?)),

        #[allow(unreachable_patterns)]
        other => Err(BridgeError::Device(format!(
            "backend {:?} is not available on this platform",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("uinput".parse::<BackendKind>(), Ok(BackendKind::Uinput));
        assert_eq!("vigem".parse::<BackendKind>(), Ok(BackendKind::Vigem));
        assert_eq!("dry-run".parse::<BackendKind>(), Ok(BackendKind::DryRun));
        assert!("evdev".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_default_for_platform() {
        if cfg!(windows) {
            assert_eq!(BackendKind::default(), BackendKind::Vigem);
        } else {
            assert_eq!(BackendKind::default(), BackendKind::Uinput);
        }
    }

    #[test]
    fn test_device_spec_uses_virtual_bus() {
        let spec = DeviceSpec::new("Yoke", vec![ControlCode::AbsX]);
        assert_eq!(spec.bus, 0x06);
    }

    #[test]
    fn test_open_dry_run() {
        let spec = DeviceSpec::new("Yoke", vec![ControlCode::AbsX]);
        let mut device = open_output_device(BackendKind::DryRun, &spec).unwrap();
        assert!(device.emit(ControlCode::AbsX, 0.5).is_ok());
        assert!(device.commit().is_ok());
        device.discard();
        assert!(device.close().is_ok());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_open_vigem_unavailable() {
        let spec = DeviceSpec::new("Yoke", vec![ControlCode::AbsX]);
        match open_output_device(BackendKind::Vigem, &spec) {
            Err(BridgeError::Device(msg)) => assert!(msg.contains("not available")),
            Err(other) => panic!("Expected Device error, got: {:?}", other),
            Ok(_) => panic!("Expected Device error, got a device"),
        }
    }
}
