//! # uinput Output Device
//!
//! Creates a virtual joystick through `/dev/uinput` using the evdev crate.
//!
//! ## Native Ranges
//!
//! | Control | Range |
//! |---------|-------|
//! | Sticks / triggers | 0-255 |
//! | Hats | -1/0/1 |
//! | Buttons | 0/1 |
//!
//! Emissions are collected into a pending list; `commit` writes them with a
//! single `VirtualDevice::emit`, which terminates the batch with
//! `SYN_REPORT` so readers see one atomic frame.

use std::fs;
use std::path::Path;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use tracing::{debug, info};

use super::vocabulary::{AxisRange, Vocabulary};
use super::{DeviceSpec, OutputDevice};
use crate::controller::controls::{ControlCode, ControlKind};
use crate::error::{BridgeError, Result};

/// Sysfs directory listing registered input devices
pub const SYSFS_INPUT_DIR: &str = "/sys/class/input";

/// Native stick range
pub const STICK_RANGE: AxisRange = AxisRange::new(0, 255);

/// Native hat range
pub const HAT_RANGE: AxisRange = AxisRange::new(-1, 1);

/// Vendor/product reported for the virtual device
const VENDOR_ID: u16 = 0x1209;
const PRODUCT_ID: u16 = 0x594b;
const VERSION: u16 = 1;

/// Virtual joystick backed by uinput.
pub struct UinputDevice {
    device: Option<VirtualDevice>,
    vocabulary: Vocabulary,
    pending: Vec<InputEvent>,
    name: String,
}

impl std::fmt::Debug for UinputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UinputDevice")
            .field("name", &self.name)
            .field("open", &self.device.is_some())
            .finish_non_exhaustive()
    }
}

impl UinputDevice {
    /// Create the virtual device
    ///
    /// # Errors
    ///
    /// - `NameConflict` if a joystick named `spec.name` already exists
    /// - `Device` if uinput is unavailable (missing module or permissions)
    pub fn open(spec: &DeviceSpec) -> Result<Self> {
        ensure_name_available(&spec.name, Path::new(SYSFS_INPUT_DIR))?;

        let vocabulary = Vocabulary::new(&spec.controls, STICK_RANGE, HAT_RANGE);
        let device = build_device(spec, &vocabulary)
            .map_err(|e| BridgeError::Device(format!("Failed to create uinput device: {}", e)))?;

        info!(
            "Created uinput device \"{}\" with {} controls",
            spec.name,
            vocabulary.controls().len()
        );

        Ok(Self {
            device: Some(device),
            vocabulary,
            pending: Vec::new(),
            name: spec.name.clone(),
        })
    }
}

impl OutputDevice for UinputDevice {
    fn emit(&mut self, code: ControlCode, value: f32) -> Result<()> {
        if self.device.is_none() {
            return Err(BridgeError::DeviceClosed);
        }
        let native = self.vocabulary.resolve(code, value)?;
        let event = input_event(code, native).ok_or(BridgeError::UnregisteredControl(code))?;
        self.pending.push(event);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let device = self.device.as_mut().ok_or(BridgeError::DeviceClosed)?;
        let result = device.emit(&self.pending);
        self.pending.clear();
        Ok(result?)
    }

    fn discard(&mut self) {
        self.pending.clear();
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the VirtualDevice destroys it
        if self.device.take().is_some() {
            self.pending.clear();
            info!("Destroyed uinput device \"{}\"", self.name);
        }
        Ok(())
    }
}

/// Fail with `NameConflict` if any joystick under `sysfs_input` is called `name`
///
/// Looks at `<sysfs_input>/js*/device/name`. A missing directory means there
/// is nothing to conflict with.
pub fn ensure_name_available(name: &str, sysfs_input: &Path) -> Result<()> {
    let entries = match fs::read_dir(sysfs_input) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot scan {}: {}", sysfs_input.display(), e);
            return Ok(());
        }
    };

    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with("js") {
            continue;
        }

        let name_path = entry.path().join("device").join("name");
        if let Ok(existing) = fs::read_to_string(&name_path) {
            if existing.trim() == name {
                return Err(BridgeError::NameConflict(name.to_string()));
            }
        }
    }

    Ok(())
}

fn build_device(spec: &DeviceSpec, vocabulary: &Vocabulary) -> std::io::Result<VirtualDevice> {
    let mut keys = AttributeSet::<Key>::new();
    for control in vocabulary.controls() {
        if let Some(key) = key_for(control.code) {
            keys.insert(key);
        }
    }

    let mut builder = VirtualDeviceBuilder::new()?
        .name(&spec.name)
        .input_id(InputId::new(BusType(spec.bus), VENDOR_ID, PRODUCT_ID, VERSION))
        .with_keys(&keys)?;

    for control in vocabulary.controls() {
        if let (Some(range), Some(axis)) = (control.range, axis_for(control.code)) {
            let center = range.to_native(0.0);
            let info = AbsInfo::new(center, range.min, range.max, 0, 0, 0);
            builder = builder.with_absolute_axis(&UinputAbsSetup::new(axis, info))?;
        }
    }

    builder.build()
}

fn input_event(code: ControlCode, native: i32) -> Option<InputEvent> {
    match code.kind() {
        ControlKind::Button => {
            key_for(code).map(|key| InputEvent::new(EventType::KEY, key.code(), native))
        }
        ControlKind::Axis | ControlKind::Hat => {
            axis_for(code).map(|axis| InputEvent::new(EventType::ABSOLUTE, axis.0, native))
        }
    }
}

/// evdev axis for an analog control, `None` for buttons
fn axis_for(code: ControlCode) -> Option<AbsoluteAxisType> {
    let axis = match code {
        ControlCode::AbsX => AbsoluteAxisType::ABS_X,
        ControlCode::AbsY => AbsoluteAxisType::ABS_Y,
        ControlCode::AbsZ => AbsoluteAxisType::ABS_Z,
        ControlCode::AbsRx => AbsoluteAxisType::ABS_RX,
        ControlCode::AbsRy => AbsoluteAxisType::ABS_RY,
        ControlCode::AbsRz => AbsoluteAxisType::ABS_RZ,
        ControlCode::Hat0X => AbsoluteAxisType::ABS_HAT0X,
        ControlCode::Hat0Y => AbsoluteAxisType::ABS_HAT0Y,
        _ => return None,
    };
    Some(axis)
}

/// evdev key for a button, `None` for analog controls
fn key_for(code: ControlCode) -> Option<Key> {
    let key = match code {
        ControlCode::BtnSouth => Key::BTN_SOUTH,
        ControlCode::BtnEast => Key::BTN_EAST,
        ControlCode::BtnNorth => Key::BTN_NORTH,
        ControlCode::BtnWest => Key::BTN_WEST,
        ControlCode::BtnTl => Key::BTN_TL,
        ControlCode::BtnTr => Key::BTN_TR,
        ControlCode::BtnTl2 => Key::BTN_TL2,
        ControlCode::BtnTr2 => Key::BTN_TR2,
        ControlCode::BtnSelect => Key::BTN_SELECT,
        ControlCode::BtnStart => Key::BTN_START,
        ControlCode::BtnMode => Key::BTN_MODE,
        ControlCode::BtnThumbL => Key::BTN_THUMBL,
        ControlCode::BtnThumbR => Key::BTN_THUMBR,
        ControlCode::BtnDpadUp => Key::BTN_DPAD_UP,
        ControlCode::BtnDpadDown => Key::BTN_DPAD_DOWN,
        ControlCode::BtnDpadLeft => Key::BTN_DPAD_LEFT,
        ControlCode::BtnDpadRight => Key::BTN_DPAD_RIGHT,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::controls::GAMEPAD_CONTROLS;
    use tempfile::tempdir;

    fn add_joystick(root: &Path, node: &str, name: &str) {
        let dir = root.join(node).join("device");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
    }

    #[test]
    fn test_name_available_when_no_joysticks() {
        let root = tempdir().unwrap();
        assert!(ensure_name_available("Yoke", root.path()).is_ok());
    }

    #[test]
    fn test_name_available_missing_sysfs() {
        let root = tempdir().unwrap();
        let missing = root.path().join("does-not-exist");
        assert!(ensure_name_available("Yoke", &missing).is_ok());
    }

    #[test]
    fn test_name_conflict_detected() {
        let root = tempdir().unwrap();
        add_joystick(root.path(), "js0", "Wireless Controller");
        add_joystick(root.path(), "js1", "Yoke");

        match ensure_name_available("Yoke", root.path()) {
            Err(BridgeError::NameConflict(name)) => assert_eq!(name, "Yoke"),
            other => panic!("Expected NameConflict, got: {:?}", other),
        }
    }

    #[test]
    fn test_name_conflict_ignores_non_joystick_nodes() {
        let root = tempdir().unwrap();
        add_joystick(root.path(), "event3", "Yoke");
        assert!(ensure_name_available("Yoke", root.path()).is_ok());
    }

    #[test]
    fn test_name_prefix_is_not_a_conflict() {
        let root = tempdir().unwrap();
        add_joystick(root.path(), "js0", "Yoke 2");
        assert!(ensure_name_available("Yoke", root.path()).is_ok());
    }

    #[test]
    fn test_input_event_codes() {
        let key = input_event(ControlCode::BtnSouth, 1).unwrap();
        assert_eq!(key.event_type(), EventType::KEY);
        assert_eq!(key.code(), Key::BTN_SOUTH.code());
        assert_eq!(key.value(), 1);

        let axis = input_event(ControlCode::Hat0Y, -1).unwrap();
        assert_eq!(axis.event_type(), EventType::ABSOLUTE);
        assert_eq!(axis.code(), AbsoluteAxisType::ABS_HAT0Y.0);
        assert_eq!(axis.value(), -1);
    }

    #[test]
    fn test_every_gamepad_control_has_native_code() {
        for &code in GAMEPAD_CONTROLS {
            match code.kind() {
                ControlKind::Button => {
                    assert!(key_for(code).is_some(), "{}", code);
                    assert!(axis_for(code).is_none(), "{}", code);
                }
                _ => {
                    assert!(axis_for(code).is_some(), "{}", code);
                    assert!(key_for(code).is_none(), "{}", code);
                }
            }
        }
    }

    // Integration test - needs write access to /dev/uinput
    #[test]
    #[ignore]
    fn test_open_with_real_uinput() {
        let spec = DeviceSpec::new("Yoke Test Pad", GAMEPAD_CONTROLS.to_vec());
        let mut device = UinputDevice::open(&spec).expect("uinput not available");

        device.emit(ControlCode::AbsX, 0.5).unwrap();
        device.emit(ControlCode::BtnSouth, 1.0).unwrap();
        device.commit().unwrap();

        device.emit(ControlCode::BtnEast, 1.0).unwrap();
        assert!(device.emit(ControlCode::BtnThumbR, 1.0).is_err());
        device.discard();
        assert!(device.pending.is_empty());

        device.close().unwrap();
        assert!(matches!(device.commit(), Err(BridgeError::DeviceClosed)));
    }
}
