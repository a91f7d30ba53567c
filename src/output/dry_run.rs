//! # Dry-Run Output Device
//!
//! Accepts the same vocabulary as the uinput backend but only logs frames.
//! Useful on hosts without `/dev/uinput` access and for checking a mapping.

use tracing::{debug, info};

use super::vocabulary::{AxisRange, Vocabulary};
use super::{DeviceSpec, OutputDevice};
use crate::controller::controls::ControlCode;
use crate::error::{BridgeError, Result};

/// Native stick range, matching the uinput backend
const STICK_RANGE: AxisRange = AxisRange::new(0, 255);

/// Native hat range, matching the uinput backend
const HAT_RANGE: AxisRange = AxisRange::new(-1, 1);

/// Output device that logs committed frames.
#[derive(Debug)]
pub struct DryRunDevice {
    name: String,
    vocabulary: Vocabulary,
    pending: Vec<(ControlCode, i32)>,
    frames: u64,
    closed: bool,
}

impl DryRunDevice {
    /// Creates the device. Never fails: there is no OS resource to acquire.
    #[must_use]
    pub fn new(spec: &DeviceSpec) -> Self {
        info!("Dry-run output device \"{}\" (no OS device created)", spec.name);
        Self {
            name: spec.name.clone(),
            vocabulary: Vocabulary::new(&spec.controls, STICK_RANGE, HAT_RANGE),
            pending: Vec::new(),
            frames: 0,
            closed: false,
        }
    }

    /// Number of frames committed so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Emissions buffered since the last commit.
    #[must_use]
    pub fn pending(&self) -> &[(ControlCode, i32)] {
        &self.pending
    }
}

impl OutputDevice for DryRunDevice {
    fn emit(&mut self, code: ControlCode, value: f32) -> Result<()> {
        if self.closed {
            return Err(BridgeError::DeviceClosed);
        }
        let native = self.vocabulary.resolve(code, value)?;
        self.pending.push((code, native));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.closed {
            return Err(BridgeError::DeviceClosed);
        }
        self.frames += 1;
        debug!("{} frame {}: {:?}", self.name, self.frames, self.pending);
        self.pending.clear();
        Ok(())
    }

    fn discard(&mut self) {
        if !self.pending.is_empty() {
            debug!("{} discarded {} emissions", self.name, self.pending.len());
            self.pending.clear();
        }
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            info!("Closed dry-run device \"{}\" after {} frames", self.name, self.frames);
            self.closed = true;
            self.pending.clear();
        }
        Ok(())
    }
}
