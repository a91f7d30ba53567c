//! # Telemetry Module
//!
//! Decoding of the phone client's motion telemetry.
//!
//! This module handles:
//! - Splitting the comma-separated UDP payload
//! - Stripping padding and the reserved field
//! - Applying the fixed accelerometer calibration
//! - Passing extra channels through unchanged

pub mod calibration;
pub mod decoder;

pub use decoder::decode;
